use crate::model::Contract;

const HEADER: &str = "week,amount,method,status,recorded_at";

pub fn statement_file_name(contract_id: i64) -> String {
    format!("contract-{contract_id}-statement.csv")
}

/// Payment history of one contract as CSV, oldest row first.
pub fn contract_statement_csv(contract: &Contract) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for payment in &contract.payments {
        let fields = [
            payment.week.to_string(),
            payment.amount.to_string(),
            payment.method.as_str().to_string(),
            payment.status.as_str().to_string(),
            payment.recorded_at.clone(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(escape_field("cash"), "cash");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn file_name_carries_contract_id() {
        assert_eq!(statement_file_name(42), "contract-42-statement.csv");
    }
}
