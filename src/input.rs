use serde::{Deserialize, Serialize};

use crate::model::PaymentMethod;

/// Raw payment form as the dialog submits it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentForm {
    pub amount: String,
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub amount: i64,
    pub method: PaymentMethod,
}

/// Per-field messages shown inline under the form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub amount: Option<String>,
    pub method: Option<String>,
}

/// Keeps only ASCII digits, the way the amount input strips keystrokes.
pub fn sanitize_amount_input(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Renders a digit string with thousands separators: `"1200000"` becomes
/// `"1,200,000"`. Non-digits are dropped first.
pub fn format_with_commas(value: &str) -> String {
    let digits = sanitize_amount_input(value);
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl PaymentForm {
    pub fn validate(&self) -> Result<ValidatedPayment, FieldErrors> {
        let mut errors = FieldErrors::default();

        let digits = sanitize_amount_input(&self.amount);
        let amount = if digits.is_empty() {
            errors.amount = Some("Amount is required".into());
            None
        } else {
            match digits.parse::<i64>() {
                Ok(value) if value > 0 => Some(value),
                Ok(_) => {
                    errors.amount = Some("Amount must be greater than zero".into());
                    None
                }
                Err(_) => {
                    errors.amount = Some("Amount is too large".into());
                    None
                }
            }
        };

        let method_raw = self.method.trim();
        let method = if method_raw.is_empty() {
            errors.method = Some("Method is required".into());
            None
        } else {
            let method = PaymentMethod::from_db(method_raw);
            if method.is_none() {
                errors.method = Some("Unknown payment method".into());
            }
            method
        };

        match (amount, method) {
            (Some(amount), Some(method)) => Ok(ValidatedPayment { amount, method }),
            _ => Err(errors),
        }
    }
}
