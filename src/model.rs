use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Kasoa,
    Kumasi,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Kasoa => "kasoa",
            Branch::Kumasi => "kumasi",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "kasoa" => Some(Branch::Kasoa),
            "kumasi" => Some(Branch::Kumasi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Motorcycle,
    Tricycle,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Motorcycle => "motorcycle",
            VehicleType::Tricycle => "tricycle",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "motorcycle" => Some(VehicleType::Motorcycle),
            "tricycle" => Some(VehicleType::Tricycle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Pending,
    Active,
    Defaulted,
    Completed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Active => "active",
            ContractStatus::Defaulted => "defaulted",
            ContractStatus::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ContractStatus::Pending),
            "active" => Some(ContractStatus::Active),
            "defaulted" => Some(ContractStatus::Defaulted),
            "completed" => Some(ContractStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    MobileMoney,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::MobileMoney => "mobile-money",
            PaymentMethod::Cash => "cash",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "mobile-money" => Some(PaymentMethod::MobileMoney),
            "cash" => Some(PaymentMethod::Cash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Full,
    Partial,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Full => "full",
            PaymentStatus::Partial => "partial",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "full" => Some(PaymentStatus::Full),
            "partial" => Some(PaymentStatus::Partial),
            _ => None,
        }
    }
}

/// One persisted installment payment. Several rows may share a week when a
/// customer tops up a partially paid installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub week: u32,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub firstname: String,
    pub othername: Option<String>,
    pub lastname: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSpec {
    #[serde(rename = "type")]
    pub kind: VehicleType,
    pub model: String,
    pub year: Option<String>,
    pub color: Option<String>,
    pub vin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contract {
    pub id: i64,
    pub branch: Branch,
    pub customer: Customer,
    pub vehicle: VehicleSpec,
    pub amount: i64,
    pub installment: i64,
    pub status: ContractStatus,
    pub payments: Vec<Payment>,
    pub created_at: String,
    pub updated_at: String,
}

impl Contract {
    pub fn total_paid(&self) -> i64 {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn outstanding(&self) -> i64 {
        self.amount - self.total_paid()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: i64,
    pub branch: Branch,
    pub vehicle: VehicleSpec,
    pub price: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractForm {
    pub branch: Branch,
    pub customer: Customer,
    pub vehicle: VehicleSpec,
    pub amount: i64,
    pub installment: i64,
    pub status: Option<ContractStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleForm {
    pub branch: Branch,
    pub vehicle: VehicleSpec,
    pub price: i64,
}
