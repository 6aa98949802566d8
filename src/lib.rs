use chrono::Utc;
use thiserror::Error;

pub mod allocator;
pub mod config;
pub mod db;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod input;
pub mod ledger;
pub mod model;
pub mod statement;

pub use allocator::{split_into_installments, PlannedPayment, Schedule};
pub use config::LedgerConfig;
pub use db::{DbState, SqlitePaymentRecorder};
pub use input::{format_with_commas, sanitize_amount_input, FieldErrors, PaymentForm};
pub use ledger::{
    record_plan, submit_payment, BatchOutcome, ContractsRefresher, NoRefresh, Notice,
    NoticeLevel, PaymentEntry, PaymentRecorder, SubmissionReport,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("allocation error: {0}")]
    Allocation(String),
    #[error("desktop error: {0}")]
    Desktop(String),
}

impl From<AppError> for String {
    fn from(value: AppError) -> Self {
        value.to_string()
    }
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339()
}
