//! Payment submission: validate, allocate, persist row by row, notify.

use serde::Serialize;

use crate::allocator::{PlannedPayment, Schedule};
use crate::input::{FieldErrors, PaymentForm};
use crate::model::{Contract, PaymentMethod, PaymentStatus};
use crate::{now_iso, AppError};

/// A payment row ready to be appended to a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentEntry {
    pub week: u32,
    pub amount: i64,
    pub method: PaymentMethod,
    pub recorded_at: String,
    pub status: PaymentStatus,
}

/// Appends one payment row to a contract.
///
/// `Ok(false)` means the row was not recorded (for example the contract no
/// longer exists). Either a `false` or an error halts the current batch.
pub trait PaymentRecorder {
    fn record_payment(&mut self, contract_id: i64, entry: &PaymentEntry)
        -> Result<bool, AppError>;
}

/// Reloads whatever contract listing the caller is showing.
pub trait ContractsRefresher {
    fn refresh(&mut self) -> Result<(), AppError>;
}

impl<F> ContractsRefresher for F
where
    F: FnMut() -> Result<(), AppError>,
{
    fn refresh(&mut self) -> Result<(), AppError> {
        self()
    }
}

pub struct NoRefresh;

impl ContractsRefresher for NoRefresh {
    fn refresh(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

/// What happened to a planned batch. Rows before `failed_at` are committed
/// and are never rolled back.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub committed: Vec<PaymentEntry>,
    pub failed_at: Option<usize>,
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn success(title: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: "You can now add another payment or close this dialog".into(),
        }
    }

    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Result of one submit action, as the dialog consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    /// Toast for the batch. `None` when the form was rejected, whose errors
    /// are shown inline only.
    pub notice: Option<Notice>,
    /// Reset the form and close the dialog.
    pub close_dialog: bool,
    pub field_errors: Option<FieldErrors>,
    pub outcome: Option<BatchOutcome>,
}

impl SubmissionReport {
    fn invalid(errors: FieldErrors) -> Self {
        Self {
            notice: None,
            close_dialog: false,
            field_errors: Some(errors),
            outcome: None,
        }
    }
}

/// Persists `plan` one row at a time, stopping at the first row the
/// recorder does not accept.
pub fn record_plan<R>(
    recorder: &mut R,
    contract_id: i64,
    method: PaymentMethod,
    plan: &[PlannedPayment],
) -> BatchOutcome
where
    R: PaymentRecorder + ?Sized,
{
    let mut outcome = BatchOutcome::default();
    for (index, planned) in plan.iter().enumerate() {
        let entry = PaymentEntry {
            week: planned.week,
            amount: planned.amount,
            method,
            recorded_at: now_iso(),
            status: planned.status,
        };
        match recorder.record_payment(contract_id, &entry) {
            Ok(true) => outcome.committed.push(entry),
            Ok(false) => {
                log::warn!(
                    "payment for contract {contract_id} week {} was not recorded",
                    entry.week
                );
                outcome.failed_at = Some(index);
                break;
            }
            Err(err) => {
                log::error!(
                    "recording payment for contract {contract_id} week {} failed: {err}",
                    entry.week
                );
                outcome.failed_at = Some(index);
                outcome.error = Some(err.to_string());
                break;
            }
        }
    }
    outcome
}

/// Submit entry point for the add-payment dialog.
///
/// Validation failures return before anything is allocated. Otherwise the
/// contract snapshot is allocated, the plan is recorded, and exactly one
/// notice describes the batch.
pub fn submit_payment<R, F>(
    contract: &Contract,
    form: &PaymentForm,
    recorder: &mut R,
    refresher: &mut F,
) -> SubmissionReport
where
    R: PaymentRecorder + ?Sized,
    F: ContractsRefresher + ?Sized,
{
    let payment = match form.validate() {
        Ok(payment) => payment,
        Err(errors) => return SubmissionReport::invalid(errors),
    };

    let plan = match Schedule::new(contract.installment, &contract.payments)
        .allocate(payment.amount)
    {
        Ok(plan) => plan,
        Err(AppError::Validation(message)) => {
            return SubmissionReport::invalid(FieldErrors {
                amount: Some(message),
                method: None,
            });
        }
        Err(err) => {
            log::error!("allocating payment for contract {} failed: {err}", contract.id);
            return SubmissionReport {
                notice: Some(submit_failed()),
                close_dialog: false,
                field_errors: None,
                outcome: None,
            };
        }
    };

    let outcome = record_plan(recorder, contract.id, payment.method, &plan);
    log::info!(
        "contract {}: {} of {} payment rows recorded",
        contract.id,
        outcome.committed.len(),
        plan.len()
    );

    let notice = match (outcome.failed_at, &outcome.error) {
        (None, _) if plan.len() == 1 => Notice::success("Payment recorded successfully"),
        (None, _) => Notice::success("Payments recorded successfully"),
        (Some(_), Some(_)) => submit_failed(),
        (Some(0), None) => {
            Notice::error("Failed to record payment", "Something went wrong, please try again")
        }
        (Some(_), None) => Notice::error(
            "Payments partially recorded",
            format!(
                "{} of {} payments were recorded, please review the contract before retrying",
                outcome.committed.len(),
                plan.len()
            ),
        ),
    };

    if !outcome.committed.is_empty() {
        if let Err(err) = refresher.refresh() {
            log::error!("refreshing contracts failed: {err}");
        }
    }

    SubmissionReport {
        notice: Some(notice),
        close_dialog: outcome.is_complete(),
        field_errors: None,
        outcome: Some(outcome),
    }
}

fn submit_failed() -> Notice {
    Notice::error("Failed to submit the form.", "Something went wrong, please try again")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Branch, ContractStatus, Customer, Payment, VehicleSpec, VehicleType,
    };

    /// Records into memory; answers `false` (or errors) from a given call on.
    #[derive(Default)]
    struct MemoryRecorder {
        calls: Vec<PaymentEntry>,
        reject_from: Option<usize>,
        error_from: Option<usize>,
    }

    impl PaymentRecorder for MemoryRecorder {
        fn record_payment(
            &mut self,
            _contract_id: i64,
            entry: &PaymentEntry,
        ) -> Result<bool, AppError> {
            let index = self.calls.len();
            self.calls.push(entry.clone());
            if self.error_from.is_some_and(|from| index >= from) {
                return Err(AppError::Validation("store offline".into()));
            }
            Ok(self.reject_from.map_or(true, |from| index < from))
        }
    }

    fn contract(payments: Vec<Payment>) -> Contract {
        Contract {
            id: 7,
            branch: Branch::Kasoa,
            customer: Customer {
                firstname: "Ama".into(),
                othername: None,
                lastname: "Mensah".into(),
                phone: "0240000000".into(),
            },
            vehicle: VehicleSpec {
                kind: VehicleType::Motorcycle,
                model: "Haojue".into(),
                year: None,
                color: None,
                vin: None,
            },
            amount: 15_000,
            installment: 500,
            status: ContractStatus::Active,
            payments,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    fn notice(report: &SubmissionReport) -> &Notice {
        report.notice.as_ref().expect("batch notice")
    }

    fn form(amount: &str) -> PaymentForm {
        PaymentForm {
            amount: amount.into(),
            method: "cash".into(),
        }
    }

    #[test]
    fn full_batch_closes_dialog_and_refreshes_once() {
        let mut recorder = MemoryRecorder::default();
        let mut refreshes = 0;
        let mut refresher = || -> Result<(), AppError> {
            refreshes += 1;
            Ok(())
        };
        let report = submit_payment(&contract(vec![]), &form("1,200"), &mut recorder, &mut refresher);

        assert_eq!(notice(&report).level, NoticeLevel::Success);
        assert_eq!(notice(&report).title, "Payments recorded successfully");
        assert!(report.close_dialog);
        assert_eq!(refreshes, 1);
        let weeks: Vec<_> = recorder.calls.iter().map(|e| (e.week, e.amount)).collect();
        assert_eq!(weeks, vec![(1, 500), (2, 500), (3, 200)]);
        assert!(recorder.calls.iter().all(|e| e.method == PaymentMethod::Cash));
    }

    #[test]
    fn single_row_uses_singular_notice() {
        let mut recorder = MemoryRecorder::default();
        let report = submit_payment(&contract(vec![]), &form("200"), &mut recorder, &mut NoRefresh);
        assert_eq!(notice(&report).title, "Payment recorded successfully");
    }

    #[test]
    fn invalid_form_never_reaches_the_recorder() {
        let mut recorder = MemoryRecorder::default();
        let report = submit_payment(
            &contract(vec![]),
            &PaymentForm::default(),
            &mut recorder,
            &mut NoRefresh,
        );
        assert!(recorder.calls.is_empty());
        assert!(!report.close_dialog);
        assert!(report.notice.is_none());
        let errors = report.field_errors.unwrap();
        assert_eq!(errors.amount.as_deref(), Some("Amount is required"));
        assert_eq!(errors.method.as_deref(), Some("Method is required"));
    }

    #[test]
    fn first_row_rejected_keeps_dialog_open_without_refresh() {
        let mut recorder = MemoryRecorder {
            reject_from: Some(0),
            ..Default::default()
        };
        let mut refreshes = 0;
        let mut refresher = || -> Result<(), AppError> {
            refreshes += 1;
            Ok(())
        };
        let report = submit_payment(&contract(vec![]), &form("1500"), &mut recorder, &mut refresher);

        assert_eq!(notice(&report).title, "Failed to record payment");
        assert!(!report.close_dialog);
        assert_eq!(recorder.calls.len(), 1);
        assert_eq!(refreshes, 0);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.failed_at, Some(0));
        assert!(outcome.committed.is_empty());
    }

    #[test]
    fn later_rejection_halts_batch_and_reports_committed_rows() {
        let history = vec![Payment {
            week: 1,
            amount: 300,
            method: PaymentMethod::Cash,
            status: PaymentStatus::Partial,
            recorded_at: "2024-01-08T00:00:00+00:00".into(),
        }];
        let mut recorder = MemoryRecorder {
            reject_from: Some(2),
            ..Default::default()
        };
        let mut refreshes = 0;
        let mut refresher = || -> Result<(), AppError> {
            refreshes += 1;
            Ok(())
        };
        let report = submit_payment(&contract(history), &form("1300"), &mut recorder, &mut refresher);

        assert_eq!(notice(&report).title, "Payments partially recorded");
        assert!(!report.close_dialog);
        assert_eq!(refreshes, 1);
        // settle week 1, week 2 full, then week 3 rejected; week 4 never tried
        assert_eq!(recorder.calls.len(), 3);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.failed_at, Some(2));
        let committed: Vec<_> = outcome.committed.iter().map(|e| (e.week, e.amount)).collect();
        assert_eq!(committed, vec![(1, 200), (2, 500)]);
    }

    #[test]
    fn recorder_error_is_a_generic_submission_failure() {
        let mut recorder = MemoryRecorder {
            error_from: Some(1),
            ..Default::default()
        };
        let mut refreshes = 0;
        let mut refresher = || -> Result<(), AppError> {
            refreshes += 1;
            Ok(())
        };
        let report = submit_payment(&contract(vec![]), &form("1000"), &mut recorder, &mut refresher);
        assert_eq!(notice(&report).title, "Failed to submit the form.");
        assert!(!report.close_dialog);
        // the first week was committed before the error, so the list reloads
        assert_eq!(refreshes, 1);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.failed_at, Some(1));
        assert_eq!(outcome.committed.len(), 1);
        assert!(outcome.error.unwrap().contains("store offline"));
    }

    #[test]
    fn failing_refresh_keeps_the_success_notice() {
        let mut recorder = MemoryRecorder::default();
        let mut refresher =
            || -> Result<(), AppError> { Err(AppError::NotFound("contract list".into())) };
        let report = submit_payment(&contract(vec![]), &form("1000"), &mut recorder, &mut refresher);
        assert_eq!(notice(&report).level, NoticeLevel::Success);
        assert_eq!(notice(&report).title, "Payments recorded successfully");
        assert!(report.close_dialog);
        assert_eq!(recorder.calls.len(), 2);
    }

    #[test]
    fn oversized_amount_is_an_inline_amount_error() {
        let mut recorder = MemoryRecorder::default();
        let report = submit_payment(
            &contract(vec![]),
            &form("1,000,000,000,000"),
            &mut recorder,
            &mut NoRefresh,
        );
        assert!(recorder.calls.is_empty());
        assert!(report.notice.is_none());
        assert!(report.outcome.is_none());
        let errors = report.field_errors.unwrap();
        assert_eq!(errors.amount.as_deref(), Some("Amount is too large"));
        assert_eq!(errors.method, None);
    }

    #[test]
    fn broken_installment_is_reported_without_recording() {
        let mut broken = contract(vec![]);
        broken.installment = 0;
        let mut recorder = MemoryRecorder::default();
        let report = submit_payment(&broken, &form("100"), &mut recorder, &mut NoRefresh);
        assert_eq!(notice(&report).title, "Failed to submit the form.");
        assert!(recorder.calls.is_empty());
        assert!(report.outcome.is_none());
    }
}
