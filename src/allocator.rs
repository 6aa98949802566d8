//! Installment allocation.
//!
//! Splits a lump payment into weekly payment rows for one contract. Nothing
//! here touches storage: the schedule is derived from the payment history
//! on every call and the result is a plan the ledger persists row by row.

use serde::Serialize;

use crate::model::{Payment, PaymentStatus};
use crate::AppError;

/// Highest week a plan may reach: a century of weekly installments.
pub const MAX_WEEK: u32 = 5_200;

/// One row the ledger should append for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedPayment {
    pub week: u32,
    pub amount: i64,
    pub status: PaymentStatus,
}

/// Read-only view over a contract's installment and payment history.
///
/// History order is insertion order, which is also week order.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'a> {
    installment: i64,
    payments: &'a [Payment],
}

impl<'a> Schedule<'a> {
    pub fn new(installment: i64, payments: &'a [Payment]) -> Self {
        Self {
            installment,
            payments,
        }
    }

    /// Week of the most recent payment row, `0` for an empty history.
    pub fn last_paid_week(&self) -> u32 {
        self.payments.last().map(|p| p.week).unwrap_or(0)
    }

    /// Balance still owed on the week of the most recent payment row.
    ///
    /// A `full` last row settles its week. A `partial` last row leaves
    /// `installment - sum(rows of that week)` open. The result is not
    /// clamped and can be zero or negative when a week was overpaid while
    /// still tagged `partial`.
    pub fn due_from_last_paid_week(&self) -> i64 {
        let Some(last) = self.payments.last() else {
            return 0;
        };
        match last.status {
            PaymentStatus::Full => 0,
            PaymentStatus::Partial => {
                let paid: i64 = self
                    .payments
                    .iter()
                    .filter(|p| p.week == last.week)
                    .map(|p| p.amount)
                    .sum();
                self.installment - paid
            }
        }
    }

    pub fn status_for(&self, amount: i64) -> PaymentStatus {
        if amount == self.installment {
            PaymentStatus::Full
        } else {
            PaymentStatus::Partial
        }
    }

    /// Plans the rows for a submitted `amount`, in ascending week order.
    pub fn allocate(&self, amount: i64) -> Result<Vec<PlannedPayment>, AppError> {
        if self.installment <= 0 {
            return Err(AppError::Allocation(format!(
                "installment must be positive, got {}",
                self.installment
            )));
        }
        if amount <= 0 {
            return Err(AppError::Validation(
                "Amount must be greater than zero".into(),
            ));
        }

        let mut plan = Vec::new();

        if self.payments.is_empty() {
            if amount >= self.installment {
                self.push_chunks(&mut plan, amount, 1)?;
            } else {
                plan.push(partial(1, amount));
            }
            return Ok(plan);
        }

        let last_week = self.last_paid_week();
        let due = self.due_from_last_paid_week();
        let week_open = due >= 1;

        if amount >= self.installment {
            if week_open {
                plan.push(partial(last_week, due));
                self.push_chunks(&mut plan, amount - due, next_week(last_week)?)?;
            } else {
                self.push_chunks(&mut plan, amount, next_week(last_week)?)?;
            }
        } else if week_open && amount <= due {
            plan.push(partial(last_week, amount));
        } else if week_open {
            plan.push(partial(last_week, due));
            self.push_chunks(&mut plan, amount - due, next_week(last_week)?)?;
        } else {
            plan.push(partial(next_week(last_week)?, amount));
        }

        Ok(plan)
    }

    /// Appends one row per chunk from `first_week` on. Refuses amounts whose
    /// chunks would run past `MAX_WEEK` before building anything.
    fn push_chunks(
        &self,
        plan: &mut Vec<PlannedPayment>,
        amount: i64,
        first_week: u32,
    ) -> Result<(), AppError> {
        let rows = amount / self.installment + i64::from(amount % self.installment != 0);
        let last_week = i64::from(first_week).saturating_add(rows) - 1;
        if last_week > i64::from(MAX_WEEK) {
            return Err(AppError::Validation("Amount is too large".into()));
        }
        let chunks = split_into_installments(amount, self.installment);
        for (week, chunk) in (first_week..).zip(chunks) {
            plan.push(PlannedPayment {
                week,
                amount: chunk,
                status: self.status_for(chunk),
            });
        }
        Ok(())
    }
}

fn next_week(week: u32) -> Result<u32, AppError> {
    week.checked_add(1)
        .filter(|next| *next <= MAX_WEEK)
        .ok_or_else(|| {
            AppError::Allocation(format!("schedule has no weeks left after week {week}"))
        })
}

// Rows that top up an open week are always tagged `partial`, even when they
// complete it.
fn partial(week: u32, amount: i64) -> PlannedPayment {
    PlannedPayment {
        week,
        amount,
        status: PaymentStatus::Partial,
    }
}

/// Breaks `amount` into whole installments plus a trailing remainder.
///
/// Returns an empty list when `amount` is not positive or `installment` is
/// not positive.
pub fn split_into_installments(amount: i64, installment: i64) -> Vec<i64> {
    let mut chunks = Vec::new();
    if installment <= 0 {
        return chunks;
    }
    let mut remaining = amount;
    while remaining >= installment {
        chunks.push(installment);
        remaining -= installment;
    }
    if remaining > 0 {
        chunks.push(remaining);
    }
    chunks
}
