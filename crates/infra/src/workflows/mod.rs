//! Multi-record operations.
//!
//! Each workflow validates everything it can before its first write, then
//! persists in a fixed order. `TOUCHES` lists the resources a workflow may
//! change so callers can invalidate cached reads.

pub mod booking;
pub mod checkout;
pub mod payroll;
pub mod points;
pub mod stock;

use thiserror::Error;

use salonbook_core::DomainError;

use crate::repository::RepositoryError;

pub use booking::{book_appointment, reschedule_appointment};
pub use checkout::{CheckoutReceipt, complete_appointment};
pub use payroll::{PayrollRunRequest, run_payroll};
pub use points::adjust_points;
pub use stock::adjust_stock;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
