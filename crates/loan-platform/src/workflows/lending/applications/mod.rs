//! Loan application intake, review lifecycle, and audit ledger.
//!
//! The state machine in [`machine`] is the sole authority for changing an
//! application's status: every accepted transition is authorized by
//! [`policy`], derives its economics through [`amortization`] when approving,
//! and lands in the append-only ledger in the same persistence transaction as
//! the aggregate itself.

pub mod amortization;
pub mod domain;
pub mod machine;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use amortization::{AmortizationError, AmortizationQuote};
pub use domain::{
    Actor, ApplicationId, ApplicationNumber, DecisionPayload, DecisionTerms, EmploymentDetails,
    HistoryEntry, LoanApplication, LoanStatus, LoanType, LoanTypeCatalog, LoanTypeId, Role,
    TransitionEvent, UserId,
};
pub use machine::TransitionError;
pub use policy::PolicyRefusal;
pub use repository::{
    ApplicationRepository, ApplicationStatusView, NotifyError, RepositoryError,
    TransitionNotifier,
};
pub use router::application_router;
pub use service::{CreateLoanRequest, LoanWorkflowService, ReviewCommand, WorkflowError};
