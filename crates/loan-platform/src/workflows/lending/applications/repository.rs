use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    ApplicationId, DecisionTerms, HistoryEntry, LoanApplication, TransitionEvent,
};

/// Storage abstraction for the mutable aggregate plus its append-only ledger.
///
/// `commit_transition` is the atomic unit the state machine relies on: the
/// aggregate save and the ledger append both happen or neither does, and a
/// version mismatch against the stored aggregate is a lost race.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError>;
    fn commit_transition(
        &self,
        application: &LoanApplication,
        entry: HistoryEntry,
    ) -> Result<(), RepositoryError>;
    fn history(&self, id: &ApplicationId) -> Result<Vec<HistoryEntry>, RepositoryError>;
    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("a concurrent update to the application won the race")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound transition event hooks (e-mail, in-app feeds).
///
/// Delivery is fire-and-forget from the core's perspective: the service logs
/// failures and never rolls a committed transition back.
pub trait TransitionNotifier: Send + Sync {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an application's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub application_number: String,
    pub status: &'static str,
    pub requested_amount: Decimal,
    pub term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl LoanApplication {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id,
            application_number: self.number.0.clone(),
            status: self.status.label(),
            requested_amount: self.requested_amount,
            term_months: self.term_months,
            decision: self.decision.clone(),
            submitted_at: self.submitted_at,
        }
    }
}
