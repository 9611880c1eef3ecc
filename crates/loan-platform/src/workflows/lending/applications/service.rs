use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use super::domain::{
    Actor, ApplicationId, ApplicationNumber, DecisionPayload, EmploymentDetails, HistoryEntry,
    LoanApplication, LoanStatus, LoanType, LoanTypeCatalog, LoanTypeId, TransitionEvent,
};
use super::machine::{self, TransitionError};
use super::policy::{self, PolicyRefusal};
use super::repository::{ApplicationRepository, RepositoryError, TransitionNotifier};

/// Service composing the transition graph, authorization policy, amortization
/// engine, and persistence/notification collaborators.
pub struct LoanWorkflowService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    catalog: LoanTypeCatalog,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_number() -> ApplicationNumber {
    let sequence = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationNumber(format!(
        "LA{}{sequence:04}",
        Utc::now().format("%Y%m%d")
    ))
}

/// Intake payload for a new draft application.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoanRequest {
    pub loan_type_id: LoanTypeId,
    pub requested_amount: Decimal,
    pub term_months: u32,
    pub purpose: String,
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    pub employment: EmploymentDetails,
}

/// Reviewer command: a target review outcome, optional notes, and decision
/// terms exactly when the outcome is an approval.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCommand {
    pub status: LoanStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub decision: Option<DecisionPayload>,
}

impl<R, N> LoanWorkflowService<R, N>
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, catalog: LoanTypeCatalog) -> Self {
        Self {
            repository,
            notifier,
            catalog,
        }
    }

    /// Create a draft application after checking the requested terms against
    /// the loan type's bounds. Creation is not a transition, so no ledger
    /// entry is written.
    pub fn create(
        &self,
        actor: &Actor,
        request: CreateLoanRequest,
    ) -> Result<LoanApplication, WorkflowError> {
        let loan_type = self.catalog.lookup(&request.loan_type_id).ok_or(
            WorkflowError::InvalidInput {
                field: "loan_type_id",
                reason: "unknown loan type".to_string(),
            },
        )?;
        ensure_within_bounds(loan_type, &request)?;

        let application = LoanApplication {
            id: ApplicationId::generate(),
            number: next_application_number(),
            applicant: actor.id.clone(),
            loan_type_id: request.loan_type_id,
            requested_amount: request.requested_amount,
            term_months: request.term_months,
            purpose: request.purpose,
            monthly_income: request.monthly_income,
            monthly_expenses: request.monthly_expenses,
            employment: request.employment,
            status: LoanStatus::Draft,
            decision: None,
            created_at: Utc::now(),
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            reviewer: None,
            review_notes: None,
            version: 0,
        };

        let stored = self.repository.insert(application)?;
        Ok(stored)
    }

    /// The single authority for changing `status`: load, validate against the
    /// graph, consult the policy, mutate, and commit the aggregate together
    /// with exactly one ledger entry. The transition event goes out after the
    /// commit and is never awaited or retried.
    pub fn request_transition(
        &self,
        id: &ApplicationId,
        target: LoanStatus,
        actor: &Actor,
        notes: Option<String>,
        decision: Option<DecisionPayload>,
    ) -> Result<LoanApplication, WorkflowError> {
        let mut application = self
            .repository
            .fetch(id)?
            .ok_or(WorkflowError::NotFound)?;

        machine::ensure_edge(application.status, target)?;
        policy::authorize(actor, &application, target)?;

        let from = application.status;
        let entry = application.apply_transition(target, actor, notes, decision, Utc::now())?;
        self.repository.commit_transition(&application, entry)?;

        let event = TransitionEvent {
            application_id: application.id,
            from,
            to: target,
            actor: actor.id.clone(),
        };
        if let Err(err) = self.notifier.publish(event) {
            warn!(application_id = %application.id, error = %err, "transition event dropped");
        }

        Ok(application)
    }

    pub fn submit(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        notes: Option<String>,
    ) -> Result<LoanApplication, WorkflowError> {
        self.request_transition(id, LoanStatus::Submitted, actor, notes, None)
    }

    pub fn cancel(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        notes: Option<String>,
    ) -> Result<LoanApplication, WorkflowError> {
        self.request_transition(id, LoanStatus::Cancelled, actor, notes, None)
    }

    pub fn disburse(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        notes: Option<String>,
    ) -> Result<LoanApplication, WorkflowError> {
        self.request_transition(id, LoanStatus::Disbursed, actor, notes, None)
    }

    pub fn review(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        command: ReviewCommand,
    ) -> Result<LoanApplication, WorkflowError> {
        self.request_transition(id, command.status, actor, command.notes, command.decision)
    }

    pub fn get(&self, actor: &Actor, id: &ApplicationId) -> Result<LoanApplication, WorkflowError> {
        let application = self
            .repository
            .fetch(id)?
            .ok_or(WorkflowError::NotFound)?;
        policy::authorize_view(actor, &application)?;
        Ok(application)
    }

    /// The full audit trail for one application, in append order.
    pub fn history(
        &self,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Vec<HistoryEntry>, WorkflowError> {
        let application = self
            .repository
            .fetch(id)?
            .ok_or(WorkflowError::NotFound)?;
        policy::authorize_view(actor, &application)?;
        Ok(self.repository.history(id)?)
    }

    /// Applications visible to the actor: everything for review staff, own
    /// applications for everyone else.
    pub fn list(&self, actor: &Actor) -> Result<Vec<LoanApplication>, WorkflowError> {
        let mut applications = self.repository.list()?;
        if !actor.can_review() {
            applications.retain(|application| actor.owns(application));
        }
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    pub fn catalog(&self) -> &LoanTypeCatalog {
        &self.catalog
    }
}

fn ensure_within_bounds(
    loan_type: &LoanType,
    request: &CreateLoanRequest,
) -> Result<(), WorkflowError> {
    if request.requested_amount <= Decimal::ZERO {
        return Err(WorkflowError::InvalidInput {
            field: "requested_amount",
            reason: "must be positive".to_string(),
        });
    }
    if !loan_type.amount_within(request.requested_amount) {
        return Err(WorkflowError::InvalidInput {
            field: "requested_amount",
            reason: format!(
                "must be between {} and {} for {}",
                loan_type.min_amount, loan_type.max_amount, loan_type.name
            ),
        });
    }
    if !loan_type.term_within(request.term_months) {
        return Err(WorkflowError::InvalidInput {
            field: "term_months",
            reason: format!(
                "must be between {} and {} months for {}",
                loan_type.min_term_months, loan_type.max_term_months, loan_type.name
            ),
        });
    }
    Ok(())
}

/// Error raised by the workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("loan application not found")]
    NotFound,
    #[error("a concurrent update to the application won the race; reload and retry")]
    Conflict,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Forbidden(#[from] PolicyRefusal),
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => WorkflowError::Conflict,
            RepositoryError::NotFound => WorkflowError::NotFound,
            other => WorkflowError::Repository(other),
        }
    }
}
