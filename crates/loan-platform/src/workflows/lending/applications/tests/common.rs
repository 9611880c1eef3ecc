use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::Value;
use uuid::Uuid;

use crate::workflows::lending::applications::domain::{
    Actor, ApplicationId, ApplicationNumber, EmploymentDetails, HistoryEntry, LoanApplication,
    LoanStatus, LoanTypeCatalog, LoanTypeId, Role, TransitionEvent, UserId,
};
use crate::workflows::lending::applications::repository::{
    ApplicationRepository, NotifyError, RepositoryError, TransitionNotifier,
};
use crate::workflows::lending::applications::service::CreateLoanRequest;
use crate::workflows::lending::applications::{application_router, LoanWorkflowService};

pub(super) fn applicant() -> Actor {
    Actor::new(UserId::new("user-mokoena"), [Role::Applicant])
}

pub(super) fn other_applicant() -> Actor {
    Actor::new(UserId::new("user-naidoo"), [Role::Applicant])
}

pub(super) fn reviewer() -> Actor {
    Actor::new(UserId::new("staff-reviewer"), [Role::Reviewer])
}

pub(super) fn officer() -> Actor {
    Actor::new(UserId::new("staff-officer"), [Role::LoanOfficer])
}

pub(super) fn admin() -> Actor {
    Actor::new(UserId::new("staff-admin"), [Role::Admin])
}

pub(super) fn personal_loan_id() -> LoanTypeId {
    LoanTypeId(Uuid::from_u128(0x11111111_1111_1111_1111_111111111111))
}

pub(super) fn create_request() -> CreateLoanRequest {
    CreateLoanRequest {
        loan_type_id: personal_loan_id(),
        requested_amount: dec!(12000),
        term_months: 12,
        purpose: "Kitchen renovation".to_string(),
        monthly_income: dec!(6400),
        monthly_expenses: dec!(2800),
        employment: EmploymentDetails {
            status: "Employed".to_string(),
            employer_name: "Acme Fabrication".to_string(),
            years_employed: 4,
        },
    }
}

/// Aggregate fixture pinned to an arbitrary status, for graph-closure tests.
pub(super) fn application_with_status(owner: &Actor, status: LoanStatus) -> LoanApplication {
    LoanApplication {
        id: ApplicationId::generate(),
        number: ApplicationNumber("LA202501010001".to_string()),
        applicant: owner.id.clone(),
        loan_type_id: personal_loan_id(),
        requested_amount: dec!(12000),
        term_months: 12,
        purpose: "Kitchen renovation".to_string(),
        monthly_income: dec!(6400),
        monthly_expenses: dec!(2800),
        employment: EmploymentDetails {
            status: "Employed".to_string(),
            employer_name: "Acme Fabrication".to_string(),
            years_employed: 4,
        },
        status,
        decision: None,
        created_at: Utc::now(),
        submitted_at: None,
        reviewed_at: None,
        approved_at: None,
        reviewer: None,
        review_notes: None,
        version: 0,
    }
}

pub(super) fn build_service() -> (
    LoanWorkflowService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = LoanWorkflowService::new(
        repository.clone(),
        notifier.clone(),
        LoanTypeCatalog::standard(),
    );
    (service, repository, notifier)
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<ApplicationId, LoanApplication>,
    ledger: Vec<HistoryEntry>,
}

/// In-memory repository honoring the atomic commit + version-check contract.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.records.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state.records.insert(application.id, application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.records.get(id).cloned())
    }

    fn commit_transition(
        &self,
        application: &LoanApplication,
        entry: HistoryEntry,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let stored = state
            .records
            .get(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version + 1 != application.version {
            return Err(RepositoryError::Conflict);
        }
        state.records.insert(application.id, application.clone());
        state.ledger.push(entry);
        Ok(())
    }

    fn history(&self, id: &ApplicationId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .ledger
            .iter()
            .filter(|entry| entry.application_id == *id)
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.records.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl TransitionNotifier for MemoryNotifier {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Repository whose atomic commit always fails, for atomicity tests.
pub(super) struct FailingCommitRepository {
    pub(super) inner: MemoryRepository,
}

impl ApplicationRepository for FailingCommitRepository {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        self.inner.insert(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn commit_transition(
        &self,
        _application: &LoanApplication,
        _entry: HistoryEntry,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable(
            "ledger append failed".to_string(),
        ))
    }

    fn history(&self, id: &ApplicationId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.inner.history(id)
    }

    fn list(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        self.inner.list()
    }
}

/// Notifier that refuses every event, for fire-and-forget tests.
pub(super) struct RefusingNotifier;

impl TransitionNotifier for RefusingNotifier {
    fn publish(&self, _event: TransitionEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) fn router_with_service(
    service: LoanWorkflowService<MemoryRepository, MemoryNotifier>,
) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
