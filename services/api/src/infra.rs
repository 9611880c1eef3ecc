use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use loan_platform::workflows::lending::applications::{
    ApplicationId, ApplicationRepository, HistoryEntry, LoanApplication, NotifyError,
    RepositoryError, TransitionEvent, TransitionNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<ApplicationId, LoanApplication>,
    ledger: Vec<HistoryEntry>,
}

/// In-memory persistence adapter.
///
/// One lock spans the aggregate map and the ledger so the save-plus-append
/// commit is a single transaction, and the version comparison inside it is
/// the optimistic lock that rejects lost races.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    state: Arc<Mutex<StoreState>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

/// Collects transition events in memory; a real deployment would hand them
/// to the notification service for asynchronous delivery.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTransitionNotifier {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl InMemoryTransitionNotifier {
    pub(crate) fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl TransitionNotifier for InMemoryTransitionNotifier {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a decimal number ({err})"))
}
