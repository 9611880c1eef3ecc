use chrono::{DateTime, Utc};

use super::amortization::{self, AmortizationError};
use super::domain::{
    Actor, DecisionPayload, DecisionTerms, HistoryEntry, LoanApplication, LoanStatus,
};

/// Rejections raised while validating or applying a transition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("no transition from {from:?} to {to:?}")]
    IllegalTransition { from: LoanStatus, to: LoanStatus },
    #[error("decision terms (approved amount, interest rate) are required when approving")]
    MissingDecisionPayload,
    #[error("decision terms are only accepted when approving, not for {target:?}")]
    UnexpectedDecisionPayload { target: LoanStatus },
    #[error(transparent)]
    Amortization(#[from] AmortizationError),
}

/// Direct successors of a status in the legal transition graph.
///
/// Terminal statuses return an empty slice, which is what rejects any attempt
/// to move an application out of Declined, Cancelled, or Disbursed.
pub const fn successors(status: LoanStatus) -> &'static [LoanStatus] {
    match status {
        LoanStatus::Draft => &[LoanStatus::Submitted, LoanStatus::Cancelled],
        LoanStatus::Submitted => &[
            LoanStatus::UnderReview,
            LoanStatus::DocumentsRequired,
            LoanStatus::Approved,
            LoanStatus::Declined,
            LoanStatus::Cancelled,
        ],
        LoanStatus::UnderReview => &[
            LoanStatus::DocumentsRequired,
            LoanStatus::Approved,
            LoanStatus::Declined,
            LoanStatus::Cancelled,
        ],
        LoanStatus::DocumentsRequired => &[LoanStatus::UnderReview, LoanStatus::Cancelled],
        LoanStatus::Approved => &[LoanStatus::Disbursed],
        LoanStatus::Declined | LoanStatus::Cancelled | LoanStatus::Disbursed => &[],
    }
}

pub fn is_terminal(status: LoanStatus) -> bool {
    successors(status).is_empty()
}

/// Check that `to` is a direct successor of `from`.
pub fn ensure_edge(from: LoanStatus, to: LoanStatus) -> Result<(), TransitionError> {
    if successors(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

impl LoanApplication {
    /// Move the aggregate to `target`, stamping timestamps and decision
    /// outputs, and mint the ledger entry the caller must append in the same
    /// persistence transaction.
    ///
    /// Authorization is the service's responsibility and happens before this
    /// is called; nothing here is persisted.
    pub fn apply_transition(
        &mut self,
        target: LoanStatus,
        actor: &Actor,
        notes: Option<String>,
        decision: Option<DecisionPayload>,
        at: DateTime<Utc>,
    ) -> Result<HistoryEntry, TransitionError> {
        ensure_edge(self.status, target)?;

        match (target, &decision) {
            (LoanStatus::Approved, None) => return Err(TransitionError::MissingDecisionPayload),
            (LoanStatus::Approved, Some(_)) => {}
            (_, Some(_)) => return Err(TransitionError::UnexpectedDecisionPayload { target }),
            (_, None) => {}
        }

        if let Some(payload) = decision {
            let monthly_payment = amortization::monthly_payment(
                payload.approved_amount,
                payload.interest_rate,
                self.term_months,
            )?;
            self.decision = Some(DecisionTerms {
                approved_amount: payload.approved_amount,
                interest_rate: payload.interest_rate,
                monthly_payment,
            });
            self.approved_at.get_or_insert(at);
        }

        match target {
            LoanStatus::Submitted => {
                self.submitted_at.get_or_insert(at);
            }
            LoanStatus::UnderReview
            | LoanStatus::DocumentsRequired
            | LoanStatus::Approved
            | LoanStatus::Declined => {
                self.reviewed_at.get_or_insert(at);
                self.reviewer = Some(actor.id.clone());
                self.review_notes = notes.clone();
            }
            LoanStatus::Draft | LoanStatus::Cancelled | LoanStatus::Disbursed => {}
        }

        let from = self.status;
        self.status = target;
        self.version += 1;

        Ok(HistoryEntry {
            id: uuid::Uuid::new_v4(),
            application_id: self.id,
            from,
            to: target,
            actor: actor.id.clone(),
            notes,
            recorded_at: at,
        })
    }
}
