use super::domain::{Actor, LoanApplication, LoanStatus};

/// Refusals raised by the authorization policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyRefusal {
    #[error("only the owning applicant may move this application to {target:?}")]
    OwnerOnly { target: LoanStatus },
    #[error("status {target:?} may only be set by review staff")]
    ReviewStaffOnly { target: LoanStatus },
    #[error("disbursement requires a disbursement-capable role")]
    DisbursementRoleRequired,
    #[error("the owning applicant may not disburse their own loan")]
    ApplicantMayNotDisburse,
    #[error("only review staff or the owning applicant may view this application")]
    ViewRestricted,
}

/// Decide whether `actor` may move `application` to `target`.
///
/// Pure function with no side effects; the transition graph has already
/// rejected moves out of terminal statuses before this runs. The rule table:
/// submitting and cancelling belong to the owning applicant alone, review
/// outcomes belong to review staff, and disbursement belongs to
/// disbursement-capable staff who do not own the application.
pub fn authorize(
    actor: &Actor,
    application: &LoanApplication,
    target: LoanStatus,
) -> Result<(), PolicyRefusal> {
    match target {
        LoanStatus::Submitted | LoanStatus::Cancelled => {
            if actor.owns(application) {
                Ok(())
            } else {
                Err(PolicyRefusal::OwnerOnly { target })
            }
        }
        LoanStatus::Disbursed => {
            if actor.owns(application) {
                Err(PolicyRefusal::ApplicantMayNotDisburse)
            } else if actor.can_disburse() {
                Ok(())
            } else {
                Err(PolicyRefusal::DisbursementRoleRequired)
            }
        }
        _ => {
            if actor.can_review() {
                Ok(())
            } else {
                Err(PolicyRefusal::ReviewStaffOnly { target })
            }
        }
    }
}

/// Read-path rule: applicants see their own applications, review staff see
/// everything.
pub fn authorize_view(actor: &Actor, application: &LoanApplication) -> Result<(), PolicyRefusal> {
    if actor.can_review() || actor.owns(application) {
        Ok(())
    } else {
        Err(PolicyRefusal::ViewRestricted)
    }
}
