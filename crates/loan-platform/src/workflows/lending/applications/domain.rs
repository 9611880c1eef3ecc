use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Human-readable application number, globally unique and minted at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationNumber(pub String);

/// Opaque user identity supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Staff and applicant roles, modeled as capabilities rather than call-site
/// conditionals so the authorization table stays in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Reviewer,
    LoanOfficer,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Reviewer => "reviewer",
            Role::LoanOfficer => "loan_officer",
            Role::Admin => "admin",
        }
    }

    /// Whether the role may move an application through review outcomes.
    pub const fn can_review(self) -> bool {
        matches!(self, Role::Reviewer | Role::LoanOfficer | Role::Admin)
    }

    /// Whether the role may release funds on an approved application.
    pub const fn can_disburse(self) -> bool {
        matches!(self, Role::LoanOfficer | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "applicant" => Ok(Role::Applicant),
            "reviewer" => Ok(Role::Reviewer),
            "loan_officer" | "loan-officer" => Ok(Role::LoanOfficer),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

/// Raised when the identity collaborator hands us a role we do not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// The acting identity for a request: user id plus role set, treated as
/// opaque input from the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub roles: BTreeSet<Role>,
}

impl Actor {
    pub fn new(id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn can_review(&self) -> bool {
        self.roles.iter().any(|role| role.can_review())
    }

    pub fn can_disburse(&self) -> bool {
        self.roles.iter().any(|role| role.can_disburse())
    }

    pub fn owns(&self, application: &LoanApplication) -> bool {
        self.id == application.applicant
    }
}

/// Lifecycle position of a loan application; the single source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Draft,
    Submitted,
    UnderReview,
    DocumentsRequired,
    Approved,
    Declined,
    Cancelled,
    Disbursed,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 8] = [
        LoanStatus::Draft,
        LoanStatus::Submitted,
        LoanStatus::UnderReview,
        LoanStatus::DocumentsRequired,
        LoanStatus::Approved,
        LoanStatus::Declined,
        LoanStatus::Cancelled,
        LoanStatus::Disbursed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Draft => "draft",
            LoanStatus::Submitted => "submitted",
            LoanStatus::UnderReview => "under_review",
            LoanStatus::DocumentsRequired => "documents_required",
            LoanStatus::Approved => "approved",
            LoanStatus::Declined => "declined",
            LoanStatus::Cancelled => "cancelled",
            LoanStatus::Disbursed => "disbursed",
        }
    }
}

/// Employment details captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentDetails {
    pub status: String,
    pub employer_name: String,
    pub years_employed: u8,
}

/// Decision outputs populated together when an application is approved.
///
/// Representing the triple as one optional struct makes the invariant
/// "all three set atomically or none at all" impossible to violate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTerms {
    pub approved_amount: Decimal,
    pub interest_rate: Decimal,
    pub monthly_payment: Decimal,
}

/// Reviewer-supplied inputs required exactly when approving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub approved_amount: Decimal,
    pub interest_rate: Decimal,
}

/// The mutable aggregate tracked through the review lifecycle.
///
/// Loaded, validated, and replaced wholesale by the persistence collaborator;
/// `version` backs the optimistic concurrency check on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub number: ApplicationNumber,
    pub applicant: UserId,
    pub loan_type_id: LoanTypeId,
    pub requested_amount: Decimal,
    pub term_months: u32,
    pub purpose: String,
    pub monthly_income: Decimal,
    pub monthly_expenses: Decimal,
    pub employment: EmploymentDetails,
    pub status: LoanStatus,
    pub decision: Option<DecisionTerms>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reviewer: Option<UserId>,
    pub review_notes: Option<String>,
    pub version: u64,
}

/// Immutable audit record for one accepted transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub application_id: ApplicationId,
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub actor: UserId,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Transition event handed to the notification collaborator after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub application_id: ApplicationId,
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub actor: UserId,
}

/// Identifier wrapper for loan type reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanTypeId(pub Uuid);

/// Reference data bounding a loan request; read-only from the core's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanType {
    pub id: LoanTypeId,
    pub name: String,
    pub description: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub base_annual_rate: Decimal,
    pub min_term_months: u32,
    pub max_term_months: u32,
}

impl LoanType {
    pub fn amount_within(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }

    pub fn term_within(&self, term_months: u32) -> bool {
        term_months >= self.min_term_months && term_months <= self.max_term_months
    }
}

/// Catalog of loan types supplied by the reference data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTypeCatalog {
    types: Vec<LoanType>,
}

impl LoanTypeCatalog {
    pub fn new(types: Vec<LoanType>) -> Self {
        Self { types }
    }

    /// The stock product lineup used by the service binary and demos.
    pub fn standard() -> Self {
        Self::new(vec![
            LoanType {
                id: LoanTypeId(Uuid::from_u128(0x11111111_1111_1111_1111_111111111111)),
                name: "Personal Loan".to_string(),
                description: "Unsecured personal loan for various purposes".to_string(),
                min_amount: dec!(1000),
                max_amount: dec!(50000),
                base_annual_rate: dec!(8.5),
                min_term_months: 6,
                max_term_months: 60,
            },
            LoanType {
                id: LoanTypeId(Uuid::from_u128(0x22222222_2222_2222_2222_222222222222)),
                name: "Home Loan".to_string(),
                description: "Secured loan for purchasing or refinancing a home".to_string(),
                min_amount: dec!(50000),
                max_amount: dec!(1000000),
                base_annual_rate: dec!(4.5),
                min_term_months: 120,
                max_term_months: 360,
            },
            LoanType {
                id: LoanTypeId(Uuid::from_u128(0x33333333_3333_3333_3333_333333333333)),
                name: "Auto Loan".to_string(),
                description: "Secured loan for purchasing a vehicle".to_string(),
                min_amount: dec!(5000),
                max_amount: dec!(100000),
                base_annual_rate: dec!(6.0),
                min_term_months: 24,
                max_term_months: 84,
            },
        ])
    }

    pub fn lookup(&self, id: &LoanTypeId) -> Option<&LoanType> {
        self.types.iter().find(|loan_type| loan_type.id == *id)
    }

    pub fn types(&self) -> &[LoanType] {
        &self.types
    }
}
