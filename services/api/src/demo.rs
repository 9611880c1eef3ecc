use std::sync::Arc;

use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::infra::{parse_decimal, InMemoryApplicationRepository, InMemoryTransitionNotifier};
use loan_platform::error::AppError;
use loan_platform::workflows::lending::applications::{
    amortization, Actor, ApplicationRepository, CreateLoanRequest, DecisionPayload,
    EmploymentDetails, LoanStatus, LoanTypeCatalog, LoanWorkflowService, ReviewCommand, Role,
    UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Requested principal for the demo application
    #[arg(long, value_parser = parse_decimal, default_value = "12000")]
    pub(crate) amount: Decimal,
    /// Term in months for the demo application
    #[arg(long, default_value_t = 12)]
    pub(crate) term_months: u32,
    /// Annual interest rate (percent) used when the reviewer approves
    #[arg(long, value_parser = parse_decimal, default_value = "12")]
    pub(crate) rate: Decimal,
    /// Route the application through a documents-required detour first
    #[arg(long)]
    pub(crate) request_documents: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AmortizeArgs {
    /// Principal to amortize
    #[arg(long, value_parser = parse_decimal)]
    pub(crate) principal: Decimal,
    /// Annual interest rate in percent (0 for interest-free)
    #[arg(long, value_parser = parse_decimal)]
    pub(crate) rate: Decimal,
    /// Term in months
    #[arg(long)]
    pub(crate) term_months: u32,
}

pub(crate) fn run_amortize(args: AmortizeArgs) -> Result<(), AppError> {
    let quote = match amortization::quote(args.principal, args.rate, args.term_months) {
        Ok(quote) => quote,
        Err(err) => {
            println!("Quote unavailable: {err}");
            return Ok(());
        }
    };

    println!(
        "Amortization for {} at {}% over {} months",
        args.principal, args.rate, args.term_months
    );
    println!("- Monthly payment: {}", quote.monthly_payment);
    println!("- Total paid:      {}", quote.total_paid);
    println!("- Total interest:  {}", quote.total_interest);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Loan application workflow demo");

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifier = Arc::new(InMemoryTransitionNotifier::default());
    let service = LoanWorkflowService::new(
        repository.clone(),
        notifier.clone(),
        LoanTypeCatalog::standard(),
    );

    let applicant = Actor::new(UserId::new("demo-applicant"), [Role::Applicant]);
    let reviewer = Actor::new(UserId::new("demo-reviewer"), [Role::Reviewer]);
    let officer = Actor::new(UserId::new("demo-officer"), [Role::LoanOfficer]);

    let personal_loan = service
        .catalog()
        .types()
        .first()
        .cloned()
        .expect("standard catalog is never empty");
    let application = service.create(
        &applicant,
        CreateLoanRequest {
            loan_type_id: personal_loan.id,
            requested_amount: args.amount,
            term_months: args.term_months,
            purpose: "Demonstration loan".to_string(),
            monthly_income: dec!(6400),
            monthly_expenses: dec!(2800),
            employment: EmploymentDetails {
                status: "Employed".to_string(),
                employer_name: "Acme Fabrication".to_string(),
                years_employed: 4,
            },
        },
    )?;
    println!(
        "- Created {} ({}) for {} over {} months",
        application.number.0, personal_loan.name, args.amount, args.term_months
    );

    service.submit(
        &applicant,
        &application.id,
        Some("Ready for review".to_string()),
    )?;
    println!("- Applicant submitted the application");

    if args.request_documents {
        service.review(
            &reviewer,
            &application.id,
            ReviewCommand {
                status: LoanStatus::DocumentsRequired,
                notes: Some("Need recent payslips".to_string()),
                decision: None,
            },
        )?;
        println!("- Reviewer requested additional documents");
        service.review(
            &reviewer,
            &application.id,
            ReviewCommand {
                status: LoanStatus::UnderReview,
                notes: Some("Documents received".to_string()),
                decision: None,
            },
        )?;
        println!("- Documents received, application back under review");
    }

    let approved = service.review(
        &reviewer,
        &application.id,
        ReviewCommand {
            status: LoanStatus::Approved,
            notes: Some("Income verified".to_string()),
            decision: Some(DecisionPayload {
                approved_amount: args.amount,
                interest_rate: args.rate,
            }),
        },
    )?;
    let decision = approved
        .decision
        .as_ref()
        .expect("approval always carries decision terms");
    println!(
        "- Reviewer approved {} at {}% -> monthly payment {}",
        decision.approved_amount, decision.interest_rate, decision.monthly_payment
    );

    let disbursed = service.disburse(
        &officer,
        &application.id,
        Some("Funds released".to_string()),
    )?;
    println!("- Officer disbursed; final status: {}", disbursed.status.label());

    println!("\nAudit ledger");
    for entry in repository
        .history(&application.id)
        .map_err(|err| AppError::Workflow(err.into()))?
    {
        println!(
            "- {} | {} -> {} | by {}{}",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            entry.from.label(),
            entry.to.label(),
            entry.actor.0,
            entry
                .notes
                .as_deref()
                .map(|notes| format!(" | {notes}"))
                .unwrap_or_default()
        );
    }

    let events = notifier.events();
    println!("\nTransition events dispatched: {}", events.len());
    for event in events {
        println!(
            "- {} -> {} ({})",
            event.from.label(),
            event.to.label(),
            event.actor.0
        );
    }

    Ok(())
}
