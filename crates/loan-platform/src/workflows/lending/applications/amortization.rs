use rust_decimal::{Decimal, RoundingStrategy};

/// Precondition failures for the payment computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmortizationError {
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: &'static str,
    },
    #[error("rate and term overflow the payment computation")]
    Overflow,
}

/// Fixed monthly installment that retires `principal` plus interest over
/// `term_months` at the given annual percentage rate.
///
/// Zero-rate loans divide the principal evenly; everything else uses the
/// standard annuity formula on `Decimal`, rounded half-away-from-zero to two
/// decimal places.
pub fn monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<Decimal, AmortizationError> {
    if principal <= Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "principal",
            reason: "must be positive",
        });
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "annual_rate_percent",
            reason: "must not be negative",
        });
    }
    if term_months == 0 {
        return Err(AmortizationError::InvalidInput {
            field: "term_months",
            reason: "must be a positive number of months",
        });
    }

    let term = Decimal::from(term_months);
    if annual_rate_percent.is_zero() {
        return Ok(round_money(principal / term));
    }

    let monthly_rate = annual_rate_percent / Decimal::from(100) / Decimal::from(12);
    let growth = compound(Decimal::ONE + monthly_rate, term_months)
        .ok_or(AmortizationError::Overflow)?;
    let payment = principal * monthly_rate * growth / (growth - Decimal::ONE);

    Ok(round_money(payment))
}

/// Payment summary derived from a single amortization run.
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationQuote {
    pub monthly_payment: Decimal,
    pub total_paid: Decimal,
    pub total_interest: Decimal,
}

pub fn quote(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Result<AmortizationQuote, AmortizationError> {
    let monthly_payment = self::monthly_payment(principal, annual_rate_percent, term_months)?;
    let total_paid = monthly_payment * Decimal::from(term_months);
    Ok(AmortizationQuote {
        monthly_payment,
        total_paid,
        total_interest: total_paid - principal,
    })
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// (1 + r)^n by squaring; checked so pathological rates surface as Overflow
// instead of a panic.
fn compound(base: Decimal, exponent: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut base = base;
    let mut exponent = exponent;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            base = base.checked_mul(base)?;
        }
    }

    Some(result)
}
