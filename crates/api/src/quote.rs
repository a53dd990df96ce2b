//! Solar installation quote arithmetic.
//!
//! System size is limited by whichever is smaller: what the roof can hold
//! (100 sq ft per kW) or what the household consumes (one kW per ₹1,000 of
//! monthly bill). Savings assume the system offsets 80% of the bill.

use common::protocol::{QuoteRequest, QuoteResponse};
use common::ServiceError;
use thiserror::Error;

const ROOF_AREA_PER_KW: f64 = 100.0;
const MONTHLY_BILL_PER_KW: f64 = 1000.0;
const COST_PER_KW: f64 = 50_000.0;
const MONTHS_PER_YEAR: f64 = 12.0;
const BILL_OFFSET_RATIO: f64 = 0.8;

/// Errors produced by quote calculation.
#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<QuoteError> for ServiceError {
    fn from(err: QuoteError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

/// Compute a quote. `req.location` is carried but not yet priced.
///
/// # Errors
///
/// Returns [`QuoteError::InvalidInput`] if either number is not finite, the
/// roof area is negative, or the electricity bill is not positive (a zero bill
/// would make the payback period a division by zero). Inputs large enough to
/// overflow any of the outputs are rejected the same way.
pub fn calculate(req: &QuoteRequest) -> Result<QuoteResponse, QuoteError> {
    validate(req)?;

    let system_size_kw =
        (req.roof_area / ROOF_AREA_PER_KW).min(req.electricity_bill / MONTHLY_BILL_PER_KW);
    let estimated_cost = system_size_kw * COST_PER_KW;
    let annual_savings = req.electricity_bill * MONTHS_PER_YEAR * BILL_OFFSET_RATIO;
    let payback_period = estimated_cost / annual_savings;

    if ![system_size_kw, estimated_cost, annual_savings, payback_period]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(QuoteError::InvalidInput(
            "roof_area and electricity_bill are too large to quote".into(),
        ));
    }

    Ok(QuoteResponse {
        system_size_kw: round_to(system_size_kw, 2)?,
        estimated_cost: round_to(estimated_cost, 2)?,
        annual_savings: round_to(annual_savings, 2)?,
        payback_period: round_to(payback_period, 1)?,
    })
}

fn validate(req: &QuoteRequest) -> Result<(), QuoteError> {
    if !req.roof_area.is_finite() || !req.electricity_bill.is_finite() {
        return Err(QuoteError::InvalidInput(
            "roof_area and electricity_bill must be finite numbers".into(),
        ));
    }
    if req.roof_area < 0.0 {
        return Err(QuoteError::InvalidInput("roof_area must not be negative".into()));
    }
    if req.electricity_bill <= 0.0 {
        return Err(QuoteError::InvalidInput(
            "electricity_bill must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Round the exact binary value to `places` decimals, ties to even.
fn round_to(value: f64, places: usize) -> Result<f64, QuoteError> {
    format!("{value:.places$}")
        .parse()
        .map_err(|e| QuoteError::InvalidInput(format!("cannot round {value}: {e}")))
}
