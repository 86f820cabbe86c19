//! Internal rate of return.
//!
//! Rates are annual. Time is measured in years of 365 days.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use finledger_booking::AssetPosition;
use finledger_core::{Asset, InterestSchedule, Micros};

use crate::IrrError;

const NEWTON_GUESS: f64 = 0.05;
const NEWTON_ITERATIONS: usize = 10;
const BISECTION_ITERATIONS: usize = 50;
const PRECISION: f64 = 1e-7;
const DAYS_PER_YEAR: f64 = 365.0;

fn years_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Future value of the cash flows at the last date, and its derivative.
fn future_value(values: &[f64], years: &[f64], rate: f64) -> (f64, f64) {
    values
        .iter()
        .zip(years)
        .fold((0.0, 0.0), |(fv, dfv), (&v, &t)| {
            (
                fv + v * (1.0 + rate).powf(t),
                dfv + v * t * (1.0 + rate).powf(t - 1.0),
            )
        })
}

fn newton(values: &[f64], years: &[f64]) -> Option<f64> {
    let mut rate = NEWTON_GUESS;
    for _ in 0..NEWTON_ITERATIONS {
        let (fv, dfv) = future_value(values, years, rate);
        if dfv == 0.0 {
            return None;
        }
        let next = rate - fv / dfv;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < PRECISION {
            return Some(next);
        }
        rate = next;
    }
    None
}

/// Bisection, widening the bracket until the sign changes.
fn bisection(values: &[f64], years: &[f64]) -> Option<f64> {
    let fv = |rate| future_value(values, years, rate).0;
    let (mut lo, mut hi) = (0.0_f64, 0.1_f64);
    let mut width = hi - lo;
    let mut iterations = 0;

    while fv(lo).signum() == fv(hi).signum() {
        iterations += 1;
        if iterations > BISECTION_ITERATIONS {
            return None;
        }
        // Stay above -100%.
        lo = -1.0 + (lo + 1.0) / 2.0;
        hi += width;
        width *= 2.0;
    }

    let lo_sign = fv(lo).signum();
    while iterations < BISECTION_ITERATIONS {
        iterations += 1;
        let mid = (lo + hi) / 2.0;
        let value = fv(mid);
        if value == 0.0 || (hi - lo) / 2.0 < PRECISION {
            return Some(mid);
        }
        if value.signum() == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    None
}

fn solve(values: &[f64], years: &[f64]) -> Result<f64, IrrError> {
    newton(values, years)
        .or_else(|| bisection(values, years))
        .ok_or(IrrError::NoConvergence)
}

/// The rate at which the cash flows, compounded to the last date, sum to zero.
///
/// Outflows are negative, inflows positive. Dates must be strictly
/// ascending.
///
/// # Example
///
/// ```
/// use finledger_core::NaiveDate;
/// use finledger_report::xirr;
///
/// let dates = [
///     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
/// ];
/// let rate = xirr(&[-100.0, 110.0], &dates).unwrap();
/// assert!((rate - 0.1).abs() < 1e-6);
/// ```
pub fn xirr(values: &[f64], dates: &[NaiveDate]) -> Result<f64, IrrError> {
    if values.len() != dates.len() {
        return Err(IrrError::LengthMismatch {
            values: values.len(),
            dates: dates.len(),
        });
    }
    if values.len() < 2 {
        return Err(IrrError::TooFewPoints(values.len()));
    }
    if dates.windows(2).any(|w| w[0] >= w[1]) {
        return Err(IrrError::UnsortedDates);
    }

    let last = dates[dates.len() - 1];
    let years: Vec<f64> = dates.iter().map(|&d| years_between(d, last)).collect();
    solve(values, &years)
}

/// Yield to maturity of a fixed income position.
///
/// Each open lot is held to maturity, where it pays back its nominal
/// quantity plus interest: simple interest proportional to the holding
/// period for [`InterestSchedule::Annual`], compound interest for
/// [`InterestSchedule::Accrued`]. The rate is solved against what the lots
/// cost, fees included.
///
/// Returns `Ok(None)` if the asset has no maturity date, the position has
/// no lots, or the position earns exactly nothing.
pub fn internal_rate_of_return(
    position: &AssetPosition,
    asset: &Asset,
) -> Result<Option<f64>, IrrError> {
    let Some(maturity) = asset.maturity_date else {
        return Ok(None);
    };
    if position.items.is_empty() {
        return Ok(None);
    }
    let rate = asset.interest_rate.map_or(0.0, Micros::to_f64);
    let schedule = asset.interest_schedule.unwrap_or(InterestSchedule::Annual);

    // Net cash flow per date; purchases out, maturity payout in.
    let mut flows: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut earnings = 0.0;
    for lot in &position.items {
        let nominal = lot.quantity.to_f64();
        let years = years_between(lot.value_date, maturity);
        let interest = match schedule {
            InterestSchedule::Annual => nominal * rate * years,
            InterestSchedule::Accrued => nominal * ((1.0 + rate).powf(years) - 1.0),
        };
        let paid = lot.purchase_price().to_f64();
        let payout = nominal + interest;

        *flows.entry(lot.value_date).or_default() -= paid;
        *flows.entry(maturity).or_default() += payout;
        earnings += payout - paid;
    }
    if earnings == 0.0 {
        return Ok(None);
    }

    if let [lot] = position.items.as_slice() {
        let years = years_between(lot.value_date, maturity);
        let paid = lot.purchase_price().to_f64();
        if years <= 0.0 || paid <= 0.0 {
            return Ok(None);
        }
        let payout = paid + earnings;
        return Ok(Some((payout / paid).powf(1.0 / years) - 1.0));
    }

    if flows.len() < 2 {
        return Ok(None);
    }
    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = flows.into_iter().unzip();
    xirr(&values, &dates).map(Some)
}
