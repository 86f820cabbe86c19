//! Report error types.

use chrono::NaiveDate;
use finledger_booking::ProfitLossError;
use thiserror::Error;

/// Error returned when an internal rate of return cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrrError {
    /// Values and dates differ in length.
    #[error("{values} values but {dates} dates")]
    LengthMismatch {
        /// Number of values.
        values: usize,
        /// Number of dates.
        dates: usize,
    },
    /// Fewer than two cash flows.
    #[error("at least two cash flows are required, got {0}")]
    TooFewPoints(usize),
    /// Dates are not strictly ascending.
    #[error("cash flow dates must be strictly ascending")]
    UnsortedDates,
    /// Neither Newton's method nor bisection found a root.
    #[error("no convergence")]
    NoConvergence,
}

/// Error returned when building a report fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The report covers no periods.
    #[error("a report needs at least one period")]
    NoPeriods,
    /// A period boundary falls outside the supported date range.
    #[error("date out of range: {0}")]
    DateOutOfRange(NaiveDate),
    /// Profit and loss of an asset could not be computed.
    #[error(transparent)]
    ProfitLoss(#[from] ProfitLossError),
}
