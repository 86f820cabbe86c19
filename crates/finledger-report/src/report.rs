//! Quarterly equity report.

use chrono::{Datelike, NaiveDate};
use finledger_booking::{position_at, profit_loss, ProfitLossError};
use finledger_core::{Asset, AssetCategory, EntryKind, Micros};
use finledger_store::LedgerIndex;

use crate::ReportError;

/// What to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Last day of the last period.
    pub end_date: NaiveDate,
    /// Number of periods.
    pub quarters: usize,
}

impl ReportOptions {
    /// Report `quarters` periods up to and including `end_date`.
    pub const fn new(end_date: NaiveDate, quarters: usize) -> Self {
        Self { end_date, quarters }
    }
}

/// A reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    /// Exclusive.
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
}

/// Figures of one asset for one period, in the asset's currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPeriod {
    /// Net cash spent on purchases and sales, fees included.
    pub purchases: Micros,
    /// Market value at the end of the period.
    pub market_value: Micros,
    /// Realized plus unrealized profit.
    pub profit_loss: Micros,
    /// Basis of the profit.
    pub reference_value: Micros,
}

impl AssetPeriod {
    /// Profit relative to the reference value.
    pub fn ratio(&self) -> Option<f64> {
        ratio(self.profit_loss, self.reference_value)
    }
}

/// One asset's row in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    /// The asset's ID.
    pub asset_id: String,
    /// The asset's name.
    pub name: String,
    /// The asset's currency.
    pub currency: String,
    /// One entry per report period.
    pub periods: Vec<AssetPeriod>,
}

/// Sums over all assets for one period, in the base currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodTotals {
    /// Net cash spent.
    pub purchases: Micros,
    /// Market value at the end of the period.
    pub market_value: Micros,
    /// Profit and loss.
    pub profit_loss: Micros,
    /// Basis of the profit.
    pub reference_value: Micros,
    /// Assets left out for lack of an exchange rate.
    pub excluded: Vec<String>,
}

impl PeriodTotals {
    /// Profit relative to the reference value.
    pub fn ratio(&self) -> Option<f64> {
        ratio(self.profit_loss, self.reference_value)
    }
}

/// A quarterly report over all equities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Currency of the totals.
    pub base_currency: String,
    /// The periods, oldest first.
    pub periods: Vec<ReportPeriod>,
    /// Reported assets, sorted by name.
    pub assets: Vec<AssetReport>,
    /// Totals per period.
    pub totals: Vec<PeriodTotals>,
}

fn ratio(profit: Micros, reference: Micros) -> Option<f64> {
    if reference.is_zero() {
        None
    } else {
        Some(profit.to_f64() / reference.to_f64())
    }
}

/// Last day of the quarter before the one containing `date`.
fn previous_quarter_end(date: NaiveDate) -> Option<NaiveDate> {
    let first_month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), first_month, 1)?.pred_opt()
}

/// Period boundaries, oldest first.
///
/// The last period runs from the end of the previous quarter to `end_date`;
/// the ones before it are full calendar quarters.
pub fn report_periods(options: &ReportOptions) -> Result<Vec<ReportPeriod>, ReportError> {
    if options.quarters == 0 {
        return Err(ReportError::NoPeriods);
    }
    let mut periods = Vec::new();
    let mut end = options.end_date;
    for _ in 0..options.quarters {
        let start = previous_quarter_end(end).ok_or(ReportError::DateOutOfRange(end))?;
        periods.push(ReportPeriod { start, end });
        end = start;
    }
    periods.reverse();
    Ok(periods)
}

fn is_reported(index: &LedgerIndex, asset_id: &str, start: NaiveDate, end: NaiveDate) -> bool {
    let active = index
        .asset_entries(asset_id)
        .iter()
        .any(|e| e.value_date > start && e.value_date <= end);
    active || position_at(index, asset_id, start).is_some_and(|p| !p.is_empty())
}

fn asset_period(
    index: &LedgerIndex,
    asset_id: &str,
    period: ReportPeriod,
) -> Result<AssetPeriod, ReportError> {
    let purchases: Micros = index
        .asset_entries(asset_id)
        .iter()
        .filter(|e| e.value_date > period.start && e.value_date <= period.end)
        .filter_map(|e| match e.kind {
            EntryKind::AssetPurchase {
                quantity,
                price,
                cost,
            }
            | EntryKind::AssetSale {
                quantity,
                price,
                cost,
            } => Some(quantity * price + cost),
            _ => None,
        })
        .sum();
    let market_value = position_at(index, asset_id, period.end)
        .map(|p| p.market_value())
        .unwrap_or_default();

    let (total, reference_value) = match profit_loss(index, asset_id, period.start, period.end) {
        Ok(pnl) => (pnl.total(), pnl.reference_value),
        Err(ProfitLossError::NoPosition(_)) => (Micros::ZERO, Micros::ZERO),
        Err(err) => return Err(err.into()),
    };

    Ok(AssetPeriod {
        purchases,
        market_value,
        profit_loss: total,
        reference_value,
    })
}

fn add_to_totals(totals: &mut PeriodTotals, figures: &AssetPeriod, rate: Micros) {
    totals.purchases += figures.purchases / rate;
    totals.market_value += figures.market_value / rate;
    totals.profit_loss += figures.profit_loss / rate;
    totals.reference_value += figures.reference_value / rate;
}

/// Build a quarterly report over every equity that was held or traded
/// within the reported window.
///
/// Totals are converted to the base currency at the rate on each period's
/// end date. An asset whose currency has no rate by then is left out of
/// that period's totals and listed in [`PeriodTotals::excluded`].
pub fn build_report(index: &LedgerIndex, options: &ReportOptions) -> Result<Report, ReportError> {
    let periods = report_periods(options)?;
    let window_start = periods[0].start;
    let window_end = options.end_date;

    let equities: Vec<(&str, &Asset)> = index
        .assets()
        .into_iter()
        .filter(|a| index.asset_types().category(a.asset_type) == AssetCategory::Equity)
        .filter_map(|a| a.id().map(|id| (id, a)))
        .filter(|(id, _)| is_reported(index, id, window_start, window_end))
        .collect();

    let mut totals = vec![PeriodTotals::default(); periods.len()];
    let mut assets = Vec::with_capacity(equities.len());

    for (asset_id, asset) in equities {
        let mut figures = Vec::with_capacity(periods.len());
        for (period, total) in periods.iter().zip(&mut totals) {
            let period_figures = asset_period(index, asset_id, *period)?;
            match index.exchange_rate_at(&asset.currency, period.end) {
                Some(rate) => add_to_totals(total, &period_figures, rate),
                None => {
                    tracing::debug!(
                        "no {} rate on {}, excluding {} from totals",
                        asset.currency,
                        period.end,
                        asset_id
                    );
                    total.excluded.push(asset_id.to_string());
                }
            }
            figures.push(period_figures);
        }
        assets.push(AssetReport {
            asset_id: asset_id.to_string(),
            name: asset.name.clone(),
            currency: asset.currency.clone(),
            periods: figures,
        });
    }

    Ok(Report {
        base_currency: index.base_currency().to_string(),
        periods,
        assets,
        totals,
    })
}
