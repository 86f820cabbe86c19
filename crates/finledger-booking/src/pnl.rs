//! Period profit and loss for equities.

use chrono::NaiveDate;
use finledger_core::{AssetCategory, EntryKind, EntryType, Micros};
use finledger_store::LedgerIndex;
use thiserror::Error;

use crate::position::replay_asset;

/// Errors from the profit/loss calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfitLossError {
    /// The period ends before it starts.
    #[error("invalid period: {start} is after {end}")]
    InvalidPeriod {
        /// Period start.
        start: NaiveDate,
        /// Period end.
        end: NaiveDate,
    },

    /// The asset does not exist.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// The asset has no entries up to the end of the period.
    #[error("no position for asset {0}")]
    NoPosition(String),

    /// Profit and loss is only defined for equities.
    #[error("asset {asset_id} is {category}, not equity")]
    NotEquity {
        /// The asset.
        asset_id: String,
        /// Its category.
        category: AssetCategory,
    },

    /// A holding within the period changes the quantity.
    #[error("holding of {asset_id} on {date} changes the quantity")]
    AmbiguousHolding {
        /// The asset.
        asset_id: String,
        /// Date of the holding entry.
        date: NaiveDate,
    },

    /// An entry type that has no meaning for equity profit and loss.
    #[error("unexpected {entry_type} entry for {asset_id} on {date}")]
    UnexpectedEntryType {
        /// The asset.
        asset_id: String,
        /// The offending entry type.
        entry_type: EntryType,
        /// Date of the entry.
        date: NaiveDate,
    },
}

/// Profit and loss of one asset over a period.
///
/// All amounts are in the asset's currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitLoss {
    /// The asset.
    pub asset_id: String,
    /// Period start (exclusive).
    pub start: NaiveDate,
    /// Period end (inclusive).
    pub end: NaiveDate,
    /// Price at the start of the period.
    pub start_price: Micros,
    /// Market value at the start of the period.
    pub start_value: Micros,
    /// Market value at the end of the period.
    pub end_value: Micros,
    /// Gains from sales within the period.
    pub realized: Micros,
    /// Change in value of the lots still open at the end.
    pub unrealized: Micros,
    /// Basis of the consumed and the remaining lots.
    pub reference_value: Micros,
}

impl ProfitLoss {
    /// Realized plus unrealized.
    pub fn total(&self) -> Micros {
        self.realized + self.unrealized
    }

    /// Total relative to the reference value, `None` without a reference.
    pub fn ratio(&self) -> Option<f64> {
        if self.reference_value.is_zero() {
            None
        } else {
            Some(self.total().to_f64() / self.reference_value.to_f64())
        }
    }
}

/// Compute profit and loss of an equity asset for the period after `start`
/// up to and including `end`.
///
/// Lots open at `start` are valued at the start price, so gains from
/// earlier periods are not counted again. Lots opened within the period
/// count with their purchase price plus fees.
pub fn profit_loss(
    index: &LedgerIndex,
    asset_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ProfitLoss, ProfitLossError> {
    if start > end {
        return Err(ProfitLossError::InvalidPeriod { start, end });
    }
    let asset = index
        .asset(asset_id)
        .ok_or_else(|| ProfitLossError::AssetNotFound(asset_id.to_string()))?;
    let category = index.asset_types().category(asset.asset_type);
    if category != AssetCategory::Equity {
        return Err(ProfitLossError::NotEquity {
            asset_id: asset_id.to_string(),
            category,
        });
    }

    let entries = index.asset_entries(asset_id);
    let split = entries.partition_point(|e| e.value_date <= start);
    let stop = entries.partition_point(|e| e.value_date <= end);
    if stop == 0 {
        return Err(ProfitLossError::NoPosition(asset_id.to_string()));
    }

    let mut position = replay_asset(index, asset_id, asset, entries[..split].iter().map(|e| &**e));
    let start_price = position.price;
    let start_value = position.market_value();
    // Lots open at the start sit at the front and are consumed first.
    let mut carried = position.items.len();
    let mut carried_qty: Micros = position.items.iter().map(|l| l.quantity).sum();

    let mut realized = Micros::ZERO;
    let mut consumed_basis = Micros::ZERO;

    for entry in &entries[split..stop] {
        match entry.kind {
            EntryKind::AssetPurchase { .. }
            | EntryKind::AssetPrice { .. }
            | EntryKind::DividendPayment { .. } => {
                position.apply(entry);
            }
            EntryKind::AssetHolding { quantity, .. } => {
                if quantity != position.quantity {
                    return Err(ProfitLossError::AmbiguousHolding {
                        asset_id: asset_id.to_string(),
                        date: entry.value_date,
                    });
                }
                position.apply(entry);
            }
            EntryKind::AssetSale {
                quantity,
                price,
                cost,
            } => {
                let open_before = position.items.len();
                let consumed = position.apply(entry);

                let mut basis = Micros::ZERO;
                for (i, piece) in consumed.iter().enumerate() {
                    if i < carried {
                        basis += piece.quantity * start_price;
                        carried_qty -= piece.quantity;
                    } else {
                        basis += piece.purchase_price();
                    }
                }
                carried = carried.saturating_sub(open_before - position.items.len());

                let proceeds = quantity.abs() * price;
                realized += proceeds - cost - basis;
                consumed_basis += basis;
            }
            _ => {
                return Err(ProfitLossError::UnexpectedEntryType {
                    asset_id: asset_id.to_string(),
                    entry_type: entry.entry_type(),
                    date: entry.value_date,
                });
            }
        }
    }

    // Units sold beyond the open lots have no lot; they carry the start price
    // like the lots open at the start. One multiplication keeps a period
    // without trades at exactly the change in market value.
    let in_lots: Micros = position.items.iter().map(|l| l.quantity).sum();
    let uncovered = position.quantity - in_lots;
    let remaining_basis = (carried_qty + uncovered) * start_price
        + position.items[carried..]
            .iter()
            .map(|l| l.purchase_price())
            .sum::<Micros>();
    let end_value = position.market_value();

    Ok(ProfitLoss {
        asset_id: asset_id.to_string(),
        start,
        end,
        start_price,
        start_value,
        end_value,
        realized,
        unrealized: end_value - remaining_basis,
        reference_value: consumed_basis + remaining_basis,
    })
}
