//! Lot-tracked asset positions.
//!
//! A position is rebuilt by replaying an asset's entries in chronological
//! order. Purchases open lots; sales (and debits on accounts that track
//! individual transactions) consume them oldest first.

use chrono::NaiveDate;
use finledger_core::{Asset, EntryKind, LedgerEntry, Micros};
use finledger_store::LedgerIndex;

/// One open lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPositionItem {
    /// Date the lot was opened.
    pub value_date: NaiveDate,
    /// Units still open.
    pub quantity: Micros,
    /// Price per unit paid.
    pub price: Micros,
    /// Share of the opening fees attributable to the open units.
    pub cost: Micros,
}

impl AssetPositionItem {
    /// What the open units cost, fees included.
    pub fn purchase_price(&self) -> Micros {
        self.quantity * self.price + self.cost
    }
}

/// The state of an asset at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPosition {
    /// The asset's ID.
    pub asset_id: String,
    /// The asset's currency.
    pub currency: String,
    /// Units held.
    pub quantity: Micros,
    /// Monetary value, for assets without a quantity.
    pub value: Micros,
    /// Last known price per unit.
    pub price: Micros,
    /// When `price` was observed.
    pub price_date: Option<NaiveDate>,
    /// Open lots, oldest first.
    pub items: Vec<AssetPositionItem>,
    tracks_transactions: bool,
}

impl AssetPosition {
    /// An empty position.
    ///
    /// With `tracks_transactions`, credits open lots and debits consume
    /// them, one unit per unit of currency.
    pub fn new(asset_id: impl Into<String>, currency: impl Into<String>, tracks_transactions: bool) -> Self {
        Self {
            asset_id: asset_id.into(),
            currency: currency.into(),
            quantity: Micros::ZERO,
            value: Micros::ZERO,
            price: Micros::ZERO,
            price_date: None,
            items: Vec::new(),
            tracks_transactions,
        }
    }

    /// Replay `entries`, which must be in chronological order.
    pub fn replay<'a>(
        asset_id: impl Into<String>,
        currency: impl Into<String>,
        tracks_transactions: bool,
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
    ) -> Self {
        let mut position = Self::new(asset_id, currency, tracks_transactions);
        for entry in entries {
            position.apply(entry);
        }
        position
    }

    /// Whether credits and debits open and consume lots.
    pub const fn tracks_transactions(&self) -> bool {
        self.tracks_transactions
    }

    /// Check if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero() && self.value.is_zero() && self.items.is_empty()
    }

    /// `quantity * price`, or `value` for positions without a quantity.
    pub fn market_value(&self) -> Micros {
        if self.quantity.is_zero() {
            self.value
        } else {
            self.quantity * self.price
        }
    }

    /// Total purchase price of all open lots.
    pub fn purchase_price(&self) -> Micros {
        self.items.iter().map(AssetPositionItem::purchase_price).sum()
    }

    /// Advance the position by one entry.
    ///
    /// Returns the pieces of lots the entry consumed, oldest first, each
    /// with the consumed quantity and its share of the lot's cost.
    pub fn apply(&mut self, entry: &LedgerEntry) -> Vec<AssetPositionItem> {
        let date = entry.value_date;
        match entry.kind {
            EntryKind::AssetPurchase {
                quantity,
                price,
                cost,
            } => {
                self.quantity += quantity;
                self.set_price(price, date);
                self.items.push(AssetPositionItem {
                    value_date: date,
                    quantity,
                    price,
                    cost,
                });
            }
            EntryKind::AssetSale {
                quantity, price, ..
            } => {
                self.quantity += quantity;
                self.set_price(price, date);
                return self.consume(quantity.abs(), date);
            }
            EntryKind::AssetMaturity { .. } => {
                self.quantity = Micros::ZERO;
                self.value = Micros::ZERO;
                self.items.clear();
                self.set_price(entry.price(), date);
            }
            EntryKind::AssetPrice { price } => self.set_price(price, date),
            EntryKind::AccountCredit { value, cost } => {
                self.value += value;
                if self.tracks_transactions {
                    self.items.push(AssetPositionItem {
                        value_date: date,
                        quantity: value,
                        price: Micros::ONE,
                        cost,
                    });
                }
            }
            EntryKind::AccountDebit { value, .. } => {
                self.value += value;
                if self.tracks_transactions {
                    return self.consume(value.abs(), date);
                }
            }
            EntryKind::AccountBalance { value } => self.value = value,
            EntryKind::AssetHolding { quantity, price } => {
                self.set_price(price, date);
                if quantity != self.quantity {
                    self.quantity = quantity;
                    self.value = quantity * price;
                    self.items.clear();
                    if !quantity.is_zero() {
                        self.items.push(AssetPositionItem {
                            value_date: date,
                            quantity,
                            price,
                            cost: Micros::ZERO,
                        });
                    }
                }
            }
            EntryKind::DividendPayment { .. }
            | EntryKind::InterestPayment { .. }
            | EntryKind::ExchangeRate { .. } => {}
        }
        Vec::new()
    }

    fn set_price(&mut self, price: Micros, date: NaiveDate) {
        self.price = price;
        self.price_date = Some(date);
    }

    /// Consume `amount` units from the oldest lots.
    fn consume(&mut self, amount: Micros, date: NaiveDate) -> Vec<AssetPositionItem> {
        let mut remaining = amount;
        let mut consumed = Vec::new();
        let mut emptied = 0;

        for lot in &mut self.items {
            if remaining.is_zero() {
                break;
            }
            if lot.quantity <= remaining {
                remaining -= lot.quantity;
                consumed.push(lot.clone());
                emptied += 1;
            } else {
                let left = lot.quantity - remaining;
                let cost_left = lot.cost.frac(left, lot.quantity);
                consumed.push(AssetPositionItem {
                    quantity: remaining,
                    cost: lot.cost - cost_left,
                    ..lot.clone()
                });
                lot.quantity = left;
                lot.cost = cost_left;
                remaining = Micros::ZERO;
            }
        }
        self.items.drain(..emptied);

        if !remaining.is_zero() {
            tracing::warn!(
                "{} on {}: {} units exceed the open lots",
                self.asset_id,
                date,
                remaining
            );
        }
        consumed
    }
}

/// The position of an asset after all entries on or before `date`.
///
/// Returns `None` if the asset does not exist.
pub fn position_at(index: &LedgerIndex, asset_id: &str, date: NaiveDate) -> Option<AssetPosition> {
    let asset = index.asset(asset_id)?;
    let entries = index.asset_entries(asset_id);
    let end = entries.partition_point(|e| e.value_date <= date);
    Some(replay_asset(index, asset_id, asset, entries[..end].iter().map(|e| &**e)))
}

/// Positions of all assets that hold anything on `date`, ordered by asset name.
pub fn positions_at(index: &LedgerIndex, date: NaiveDate) -> Vec<AssetPosition> {
    index
        .assets()
        .into_iter()
        .filter_map(|asset| asset.id().and_then(|id| position_at(index, id, date)))
        .filter(|position| !position.is_empty())
        .collect()
}

pub(crate) fn replay_asset<'a>(
    index: &LedgerIndex,
    asset_id: &str,
    asset: &Asset,
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> AssetPosition {
    AssetPosition::replay(
        asset_id,
        asset.currency.as_str(),
        index.asset_types().tracks_transactions(asset.asset_type),
        entries,
    )
}
