//! Flat, display-ready views of ledger entries.

use std::collections::HashMap;

use chrono::NaiveDate;
use finledger_booking::AssetPosition;
use finledger_core::{EntryType, LedgerEntry, Micros};
use finledger_store::LedgerIndex;

/// A ledger entry together with its asset and the position it leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntryRow {
    /// Sequence number of the entry.
    pub sequence_num: u64,
    /// Value date of the entry.
    pub value_date: NaiveDate,
    /// Entry type.
    pub entry_type: EntryType,
    /// Human readable entry type.
    pub type_name: &'static str,
    /// Asset ID, empty for exchange rates.
    pub asset_id: String,
    /// Asset name, or the quote currency for exchange rates.
    pub asset_name: String,
    /// Currency of the amounts.
    pub currency: String,
    /// Units moved or held.
    pub quantity: Micros,
    /// Price per unit, or the exchange rate.
    pub price: Micros,
    /// Monetary value.
    pub value: Micros,
    /// Fees.
    pub cost: Micros,
    /// Units held after the entry.
    pub position_quantity: Option<Micros>,
    /// Market value after the entry.
    pub position_value: Option<Micros>,
    /// Free text.
    pub comment: String,
}

impl LedgerEntryRow {
    fn new(entry: &LedgerEntry, asset_name: String, position: Option<&AssetPosition>) -> Self {
        let entry_type = entry.entry_type();
        Self {
            sequence_num: entry.sequence_num,
            value_date: entry.value_date,
            entry_type,
            type_name: entry_type.display_name(),
            asset_id: entry.asset_id.clone(),
            asset_name,
            currency: entry.currency.clone(),
            quantity: entry.quantity(),
            price: entry.price(),
            value: entry.value(),
            cost: entry.cost(),
            position_quantity: position.map(|p| p.quantity),
            position_value: position.map(AssetPosition::market_value),
            comment: entry.comment.clone(),
        }
    }
}

/// Rows for one asset, in chronological order.
///
/// Empty if the asset does not exist.
pub fn asset_rows(index: &LedgerIndex, asset_id: &str) -> Vec<LedgerEntryRow> {
    let Some(asset) = index.asset(asset_id) else {
        return Vec::new();
    };
    let mut position = AssetPosition::new(
        asset_id,
        asset.currency.as_str(),
        index.asset_types().tracks_transactions(asset.asset_type),
    );
    index
        .asset_entries(asset_id)
        .iter()
        .map(|entry| {
            position.apply(entry);
            LedgerEntryRow::new(entry, asset.name.clone(), Some(&position))
        })
        .collect()
}

/// Rows for the whole ledger, in sequence order.
///
/// Positions reflect all entries of the asset up to the entry's value date,
/// not its sequence number. Exchange rate rows carry no position.
pub fn ledger_rows(index: &LedgerIndex) -> Vec<LedgerEntryRow> {
    let mut by_seq: HashMap<u64, LedgerEntryRow> = index
        .assets()
        .into_iter()
        .filter_map(|asset| asset.id())
        .flat_map(|id| asset_rows(index, id))
        .map(|row| (row.sequence_num, row))
        .collect();

    index
        .entries()
        .iter()
        .map(|entry| {
            by_seq.remove(&entry.sequence_num).unwrap_or_else(|| {
                let quote = entry.quote_currency().unwrap_or_default().to_string();
                LedgerEntryRow::new(entry, quote, None)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finledger_core::{Asset, AssetType, AssetTypeTable, EntryKind, LedgerHeader};
    use std::sync::Arc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_rows_of_account() {
        let table = Arc::new(AssetTypeTable::standard());
        let header = LedgerHeader {
            base_currency: "CHF".to_string(),
        };
        let mut index = LedgerIndex::empty(header, table);
        let checking = Asset::new(AssetType::CheckingAccount, "Checking", "CHF")
            .with_custom_id("checking");
        let id = index.add_asset(checking).unwrap();
        let debit = EntryKind::AccountDebit {
            value: Micros::from_units(-30),
            cost: Micros::ZERO,
        };
        let credit = EntryKind::AccountCredit {
            value: Micros::from_units(100),
            cost: Micros::ZERO,
        };
        index
            .add(LedgerEntry::new(date(2), debit).with_asset_id(&id))
            .unwrap();
        index
            .add(LedgerEntry::new(date(1), credit).with_asset_id(&id))
            .unwrap();

        let rows = asset_rows(&index, &id);
        let values: Vec<_> = rows.iter().map(|r| (r.sequence_num, r.position_value)).collect();
        assert_eq!(
            values,
            vec![(2, Some(Micros::from_units(100))), (1, Some(Micros::from_units(70)))]
        );
        assert!(asset_rows(&index, "missing").is_empty());
    }
}
