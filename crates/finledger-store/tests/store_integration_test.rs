//! Integration tests for the store crate.
//!
//! Most tests start from the portfolio fixture, which holds two stocks, a
//! checking account and two USD exchange rates, with one entry recorded
//! out of value date order.

use finledger_core::{
    Asset, AssetType, AssetTypeTable, EntryKind, Ledger, LedgerEntry, Micros, NaiveDate,
};
use finledger_store::{JsonFileRepository, LedgerRepository, Store, StoreError};
use finledger_validate::ErrorCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const AAPL: &str = "US0378331005";
const NESN: &str = "CH0038863350";
const CHECKING: &str = "CH4804835167777581000";

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn units(n: i64) -> Micros {
    Micros::from_units(n)
}

fn table() -> Arc<AssetTypeTable> {
    Arc::new(AssetTypeTable::standard())
}

fn portfolio() -> Store {
    let repo = JsonFileRepository::new(fixtures_path("portfolio.json"));
    Store::open(&repo, table()).expect("fixture should load")
}

fn sequence_nums(entries: &[Arc<LedgerEntry>]) -> Vec<u64> {
    entries.iter().map(|e| e.sequence_num).collect()
}

fn price(d: NaiveDate, p: i64) -> LedgerEntry {
    LedgerEntry::new(d, EntryKind::AssetPrice { price: units(p) })
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_fixture() {
    let store = portfolio();
    assert_eq!(store.len(), 7);
    assert_eq!(store.assets().len(), 3);

    assert_eq!(sequence_nums(&store.asset_entries(AAPL)), vec![1, 3, 6]);
    assert_eq!(sequence_nums(&store.asset_entries(NESN)), vec![5]);
    assert_eq!(sequence_nums(&store.asset_entries(CHECKING)), vec![4]);
    assert_eq!(sequence_nums(&store.exchange_rates("USD")), vec![2, 7]);

    // The exchange rate without currency was defaulted to the base currency.
    let rate = store.find_entry_by_sequence_num(7).unwrap();
    assert_eq!(rate.currency, "CHF");
}

#[test]
fn test_assets_sorted_by_name() {
    let store = portfolio();
    let names: Vec<String> = store.assets().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Apple Inc.", "Checking", "Nestle"]);
}

#[test]
fn test_load_rejects_non_monotonic_sequence() {
    let mut ledger = portfolio().ledger();
    ledger.entries.swap(2, 3);
    let err = Store::new(ledger, table()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NonMonotonicSequence {
            previous: 4,
            found: 3
        }
    ));
}

#[test]
fn test_load_rejects_duplicate_sequence() {
    let mut ledger = portfolio().ledger();
    ledger.entries[1].sequence_num = 1;
    assert!(matches!(
        Store::new(ledger, table()),
        Err(StoreError::NonMonotonicSequence { .. })
    ));
}

#[test]
fn test_load_rejects_missing_asset_reference() {
    let mut ledger = portfolio().ledger();
    ledger.entries[2].asset_id.clear();
    assert!(matches!(
        Store::new(ledger, table()),
        Err(StoreError::MissingAssetReference { sequence_num: 3 })
    ));
}

#[test]
fn test_load_rejects_invalid_entry() {
    let mut ledger = portfolio().ledger();
    ledger.entries[2].kind = EntryKind::AssetPrice {
        price: Micros::ZERO,
    };
    match Store::new(ledger, table()) {
        Err(StoreError::Validation(err)) => assert_eq!(err.code, ErrorCode::ZeroPrice),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_load_rejects_duplicate_asset() {
    let mut ledger = Ledger::new("CHF");
    let asset = Asset::new(AssetType::Stock, "Apple", "USD").with_ticker("AAPL");
    ledger.assets = vec![asset.clone(), asset];
    assert!(matches!(
        Store::new(ledger, table()),
        Err(StoreError::DuplicateAsset(id)) if id == "AAPL"
    ));
}

#[test]
fn test_load_rejects_invalid_asset() {
    let mut ledger = Ledger::new("CHF");
    let mut asset = Asset::new(AssetType::Stock, "Apple", "USD").with_ticker("AAPL");
    asset.exchange_time_zone = "Nowhere/Special".to_string();
    ledger.assets.push(asset);
    assert!(matches!(
        Store::new(ledger, table()),
        Err(StoreError::Validation(err)) if err.code == ErrorCode::UnknownTimeZone
    ));
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_entries_in_range_is_inclusive() {
    let store = portfolio();
    let in_range = store.entries_in_range(AAPL, date(2024, 1, 10), date(2024, 3, 15));
    assert_eq!(sequence_nums(&in_range), vec![1, 3, 6]);

    let in_range = store.entries_in_range(AAPL, date(2024, 1, 11), date(2024, 3, 14));
    assert_eq!(sequence_nums(&in_range), vec![3]);

    assert!(store
        .entries_in_range(AAPL, date(2024, 3, 16), date(2024, 1, 1))
        .is_empty());
    assert!(store
        .entries_in_range("UNKNOWN", date(2024, 1, 1), date(2024, 12, 31))
        .is_empty());
}

#[test]
fn test_entries_around() {
    let store = portfolio();
    assert_eq!(
        sequence_nums(&store.entries_around(AAPL, date(2024, 2, 1), 1)),
        vec![1, 3]
    );
    assert_eq!(
        sequence_nums(&store.entries_around(AAPL, date(2024, 2, 2), 1)),
        vec![3, 6]
    );
    assert_eq!(
        sequence_nums(&store.entries_around(AAPL, date(2024, 2, 2), 10)),
        vec![1, 3, 6]
    );
    assert!(store.entries_around(AAPL, date(2024, 2, 2), 0).is_empty());
}

#[test]
fn test_price_at() {
    let store = portfolio();
    assert_eq!(store.price_at(AAPL, date(2024, 1, 9)), None);
    assert_eq!(
        store.price_at(AAPL, date(2024, 1, 10)),
        Some((date(2024, 1, 10), units(150)))
    );
    assert_eq!(
        store.price_at(AAPL, date(2024, 3, 14)),
        Some((date(2024, 2, 1), units(160)))
    );
    assert_eq!(
        store.price_at(AAPL, date(2030, 1, 1)),
        Some((date(2024, 3, 15), units(170)))
    );
    // Credits carry no price.
    assert_eq!(store.price_at(CHECKING, date(2030, 1, 1)), None);
}

#[test]
fn test_exchange_rate_at() {
    let store = portfolio();
    assert_eq!(store.exchange_rate_at("CHF", date(1990, 1, 1)), Some(Micros::ONE));
    assert_eq!(store.exchange_rate_at("USD", date(2024, 1, 14)), None);
    assert_eq!(
        store.exchange_rate_at("USD", date(2024, 1, 15)),
        Some(Micros::from_raw(1_150_000))
    );
    assert_eq!(
        store.exchange_rate_at("USD", date(2024, 3, 31)),
        Some(Micros::from_raw(1_150_000))
    );
    assert_eq!(
        store.exchange_rate_at("USD", date(2025, 1, 1)),
        Some(Micros::from_raw(1_100_000))
    );
    assert_eq!(store.exchange_rate_at("EUR", date(2025, 1, 1)), None);
}

#[test]
fn test_find_entry_by_sequence_num() {
    let store = portfolio();
    let entry = store.find_entry_by_sequence_num(5).unwrap();
    assert_eq!(entry.asset_id, NESN);
    assert!(store.find_entry_by_sequence_num(0).is_none());
    assert!(store.find_entry_by_sequence_num(8).is_none());
}

// ============================================================================
// Adding Entries
// ============================================================================

#[test]
fn test_add_resolves_reference_and_defaults_currency() {
    let store = portfolio();
    let entry = store
        .add(price(date(2024, 2, 15), 95).with_asset_ref("NESN"))
        .unwrap();

    assert_eq!(entry.sequence_num, 8);
    assert_eq!(entry.asset_id, NESN);
    assert_eq!(entry.currency, "CHF");
    assert!(entry.created.is_some());
    assert_eq!(sequence_nums(&store.asset_entries(NESN)), vec![5, 8]);
}

#[test]
fn test_add_by_ticker_and_name() {
    let store = portfolio();
    let by_ticker = store
        .add(price(date(2024, 2, 2), 161).with_asset_ref("AAPL"))
        .unwrap();
    let by_name = store
        .add(price(date(2024, 2, 3), 162).with_asset_ref("apple inc."))
        .unwrap();
    assert_eq!(by_ticker.asset_id, AAPL);
    assert_eq!(by_name.asset_id, AAPL);
    assert_eq!(sequence_nums(&store.asset_entries(AAPL)), vec![1, 3, 8, 9, 6]);
}

#[test]
fn test_add_unknown_reference() {
    let store = portfolio();
    let err = store
        .add(price(date(2024, 2, 2), 1).with_asset_ref("MSFT"))
        .unwrap_err();
    assert!(matches!(err, StoreError::AssetNotFound(r) if r == "MSFT"));
    assert_eq!(store.len(), 7);
}

#[test]
fn test_add_ambiguous_reference() {
    let store = portfolio();
    store
        .add_asset(Asset::new(AssetType::StockExchangeTradedFund, "World", "CHF").with_ticker("W1"))
        .unwrap();
    store
        .add_asset(Asset::new(AssetType::StockMutualFund, "World", "CHF").with_ticker("W2"))
        .unwrap();

    let err = store
        .add(price(date(2024, 2, 2), 1).with_asset_ref("world"))
        .unwrap_err();
    match err {
        StoreError::AmbiguousAssetRef {
            reference,
            candidates,
        } => {
            assert_eq!(reference, "world");
            assert_eq!(candidates, vec!["W1".to_string(), "W2".to_string()]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }

    // An exact ID still resolves.
    assert!(store.add(price(date(2024, 2, 2), 1).with_asset_ref("W1")).is_ok());
}

#[test]
fn test_add_invalid_entry_is_not_applied() {
    let store = portfolio();
    let before = store.ledger();

    let sale_with_positive_quantity = LedgerEntry::new(
        date(2024, 4, 1),
        EntryKind::AssetSale {
            quantity: units(1),
            price: units(170),
            cost: Micros::ZERO,
        },
    )
    .with_asset_ref("AAPL");
    let err = store.add(sale_with_positive_quantity).unwrap_err();
    assert!(matches!(err, StoreError::Validation(e) if e.code == ErrorCode::QuantitySign));

    assert_eq!(store.ledger(), before);
    // The rejected entry did not consume a sequence number.
    let next = store
        .add(price(date(2024, 4, 1), 171).with_asset_ref("AAPL"))
        .unwrap();
    assert_eq!(next.sequence_num, 8);
}

#[test]
fn test_add_exchange_rate() {
    let store = portfolio();
    let rate = LedgerEntry::new(
        date(2024, 2, 1),
        EntryKind::ExchangeRate {
            quote_currency: "USD".to_string(),
            rate: Micros::from_raw(1_120_000),
        },
    );
    let rate = store.add(rate).unwrap();
    assert_eq!(rate.currency, "CHF");
    assert_eq!(sequence_nums(&store.exchange_rates("USD")), vec![2, 8, 7]);
    assert_eq!(
        store.exchange_rate_at("USD", date(2024, 2, 29)),
        Some(Micros::from_raw(1_120_000))
    );
    // Exchange rates never land in an asset index.
    assert_eq!(store.asset_entries("").len(), 0);
}

// ============================================================================
// Updating and Deleting Entries
// ============================================================================

#[test]
fn test_update_moves_entry_in_index() {
    let store = portfolio();
    let original = store.find_entry_by_sequence_num(3).unwrap();

    let mut replacement = LedgerEntry::clone(&original);
    replacement.value_date = date(2024, 4, 1);
    replacement.created = None;
    let updated = store.update(replacement).unwrap();

    assert_eq!(updated.sequence_num, 3);
    assert_eq!(updated.created, original.created);
    assert_eq!(sequence_nums(&store.asset_entries(AAPL)), vec![1, 6, 3]);
    assert_eq!(store.len(), 7);
}

#[test]
fn test_update_can_move_entry_between_assets() {
    let store = portfolio();
    let mut replacement = LedgerEntry::clone(&store.find_entry_by_sequence_num(3).unwrap());
    replacement.asset_id = NESN.to_string();
    replacement.currency.clear();

    let updated = store.update(replacement).unwrap();
    assert_eq!(updated.currency, "CHF");
    assert_eq!(sequence_nums(&store.asset_entries(AAPL)), vec![1, 6]);
    assert_eq!(sequence_nums(&store.asset_entries(NESN)), vec![5, 3]);
}

#[test]
fn test_update_missing_entry() {
    let store = portfolio();
    let mut entry = price(date(2024, 2, 2), 1).with_asset_ref("AAPL");
    entry.sequence_num = 42;
    assert!(matches!(store.update(entry), Err(StoreError::EntryNotFound(42))));
}

#[test]
fn test_invalid_update_is_not_applied() {
    let store = portfolio();
    let before = store.ledger();
    let mut replacement = LedgerEntry::clone(&store.find_entry_by_sequence_num(3).unwrap());
    replacement.kind = EntryKind::AssetPrice {
        price: Micros::ZERO,
    };
    assert!(store.update(replacement).is_err());
    assert_eq!(store.ledger(), before);
}

#[test]
fn test_delete() {
    let store = portfolio();
    let deleted = store.delete(5).unwrap();
    assert_eq!(deleted.asset_id, NESN);
    assert!(store.asset_entries(NESN).is_empty());
    assert!(store.find_entry_by_sequence_num(5).is_none());
    assert_eq!(store.len(), 6);

    store.delete(2).unwrap();
    assert_eq!(sequence_nums(&store.exchange_rates("USD")), vec![7]);
}

#[test]
fn test_delete_missing_entry_changes_nothing() {
    let store = portfolio();
    let before = store.ledger();
    assert!(matches!(store.delete(99), Err(StoreError::EntryNotFound(99))));
    assert_eq!(store.ledger(), before);
}

#[test]
fn test_add_then_delete_restores_indices() {
    let store = portfolio();
    let before = store.snapshot();

    let added = store
        .add(price(date(2024, 2, 1), 158).with_asset_ref("AAPL"))
        .unwrap();
    store.delete(added.sequence_num).unwrap();

    let after = store.snapshot();
    assert_eq!(after.to_ledger(), before.to_ledger());
    for asset in before.assets() {
        let id = asset.id().unwrap();
        assert_eq!(after.asset_entries(id), before.asset_entries(id));
    }
    assert_eq!(after.exchange_rates("USD"), before.exchange_rates("USD"));
}

// ============================================================================
// Asset Management
// ============================================================================

#[test]
fn test_update_asset() {
    let store = portfolio();
    let mut nestle = store.asset(NESN).unwrap();
    nestle.comment = "Core holding".to_string();
    store.update_asset(NESN, nestle).unwrap();
    assert_eq!(store.asset(NESN).unwrap().comment, "Core holding");
}

#[test]
fn test_update_asset_immutable_fields() {
    let store = portfolio();
    let field = |asset_id: &str, asset: Asset| match store.update_asset(asset_id, asset) {
        Err(StoreError::ImmutableAssetField { field, .. }) => field,
        other => panic!("expected immutable field error, got {other:?}"),
    };

    let mut renamed = store.asset(NESN).unwrap();
    renamed.isin = "CH0000000000".to_string();
    assert_eq!(field(NESN, renamed), "id");

    let mut other_currency = store.asset(NESN).unwrap();
    other_currency.currency = "EUR".to_string();
    assert_eq!(field(NESN, other_currency), "currency");

    let mut other_category = store.asset(NESN).unwrap();
    other_category.asset_type = AssetType::Commodity;
    assert_eq!(field(NESN, other_category), "category");

    // Savings accounts share the category and accept credits.
    let mut savings = store.asset(CHECKING).unwrap();
    savings.asset_type = AssetType::SavingsAccount;
    store.update_asset(CHECKING, savings).unwrap();
}

#[test]
fn test_currency_change_allowed_without_entries() {
    let store = portfolio();
    store.delete(5).unwrap();
    let mut nestle = store.asset(NESN).unwrap();
    nestle.currency = "EUR".to_string();
    store.update_asset(NESN, nestle).unwrap();
}

#[test]
fn test_delete_asset() {
    let store = portfolio();
    assert!(matches!(
        store.delete_asset(NESN),
        Err(StoreError::AssetInUse { entries: 1, .. })
    ));
    store.delete(5).unwrap();
    assert_eq!(store.delete_asset(NESN).unwrap().name, "Nestle");
    assert!(store.asset(NESN).is_none());
    assert!(matches!(
        store.delete_asset(NESN),
        Err(StoreError::AssetNotFound(_))
    ));
}

// ============================================================================
// Persistence and Concurrency
// ============================================================================

#[test]
fn test_save_and_reopen() {
    let store = portfolio();
    store
        .add(price(date(2024, 5, 1), 175).with_asset_ref("AAPL"))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("ledger.json"));
    store.save(&repo).unwrap();

    let reopened = Store::open(&repo, table()).unwrap();
    assert_eq!(reopened.ledger(), store.ledger());
    assert_eq!(repo.load().unwrap(), store.ledger());
}

#[test]
fn test_read_sees_one_consistent_index() {
    let store = portfolio();
    let (count, last_price, total) = store.read(|index| {
        let entries = index.asset_entries(AAPL);
        let held: Micros = entries.iter().map(|e| e.quantity()).sum();
        (entries.len(), index.price_at(AAPL, date(2024, 12, 31)), held)
    });
    assert_eq!(count, 3);
    assert_eq!(last_price, Some((date(2024, 3, 15), units(170))));
    assert_eq!(total, units(6));
}

#[test]
fn test_concurrent_adds_get_unique_sequence_numbers() {
    let store = portfolio();
    std::thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                for i in 0..25 {
                    store
                        .add(price(date(2024, 6, 1 + t), 100 + i).with_asset_ref("AAPL"))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(store.len(), 107);
    let seqs: Vec<u64> = store.ledger().entries.iter().map(|e| e.sequence_num).collect();
    assert_eq!(seqs, (1..=107).collect::<Vec<_>>());
    let chrono: Vec<_> = store
        .asset_entries(AAPL)
        .iter()
        .map(|e| e.chrono_key())
        .collect();
    assert!(chrono.windows(2).all(|w| w[0] < w[1]));
}
