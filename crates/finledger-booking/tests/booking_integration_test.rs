//! Integration tests for positions and profit/loss.

use finledger_booking::{position_at, positions_at, profit_loss, ProfitLossError};
use finledger_core::{
    Asset, AssetCategory, AssetType, AssetTypeTable, EntryKind, EntryType, LedgerEntry,
    LedgerHeader, Micros, NaiveDate,
};
use finledger_store::LedgerIndex;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn units(n: i64) -> Micros {
    Micros::from_units(n)
}

fn ledger() -> LedgerIndex {
    let mut index = LedgerIndex::empty(
        LedgerHeader {
            base_currency: "CHF".to_string(),
        },
        Arc::new(AssetTypeTable::standard()),
    );
    index
        .add_asset(Asset::new(AssetType::Stock, "Apple", "USD").with_ticker("AAPL"))
        .unwrap();
    index
        .add_asset(Asset::new(AssetType::CheckingAccount, "Checking", "CHF").with_custom_id("CHK"))
        .unwrap();
    index
        .add_asset(Asset::new(AssetType::Stock, "Idle", "CHF").with_ticker("IDLE"))
        .unwrap();
    index
}

fn add(index: &mut LedgerIndex, asset: &str, d: NaiveDate, kind: EntryKind) {
    index
        .add(LedgerEntry::new(d, kind).with_asset_ref(asset))
        .unwrap();
}

fn buy(index: &mut LedgerIndex, d: NaiveDate, quantity: i64, price: i64, cost: i64) {
    add(
        index,
        "AAPL",
        d,
        EntryKind::AssetPurchase {
            quantity: units(quantity),
            price: units(price),
            cost: units(cost),
        },
    );
}

fn sell(index: &mut LedgerIndex, d: NaiveDate, quantity: i64, price: i64, cost: i64) {
    add(
        index,
        "AAPL",
        d,
        EntryKind::AssetSale {
            quantity: units(-quantity),
            price: units(price),
            cost: units(cost),
        },
    );
}

fn price(index: &mut LedgerIndex, d: NaiveDate, p: i64) {
    add(index, "AAPL", d, EntryKind::AssetPrice { price: units(p) });
}

/// Ten shares bought in 2023 and marked at 120 on the last day of the year,
/// then a purchase, a partial sale and a new price in 2024.
fn trading_ledger() -> LedgerIndex {
    let mut index = ledger();
    buy(&mut index, date(2023, 3, 1), 10, 100, 10);
    price(&mut index, date(2023, 12, 31), 120);
    buy(&mut index, date(2024, 2, 1), 5, 130, 5);
    sell(&mut index, date(2024, 3, 1), 12, 150, 6);
    price(&mut index, date(2024, 6, 30), 140);
    index
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_position_at_dates() {
    let index = trading_ledger();

    let before = position_at(&index, "AAPL", date(2023, 2, 28)).unwrap();
    assert!(before.is_empty());

    let start = position_at(&index, "AAPL", date(2023, 12, 31)).unwrap();
    assert_eq!(start.quantity, units(10));
    assert_eq!(start.price, units(120));
    assert_eq!(start.market_value(), units(1200));

    let end = position_at(&index, "AAPL", date(2024, 12, 31)).unwrap();
    assert_eq!(end.quantity, units(3));
    assert_eq!(end.items.len(), 1);
    assert_eq!(end.items[0].quantity, units(3));
    assert_eq!(end.items[0].cost, units(3));
    assert_eq!(end.market_value(), units(420));
    assert_eq!(end.price_date, Some(date(2024, 6, 30)));

    assert!(position_at(&index, "MSFT", date(2024, 1, 1)).is_none());
}

#[test]
fn test_positions_at_skips_empty_assets() {
    let mut index = trading_ledger();
    add(
        &mut index,
        "CHK",
        date(2024, 1, 5),
        EntryKind::AccountCredit {
            value: units(2500),
            cost: Micros::ZERO,
        },
    );

    let positions = positions_at(&index, date(2024, 12, 31));
    let ids: Vec<&str> = positions.iter().map(|p| p.asset_id.as_str()).collect();
    assert_eq!(ids, vec!["AAPL", "CHK"]);
    assert_eq!(positions[1].market_value(), units(2500));

    let positions = positions_at(&index, date(2023, 1, 1));
    assert!(positions.is_empty());
}

// ============================================================================
// Profit and Loss
// ============================================================================

#[test]
fn test_profit_loss_with_trades() {
    let index = trading_ledger();
    let pnl = profit_loss(&index, "AAPL", date(2023, 12, 31), date(2024, 12, 31)).unwrap();

    assert_eq!(pnl.start_price, units(120));
    assert_eq!(pnl.start_value, units(1200));
    assert_eq!(pnl.end_value, units(420));
    // Sold 10 carried shares at a basis of 120 and 2 new shares at 130 plus 2 of fees.
    assert_eq!(pnl.realized, units(1800 - 6 - 1200 - 262));
    // Three remaining shares bought at 130 with 3 of fees, now worth 140.
    assert_eq!(pnl.unrealized, units(420 - 393));
    assert_eq!(pnl.total(), units(359));
    assert_eq!(pnl.reference_value, units(1462 + 393));

    // Cash view: end value plus net sale proceeds minus start value and purchases.
    assert_eq!(pnl.total(), units(420 + 1794 - 1200 - 655));
}

#[test]
fn test_profit_loss_first_period() {
    let index = trading_ledger();
    let pnl = profit_loss(&index, "AAPL", date(2023, 1, 1), date(2023, 12, 31)).unwrap();
    assert_eq!(pnl.start_value, Micros::ZERO);
    assert_eq!(pnl.realized, Micros::ZERO);
    assert_eq!(pnl.unrealized, units(1200 - 1010));
    assert_eq!(pnl.reference_value, units(1010));
    let ratio = pnl.ratio().unwrap();
    assert!((ratio - 190.0 / 1010.0).abs() < 1e-12);
}

#[test]
fn test_profit_loss_after_oversold_position() {
    let mut index = ledger();
    buy(&mut index, date(2023, 3, 1), 10, 100, 0);
    sell(&mut index, date(2023, 6, 1), 12, 110, 0);

    let start = date(2023, 12, 31);
    let end = date(2024, 3, 31);
    let pnl = profit_loss(&index, "AAPL", start, end).unwrap();

    assert_eq!(pnl.start_value, units(-220));
    assert_eq!(pnl.end_value, units(-220));
    assert_eq!(pnl.total(), pnl.end_value - pnl.start_value);
    assert_eq!(pnl.total(), Micros::ZERO);

    // A new price moves the short units like any other.
    price(&mut index, date(2024, 2, 1), 100);
    let pnl = profit_loss(&index, "AAPL", start, end).unwrap();
    assert_eq!(pnl.total(), units(20));
}

#[test]
fn test_profit_loss_without_activity() {
    let mut index = ledger();
    buy(&mut index, date(2023, 3, 1), 7, 100, 3);
    price(&mut index, date(2023, 12, 31), 101);
    price(&mut index, date(2024, 5, 1), 97);

    let start = date(2023, 12, 31);
    let end = date(2024, 12, 31);
    let pnl = profit_loss(&index, "AAPL", start, end).unwrap();
    let at_start = position_at(&index, "AAPL", start).unwrap();
    let at_end = position_at(&index, "AAPL", end).unwrap();

    assert_eq!(pnl.realized, Micros::ZERO);
    assert_eq!(pnl.total(), at_end.market_value() - at_start.market_value());
    assert_eq!(pnl.total(), units(-28));
}

#[test]
fn test_profit_loss_holding_with_same_quantity() {
    let mut index = trading_ledger();
    add(
        &mut index,
        "AAPL",
        date(2024, 9, 30),
        EntryKind::AssetHolding {
            quantity: units(3),
            price: units(150),
        },
    );
    let pnl = profit_loss(&index, "AAPL", date(2023, 12, 31), date(2024, 12, 31)).unwrap();
    assert_eq!(pnl.end_value, units(450));
}

#[test]
fn test_profit_loss_rejects_changed_holding() {
    let mut index = trading_ledger();
    add(
        &mut index,
        "AAPL",
        date(2024, 9, 30),
        EntryKind::AssetHolding {
            quantity: units(4),
            price: units(150),
        },
    );
    assert_eq!(
        profit_loss(&index, "AAPL", date(2023, 12, 31), date(2024, 12, 31)),
        Err(ProfitLossError::AmbiguousHolding {
            asset_id: "AAPL".to_string(),
            date: date(2024, 9, 30),
        })
    );
    // The same holding before the period is just history.
    assert!(profit_loss(&index, "AAPL", date(2024, 9, 30), date(2024, 12, 31)).is_ok());
}

#[test]
fn test_profit_loss_errors() {
    let index = trading_ledger();
    assert!(matches!(
        profit_loss(&index, "AAPL", date(2024, 1, 2), date(2024, 1, 1)),
        Err(ProfitLossError::InvalidPeriod { .. })
    ));
    assert!(matches!(
        profit_loss(&index, "MSFT", date(2024, 1, 1), date(2024, 2, 1)),
        Err(ProfitLossError::AssetNotFound(_))
    ));
    assert_eq!(
        profit_loss(&index, "CHK", date(2024, 1, 1), date(2024, 2, 1)),
        Err(ProfitLossError::NotEquity {
            asset_id: "CHK".to_string(),
            category: AssetCategory::CashEquivalents,
        })
    );
    assert!(matches!(
        profit_loss(&index, "IDLE", date(2024, 1, 1), date(2024, 2, 1)),
        Err(ProfitLossError::NoPosition(_))
    ));
    assert!(matches!(
        profit_loss(&index, "AAPL", date(2022, 1, 1), date(2022, 12, 31)),
        Err(ProfitLossError::NoPosition(_))
    ));
}

#[test]
fn test_profit_loss_ignores_dividends() {
    let mut index = trading_ledger();
    add(
        &mut index,
        "AAPL",
        date(2024, 5, 15),
        EntryKind::DividendPayment { value: units(4) },
    );
    let pnl = profit_loss(&index, "AAPL", date(2023, 12, 31), date(2024, 12, 31)).unwrap();
    assert_eq!(pnl.total(), units(359));
}

#[test]
fn test_profit_loss_rejects_unexpected_entry_type() {
    let mut table = AssetTypeTable::standard();
    let mut info = table.info(AssetType::Stock).clone();
    info.entry_types.push(EntryType::InterestPayment);
    table = table.with_info(AssetType::Stock, info);

    let mut index = LedgerIndex::empty(
        LedgerHeader {
            base_currency: "CHF".to_string(),
        },
        Arc::new(table),
    );
    index
        .add_asset(Asset::new(AssetType::Stock, "Apple", "USD").with_ticker("AAPL"))
        .unwrap();
    buy(&mut index, date(2024, 1, 1), 1, 100, 0);
    add(
        &mut index,
        "AAPL",
        date(2024, 2, 1),
        EntryKind::InterestPayment { value: units(1) },
    );

    assert!(matches!(
        profit_loss(&index, "AAPL", date(2024, 1, 1), date(2024, 12, 31)),
        Err(ProfitLossError::UnexpectedEntryType {
            entry_type: EntryType::InterestPayment,
            ..
        })
    ));
}
