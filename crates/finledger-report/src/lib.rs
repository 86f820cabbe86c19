//! Returns and reports for finledger.
//!
//! This crate provides:
//! - [`xirr`]: the rate of return of dated cash flows
//! - [`internal_rate_of_return`]: the yield to maturity of a fixed income
//!   position
//! - [`build_report`]: quarterly purchases, market value and profit of all
//!   equities, with totals in the base currency
//! - [`asset_rows`] / [`ledger_rows`]: entries joined with their asset and
//!   the position they leave behind
//!
//! Everything here reads a [`LedgerIndex`](finledger_store::LedgerIndex);
//! take a snapshot of the store to run without holding its lock.
//!
//! ```
//! use std::sync::Arc;
//! use finledger_core::{Asset, AssetType, AssetTypeTable, EntryKind, Ledger, LedgerEntry, Micros, NaiveDate};
//! use finledger_report::{build_report, ReportOptions};
//! use finledger_store::Store;
//!
//! let store = Store::new(Ledger::new("USD"), Arc::new(AssetTypeTable::standard())).unwrap();
//! store.add_asset(Asset::new(AssetType::Stock, "Apple", "USD").with_ticker("AAPL")).unwrap();
//! store.add(
//!     LedgerEntry::new(
//!         NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
//!         EntryKind::AssetPurchase {
//!             quantity: Micros::from_units(10),
//!             price: Micros::from_units(100),
//!             cost: Micros::ZERO,
//!         },
//!     )
//!     .with_asset_ref("AAPL"),
//! ).unwrap();
//!
//! let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
//! let report = build_report(&store.snapshot(), &ReportOptions::new(end, 1)).unwrap();
//! assert_eq!(report.assets.len(), 1);
//! assert_eq!(report.totals[0].market_value, Micros::from_units(1000));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod irr;
mod report;
mod rows;

pub use error::{IrrError, ReportError};
pub use irr::{internal_rate_of_return, xirr};
pub use report::{
    build_report, report_periods, AssetPeriod, AssetReport, PeriodTotals, Report, ReportOptions,
    ReportPeriod,
};
pub use rows::{asset_rows, ledger_rows, LedgerEntryRow};
