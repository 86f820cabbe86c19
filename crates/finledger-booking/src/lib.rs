//! Position accounting for finledger.
//!
//! This crate provides:
//! - [`AssetPosition`]: the lot-tracked state of an asset, rebuilt by
//!   replaying its entries
//! - [`position_at`] / [`positions_at`]: positions on a given date
//! - [`profit_loss`]: realized and unrealized gains of an equity over a period
//!
//! # Lots
//!
//! Every purchase opens a lot. Sales consume lots first in, first out; a
//! partially consumed lot keeps the share of its fees that belongs to the
//! units still open.
//!
//! ```
//! use finledger_booking::AssetPosition;
//! use finledger_core::{EntryKind, LedgerEntry, Micros, NaiveDate};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let buy = LedgerEntry::new(day(1), EntryKind::AssetPurchase {
//!     quantity: Micros::from_units(10),
//!     price: Micros::from_units(100),
//!     cost: Micros::from_units(10),
//! });
//! let sell = LedgerEntry::new(day(2), EntryKind::AssetSale {
//!     quantity: Micros::from_units(-4),
//!     price: Micros::from_units(120),
//!     cost: Micros::ZERO,
//! });
//!
//! let position = AssetPosition::replay("AAPL", "USD", false, [&buy, &sell]);
//! assert_eq!(position.quantity, Micros::from_units(6));
//! assert_eq!(position.items[0].cost, Micros::from_units(6));
//! assert_eq!(position.market_value(), Micros::from_units(720));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod pnl;
mod position;

pub use pnl::{profit_loss, ProfitLoss, ProfitLossError};
pub use position::{position_at, positions_at, AssetPosition, AssetPositionItem};
