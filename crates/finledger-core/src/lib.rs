//! Core types for finledger
//!
//! This crate provides the fundamental types used throughout the finledger project:
//!
//! - [`Micros`] - A fixed-point value with six fractional digits
//! - [`FormatSpec`] - A small formatting language for [`Micros`]
//! - [`Asset`] - A financial instrument or account
//! - [`AssetTypeTable`] - Category and allowed entry types per [`AssetType`]
//! - [`LedgerEntry`] - A single ledger event, with its payload in [`EntryKind`]
//! - [`Ledger`] - The serialized ledger aggregate
//! - [`iban`] - IBAN checksum validation
//!
//! # Example
//!
//! ```
//! use finledger_core::{Asset, AssetCategory, AssetType, AssetTypeTable, EntryType, Micros};
//!
//! let table = AssetTypeTable::standard();
//! let asset = Asset::new(AssetType::Stock, "Apple Inc.", "USD").with_ticker("AAPL");
//!
//! assert_eq!(asset.id(), Some("AAPL"));
//! assert_eq!(table.category(asset.asset_type), AssetCategory::Equity);
//! assert!(table.allows(asset.asset_type, EntryType::AssetPurchase));
//!
//! let total = Micros::from_units(10) * "187.25".parse::<Micros>().unwrap();
//! assert_eq!(total.format_with(",.2").unwrap(), "1,872.50");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod asset;
pub mod currency;
pub mod entry;
pub mod iban;
pub mod ledger;
pub mod micros;

pub use asset::{Asset, AssetCategory, AssetType, AssetTypeInfo, AssetTypeTable, InterestSchedule};
pub use currency::{is_known_currency, KNOWN_CURRENCIES};
pub use entry::{EntryKind, EntryType, LedgerEntry};
pub use iban::is_valid_iban;
pub use ledger::{Ledger, LedgerHeader};
pub use micros::{Decimals, FormatSpec, Micros, MicrosError, UNIT};

// Re-export commonly used external types
pub use chrono::NaiveDate;
