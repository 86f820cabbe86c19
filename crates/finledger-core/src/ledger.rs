//! The serialized ledger aggregate.

use serde::{Deserialize, Serialize};

use crate::{Asset, LedgerEntry};

/// Ledger-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    /// Currency that reports are converted to.
    pub base_currency: String,
}

/// A complete ledger: header, assets and entries in sequence order.
///
/// This is the persisted form. Working with it goes through a store, which
/// builds the indices needed for lookups and keeps them consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Ledger-wide settings.
    pub header: LedgerHeader,
    /// All assets, in no particular order.
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// All entries, ordered by sequence number.
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// An empty ledger with the given base currency.
    #[must_use]
    pub fn new(base_currency: impl Into<String>) -> Self {
        Self {
            header: LedgerHeader {
                base_currency: base_currency.into(),
            },
            assets: Vec::new(),
            entries: Vec::new(),
        }
    }
}
