//! In-memory ledger store.
//!
//! This crate turns a [`Ledger`] into an indexed, mutable working set. It
//! keeps three views consistent with each other:
//!
//! - The canonical entry list, ordered by sequence number
//! - A chronological index per asset
//! - A chronological index of exchange rates per quote currency
//!
//! Every insertion and update is validated first and applied completely or
//! not at all. The [`Store`] serializes callers through a single lock; a
//! [`LedgerIndex`] snapshot can be read without it.
//!
//! # Example
//!
//! ```
//! use finledger_core::{Asset, AssetType, AssetTypeTable, EntryKind, Ledger, LedgerEntry, Micros, NaiveDate};
//! use finledger_store::Store;
//! use std::sync::Arc;
//!
//! let store = Store::new(Ledger::new("CHF"), Arc::new(AssetTypeTable::standard())).unwrap();
//! store.add_asset(Asset::new(AssetType::Stock, "Apple Inc.", "USD").with_ticker("AAPL")).unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let entry = store
//!     .add(LedgerEntry::new(date, EntryKind::AssetPrice { price: Micros::from_units(180) })
//!         .with_asset_ref("Apple Inc."))
//!     .unwrap();
//!
//! assert_eq!(entry.sequence_num, 1);
//! assert_eq!(entry.currency, "USD");
//! assert_eq!(store.price_at("AAPL", date), Some((date, Micros::from_units(180))));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod index;
mod repository;

pub use index::{EntryRef, LedgerIndex};
pub use repository::{JsonFileRepository, LedgerRepository, RepositoryError};

use chrono::NaiveDate;
use finledger_core::{Asset, AssetTypeTable, Ledger, LedgerEntry, Micros};
use finledger_validate::ValidationError;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An asset or entry failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No asset with this ID or reference exists.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// An asset reference matches more than one asset.
    #[error("asset reference {reference:?} is ambiguous: {}", .candidates.join(", "))]
    AmbiguousAssetRef {
        /// The reference as given.
        reference: String,
        /// IDs of all matching assets.
        candidates: Vec<String>,
    },

    /// No entry with this sequence number exists.
    #[error("no entry with sequence number {0}")]
    EntryNotFound(u64),

    /// An asset with the same ID already exists.
    #[error("duplicate asset ID {0}")]
    DuplicateAsset(String),

    /// Loaded entries are not ordered by strictly increasing sequence number.
    #[error("sequence number {found} does not follow {previous}")]
    NonMonotonicSequence {
        /// The preceding sequence number.
        previous: u64,
        /// The offending sequence number.
        found: u64,
    },

    /// A loaded entry has no asset ID.
    #[error("entry {sequence_num} does not reference an asset")]
    MissingAssetReference {
        /// The entry's sequence number.
        sequence_num: u64,
    },

    /// An asset update tried to change a field that is fixed.
    #[error("cannot change {field} of asset {asset_id}")]
    ImmutableAssetField {
        /// The asset being updated.
        asset_id: String,
        /// The field that may not change.
        field: &'static str,
    },

    /// An asset cannot be deleted while entries reference it.
    #[error("asset {asset_id} is referenced by {entries} entries")]
    AssetInUse {
        /// The asset being deleted.
        asset_id: String,
        /// Number of referencing entries.
        entries: usize,
    },

    /// Loading or saving the ledger failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A ledger store guarded by a single lock.
///
/// All methods lock for their whole duration, so every mutation sees and
/// leaves a consistent set of indices. Query results are returned as owned
/// values or shared [`EntryRef`]s that outlive the lock.
#[derive(Debug)]
pub struct Store {
    index: Mutex<LedgerIndex>,
}

impl Store {
    /// Build a store from a loaded ledger.
    ///
    /// See [`LedgerIndex::from_ledger`] for the integrity checks.
    pub fn new(ledger: Ledger, asset_types: Arc<AssetTypeTable>) -> Result<Self, StoreError> {
        Ok(Self {
            index: Mutex::new(LedgerIndex::from_ledger(ledger, asset_types)?),
        })
    }

    /// Load a ledger from a repository and build a store from it.
    pub fn open(
        repository: &impl LedgerRepository,
        asset_types: Arc<AssetTypeTable>,
    ) -> Result<Self, StoreError> {
        Self::new(repository.load()?, asset_types)
    }

    /// Persist the current ledger.
    ///
    /// The lock is released before the repository is written to.
    pub fn save(&self, repository: &impl LedgerRepository) -> Result<(), StoreError> {
        let ledger = self.ledger();
        repository.save(&ledger)?;
        Ok(())
    }

    /// Run a read-only closure against the locked index.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerIndex) -> R) -> R {
        f(&self.index.lock())
    }

    /// A point-in-time copy of the index.
    pub fn snapshot(&self) -> LedgerIndex {
        self.index.lock().clone()
    }

    /// The serializable ledger.
    pub fn ledger(&self) -> Ledger {
        self.index.lock().to_ledger()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    /// Check if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }

    /// See [`LedgerIndex::add`].
    pub fn add(&self, entry: LedgerEntry) -> Result<EntryRef, StoreError> {
        self.index.lock().add(entry)
    }

    /// See [`LedgerIndex::update`].
    pub fn update(&self, entry: LedgerEntry) -> Result<EntryRef, StoreError> {
        self.index.lock().update(entry)
    }

    /// See [`LedgerIndex::delete`].
    pub fn delete(&self, sequence_num: u64) -> Result<EntryRef, StoreError> {
        self.index.lock().delete(sequence_num)
    }

    /// See [`LedgerIndex::add_asset`].
    pub fn add_asset(&self, asset: Asset) -> Result<String, StoreError> {
        self.index.lock().add_asset(asset)
    }

    /// See [`LedgerIndex::update_asset`].
    pub fn update_asset(&self, asset_id: &str, asset: Asset) -> Result<(), StoreError> {
        self.index.lock().update_asset(asset_id, asset)
    }

    /// See [`LedgerIndex::delete_asset`].
    pub fn delete_asset(&self, asset_id: &str) -> Result<Asset, StoreError> {
        self.index.lock().delete_asset(asset_id)
    }

    /// Look up an asset by ID.
    pub fn asset(&self, asset_id: &str) -> Option<Asset> {
        self.index.lock().asset(asset_id).cloned()
    }

    /// All assets, sorted case-insensitively by name.
    pub fn assets(&self) -> Vec<Asset> {
        self.index.lock().assets().into_iter().cloned().collect()
    }

    /// All entries in sequence order.
    pub fn entries(&self) -> Vec<EntryRef> {
        self.index.lock().entries().to_vec()
    }

    /// Entries of one asset in chronological order.
    pub fn asset_entries(&self, asset_id: &str) -> Vec<EntryRef> {
        self.index.lock().asset_entries(asset_id).to_vec()
    }

    /// Exchange rates to `quote` in chronological order.
    pub fn exchange_rates(&self, quote: &str) -> Vec<EntryRef> {
        self.index.lock().exchange_rates(quote).to_vec()
    }

    /// See [`LedgerIndex::entries_in_range`].
    pub fn entries_in_range(&self, asset_id: &str, from: NaiveDate, to: NaiveDate) -> Vec<EntryRef> {
        self.index.lock().entries_in_range(asset_id, from, to).to_vec()
    }

    /// See [`LedgerIndex::entries_around`].
    pub fn entries_around(&self, asset_id: &str, date: NaiveDate, n: usize) -> Vec<EntryRef> {
        self.index.lock().entries_around(asset_id, date, n).to_vec()
    }

    /// See [`LedgerIndex::price_at`].
    pub fn price_at(&self, asset_id: &str, date: NaiveDate) -> Option<(NaiveDate, Micros)> {
        self.index.lock().price_at(asset_id, date)
    }

    /// See [`LedgerIndex::exchange_rate_at`].
    pub fn exchange_rate_at(&self, currency: &str, date: NaiveDate) -> Option<Micros> {
        self.index.lock().exchange_rate_at(currency, date)
    }

    /// Look up an entry by sequence number.
    pub fn find_entry_by_sequence_num(&self, sequence_num: u64) -> Option<EntryRef> {
        self.index
            .lock()
            .find_entry_by_sequence_num(sequence_num)
            .cloned()
    }
}
