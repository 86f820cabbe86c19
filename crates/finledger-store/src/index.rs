//! Indexed view of a ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use finledger_core::{Asset, AssetTypeTable, Ledger, LedgerEntry, LedgerHeader, Micros};
use finledger_validate::{
    validate_asset, validate_entries, validate_entry, EntryContext, TimeZoneCache,
};

use crate::StoreError;

/// An entry shared between the canonical list and a chronological index.
pub type EntryRef = Arc<LedgerEntry>;

/// The indices over a ledger, without any locking.
///
/// Holds every entry twice: once in the canonical list ordered by sequence
/// number, and once in exactly one chronological index, either the
/// per-asset index or the per-quote-currency exchange rate index. The
/// chronological indices are ordered by value date, ties broken by
/// sequence number.
///
/// [`Store`](crate::Store) wraps this type behind a lock. A clone is a
/// point-in-time snapshot that can be read without locking.
#[derive(Debug, Clone)]
pub struct LedgerIndex {
    header: LedgerHeader,
    asset_types: Arc<AssetTypeTable>,
    assets: HashMap<String, Asset>,
    entries: Vec<EntryRef>,
    by_asset: HashMap<String, Vec<EntryRef>>,
    by_quote: HashMap<String, Vec<EntryRef>>,
    last_sequence_num: u64,
    time_zones: TimeZoneCache,
}

impl LedgerIndex {
    /// An index over an empty ledger.
    pub fn empty(header: LedgerHeader, asset_types: Arc<AssetTypeTable>) -> Self {
        Self {
            header,
            asset_types,
            assets: HashMap::new(),
            entries: Vec::new(),
            by_asset: HashMap::new(),
            by_quote: HashMap::new(),
            last_sequence_num: 0,
            time_zones: TimeZoneCache::new(),
        }
    }

    /// Build the indices for a loaded ledger.
    ///
    /// Fails if an asset is invalid or duplicated, if sequence numbers are
    /// not strictly increasing, if an entry lacks its asset ID, or if any
    /// entry fails validation.
    pub fn from_ledger(
        ledger: Ledger,
        asset_types: Arc<AssetTypeTable>,
    ) -> Result<Self, StoreError> {
        let Ledger {
            header,
            assets,
            mut entries,
        } = ledger;
        let mut index = Self::empty(header, asset_types);

        for asset in assets {
            index.insert_asset(asset)?;
        }

        let mut previous = 0;
        for entry in &mut entries {
            if entry.sequence_num <= previous {
                return Err(StoreError::NonMonotonicSequence {
                    previous,
                    found: entry.sequence_num,
                });
            }
            previous = entry.sequence_num;

            if entry.quote_currency().is_some() {
                if entry.currency.is_empty() {
                    entry.currency.clone_from(&index.header.base_currency);
                }
            } else if entry.asset_id.is_empty() {
                return Err(StoreError::MissingAssetReference {
                    sequence_num: entry.sequence_num,
                });
            }
        }

        validate_entries(&entries, &index.context())?;

        for entry in entries {
            let entry = Arc::new(entry);
            index.entries.push(Arc::clone(&entry));
            index.chrono_list_mut(&entry).push(entry);
        }
        for list in index.by_asset.values_mut().chain(index.by_quote.values_mut()) {
            list.sort_by_key(|e| e.chrono_key());
        }
        index.last_sequence_num = previous;
        index.check_consistency();

        tracing::debug!(
            "Indexed {} assets and {} entries",
            index.assets.len(),
            index.entries.len()
        );
        Ok(index)
    }

    /// The ledger header.
    pub const fn header(&self) -> &LedgerHeader {
        &self.header
    }

    /// The ledger's base currency.
    pub fn base_currency(&self) -> &str {
        &self.header.base_currency
    }

    /// The asset type configuration.
    pub fn asset_types(&self) -> &AssetTypeTable {
        &self.asset_types
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn context(&self) -> EntryContext<'_> {
        EntryContext {
            assets: &self.assets,
            asset_types: &self.asset_types,
            base_currency: &self.header.base_currency,
        }
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    /// Look up an asset by ID.
    pub fn asset(&self, asset_id: &str) -> Option<&Asset> {
        self.assets.get(asset_id)
    }

    /// All assets, sorted case-insensitively by name.
    pub fn assets(&self) -> Vec<&Asset> {
        let mut assets: Vec<&Asset> = self.assets.values().collect();
        assets.sort_by_cached_key(|a| a.name.to_lowercase());
        assets
    }

    /// Resolve a symbolic asset reference to an asset ID.
    ///
    /// An exact ID match wins; otherwise exactly one asset must match by
    /// identifier or name.
    pub fn resolve_asset_ref(&self, asset_ref: &str) -> Result<&str, StoreError> {
        if let Some((id, _)) = self.assets.get_key_value(asset_ref) {
            return Ok(id);
        }
        let mut matches: Vec<&str> = self
            .assets
            .iter()
            .filter(|(_, asset)| asset.matches_ref(asset_ref))
            .map(|(id, _)| id.as_str())
            .collect();
        match matches.len() {
            0 => Err(StoreError::AssetNotFound(asset_ref.to_string())),
            1 => Ok(matches[0]),
            _ => {
                matches.sort_unstable();
                Err(StoreError::AmbiguousAssetRef {
                    reference: asset_ref.to_string(),
                    candidates: matches.into_iter().map(str::to_string).collect(),
                })
            }
        }
    }

    /// Validate and add an asset, returning its ID.
    pub fn add_asset(&mut self, asset: Asset) -> Result<String, StoreError> {
        let id = self.insert_asset(asset)?;
        tracing::debug!("Added asset {}", id);
        Ok(id)
    }

    fn insert_asset(&mut self, asset: Asset) -> Result<String, StoreError> {
        validate_asset(&asset, &self.asset_types, &mut self.time_zones)?;
        let id = asset.id().unwrap_or_default().to_string();
        if self.assets.contains_key(&id) {
            return Err(StoreError::DuplicateAsset(id));
        }
        self.assets.insert(id.clone(), asset);
        Ok(id)
    }

    /// Replace an asset.
    ///
    /// The ID cannot change. Once entries reference the asset, neither can
    /// its category or currency, and its new type must still allow every
    /// existing entry.
    pub fn update_asset(&mut self, asset_id: &str, asset: Asset) -> Result<(), StoreError> {
        let Some(current) = self.assets.get(asset_id) else {
            return Err(StoreError::AssetNotFound(asset_id.to_string()));
        };
        let immutable = |field| StoreError::ImmutableAssetField {
            asset_id: asset_id.to_string(),
            field,
        };
        if asset.id() != Some(asset_id) {
            return Err(immutable("id"));
        }

        let entries = self.asset_entries(asset_id);
        if !entries.is_empty() {
            let types = &self.asset_types;
            if types.category(current.asset_type) != types.category(asset.asset_type) {
                return Err(immutable("category"));
            }
            if current.currency != asset.currency {
                return Err(immutable("currency"));
            }
            if entries
                .iter()
                .any(|e| !types.allows(asset.asset_type, e.entry_type()))
            {
                return Err(immutable("type"));
            }
        }

        validate_asset(&asset, &self.asset_types, &mut self.time_zones)?;
        self.assets.insert(asset_id.to_string(), asset);
        tracing::debug!("Updated asset {}", asset_id);
        Ok(())
    }

    /// Remove an asset that no entry references.
    pub fn delete_asset(&mut self, asset_id: &str) -> Result<Asset, StoreError> {
        let in_use = self.asset_entries(asset_id).len();
        if in_use > 0 {
            return Err(StoreError::AssetInUse {
                asset_id: asset_id.to_string(),
                entries: in_use,
            });
        }
        let asset = self
            .assets
            .remove(asset_id)
            .ok_or_else(|| StoreError::AssetNotFound(asset_id.to_string()))?;
        tracing::debug!("Deleted asset {}", asset_id);
        Ok(asset)
    }

    // ------------------------------------------------------------------
    // Entry mutation
    // ------------------------------------------------------------------

    /// Validate and insert a new entry.
    ///
    /// Resolves `asset_ref` if no asset ID is given, defaults the currency
    /// from the asset (the base currency for exchange rates) and stamps the
    /// creation time if unset. The entry's sequence number is ignored and
    /// replaced by the next free one.
    pub fn add(&mut self, entry: LedgerEntry) -> Result<EntryRef, StoreError> {
        let mut entry = self.prepare(entry)?;
        if entry.created.is_none() {
            entry.created = Some(Utc::now());
        }
        if let Err(err) = validate_entry(&entry, &self.context()) {
            tracing::warn!("Rejected new {} entry: {}", entry.entry_type(), err);
            return Err(err.into());
        }

        self.last_sequence_num += 1;
        entry.sequence_num = self.last_sequence_num;
        let entry = Arc::new(entry);
        self.entries.push(Arc::clone(&entry));
        self.index_entry(Arc::clone(&entry));
        self.check_consistency();

        tracing::debug!(
            "Added entry {} ({} {})",
            entry.sequence_num,
            entry.entry_type(),
            index_key(&entry)
        );
        Ok(entry)
    }

    /// Replace the entry with the same sequence number.
    ///
    /// The replacement is validated like a new entry. Its creation time is
    /// taken from the replaced entry if unset.
    pub fn update(&mut self, entry: LedgerEntry) -> Result<EntryRef, StoreError> {
        let sequence_num = entry.sequence_num;
        let pos = self
            .position_of(sequence_num)
            .ok_or(StoreError::EntryNotFound(sequence_num))?;
        let mut entry = self.prepare(entry)?;
        if entry.created.is_none() {
            entry.created = self.entries[pos].created;
        }
        if let Err(err) = validate_entry(&entry, &self.context()) {
            tracing::warn!("Rejected update of entry {}: {}", sequence_num, err);
            return Err(err.into());
        }

        let entry = Arc::new(entry);
        let old = std::mem::replace(&mut self.entries[pos], Arc::clone(&entry));
        self.unindex_entry(&old);
        self.index_entry(Arc::clone(&entry));
        self.check_consistency();

        tracing::debug!("Updated entry {} ({})", sequence_num, index_key(&entry));
        Ok(entry)
    }

    /// Remove an entry by sequence number.
    pub fn delete(&mut self, sequence_num: u64) -> Result<EntryRef, StoreError> {
        let pos = self
            .position_of(sequence_num)
            .ok_or(StoreError::EntryNotFound(sequence_num))?;
        let entry = self.entries.remove(pos);
        self.unindex_entry(&entry);
        self.check_consistency();

        tracing::debug!("Deleted entry {} ({})", sequence_num, index_key(&entry));
        Ok(entry)
    }

    fn prepare(&self, mut entry: LedgerEntry) -> Result<LedgerEntry, StoreError> {
        if entry.quote_currency().is_some() {
            if entry.currency.is_empty() {
                entry.currency.clone_from(&self.header.base_currency);
            }
            return Ok(entry);
        }
        if entry.asset_id.is_empty() && !entry.asset_ref.is_empty() {
            entry.asset_id = self.resolve_asset_ref(&entry.asset_ref)?.to_string();
        }
        if entry.currency.is_empty() {
            if let Some(asset) = self.assets.get(&entry.asset_id) {
                entry.currency.clone_from(&asset.currency);
            }
        }
        Ok(entry)
    }

    fn position_of(&self, sequence_num: u64) -> Option<usize> {
        self.entries
            .binary_search_by_key(&sequence_num, |e| e.sequence_num)
            .ok()
    }

    fn chrono_list_mut(&mut self, entry: &LedgerEntry) -> &mut Vec<EntryRef> {
        match entry.quote_currency() {
            Some(quote) => self.by_quote.entry(quote.to_string()).or_default(),
            None => self.by_asset.entry(entry.asset_id.clone()).or_default(),
        }
    }

    fn index_entry(&mut self, entry: EntryRef) {
        let key = entry.chrono_key();
        let list = self.chrono_list_mut(&entry);
        let pos = list.partition_point(|e| e.chrono_key() < key);
        list.insert(pos, entry);
    }

    fn unindex_entry(&mut self, entry: &LedgerEntry) {
        let (map, map_key) = match entry.quote_currency() {
            Some(quote) => (&mut self.by_quote, quote),
            None => (&mut self.by_asset, entry.asset_id.as_str()),
        };
        let Some(list) = map.get_mut(map_key) else {
            panic!("no chronological index for {map_key}");
        };
        let key = entry.chrono_key();
        let pos = list.partition_point(|e| e.chrono_key() < key);
        assert!(
            list.get(pos)
                .is_some_and(|e| e.sequence_num == entry.sequence_num),
            "entry {} is missing from the index of {}",
            entry.sequence_num,
            map_key
        );
        list.remove(pos);
        if list.is_empty() {
            map.remove(map_key);
        }
    }

    /// Every entry must sit in exactly one chronological index.
    fn check_consistency(&self) {
        let indexed: usize = self
            .by_asset
            .values()
            .chain(self.by_quote.values())
            .map(Vec::len)
            .sum();
        assert_eq!(
            indexed,
            self.entries.len(),
            "chronological indices out of sync with the ledger entries"
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All entries in sequence order.
    pub fn entries(&self) -> &[EntryRef] {
        &self.entries
    }

    /// Entries of one asset in chronological order.
    pub fn asset_entries(&self, asset_id: &str) -> &[EntryRef] {
        self.by_asset
            .get(asset_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Exchange rates from the base currency to `quote` in chronological order.
    pub fn exchange_rates(&self, quote: &str) -> &[EntryRef] {
        self.by_quote
            .get(quote)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Entries of one asset with `from <= value_date <= to`.
    pub fn entries_in_range(&self, asset_id: &str, from: NaiveDate, to: NaiveDate) -> &[EntryRef] {
        let list = self.asset_entries(asset_id);
        let lo = list.partition_point(|e| e.value_date < from);
        let hi = list.partition_point(|e| e.value_date <= to);
        list.get(lo..hi).unwrap_or_default()
    }

    /// Up to `n` entries before `date` and up to `n` entries on or after it.
    pub fn entries_around(&self, asset_id: &str, date: NaiveDate, n: usize) -> &[EntryRef] {
        let list = self.asset_entries(asset_id);
        let pos = list.partition_point(|e| e.value_date < date);
        &list[pos.saturating_sub(n)..pos.saturating_add(n).min(list.len())]
    }

    /// The most recent non-zero price of an asset on or before `date`,
    /// with the date it was observed.
    pub fn price_at(&self, asset_id: &str, date: NaiveDate) -> Option<(NaiveDate, Micros)> {
        let list = self.asset_entries(asset_id);
        let end = list.partition_point(|e| e.value_date <= date);
        list[..end]
            .iter()
            .rev()
            .find(|e| !e.price().is_zero())
            .map(|e| (e.value_date, e.price()))
    }

    /// The most recent rate from the base currency to `currency` on or
    /// before `date`.
    ///
    /// One unit of base currency buys `rate` units of `currency`. The base
    /// currency itself always has rate one.
    pub fn exchange_rate_at(&self, currency: &str, date: NaiveDate) -> Option<Micros> {
        if currency == self.header.base_currency {
            return Some(Micros::ONE);
        }
        let list = self.exchange_rates(currency);
        let end = list.partition_point(|e| e.value_date <= date);
        list[..end].last().map(|e| e.price())
    }

    /// Look up an entry by sequence number.
    pub fn find_entry_by_sequence_num(&self, sequence_num: u64) -> Option<&EntryRef> {
        self.position_of(sequence_num).map(|pos| &self.entries[pos])
    }

    /// The serializable form: assets ordered by ID, entries in sequence order.
    pub fn to_ledger(&self) -> Ledger {
        let mut assets: Vec<(&String, &Asset)> = self.assets.iter().collect();
        assets.sort_unstable_by_key(|(id, _)| *id);
        Ledger {
            header: self.header.clone(),
            assets: assets.into_iter().map(|(_, a)| a.clone()).collect(),
            entries: self.entries.iter().map(|e| LedgerEntry::clone(e)).collect(),
        }
    }
}

fn index_key(entry: &LedgerEntry) -> &str {
    entry.quote_currency().unwrap_or(&entry.asset_id)
}
