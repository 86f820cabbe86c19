//! Finledger validation rules.
//!
//! This crate implements the consistency checks that every asset and every
//! ledger entry must pass before it enters a store:
//!
//! - Currency codes are known
//! - Exchange rates quote against the base currency
//! - Entries reference an existing asset whose type allows the entry type
//! - Per-type numeric constraints (non-zero prices, quantity and value signs)
//! - Asset category constraints (interest, issue and maturity dates)
//! - IBAN checksums and exchange time zones
//!
//! Validation is pure: it never mutates the entry, the asset or the store.
//!
//! # Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | E1001 | Unknown currency |
//! | E1002 | Exchange rate without quote currency |
//! | E1003 | Exchange rate not based on the base currency |
//! | E1004 | Exchange rate linked to an asset |
//! | E1005 | Invalid exchange rate value |
//! | E2001 | Missing asset reference |
//! | E2002 | Unknown asset |
//! | E2003 | Entry type not allowed for asset type |
//! | E2004 | Entry currency differs from asset currency |
//! | E3001 | Zero price |
//! | E3002 | Zero quantity |
//! | E3003 | Quantity has the wrong sign |
//! | E3004 | Value has the wrong sign |
//! | E3005 | Zero value |
//! | E3006 | Negative cost |
//! | E4001 | Asset has no ID |
//! | E4002 | Asset has no name |
//! | E4003 | Interest fields on equity or commodity |
//! | E4004 | Issue or maturity date on non fixed income asset |
//! | E4005 | Maturity before issue date |
//! | E4006 | Invalid IBAN |
//! | E4007 | Unknown time zone |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono_tz::Tz;
use finledger_core::{
    is_known_currency, is_valid_iban, Asset, AssetCategory, AssetTypeTable, EntryKind,
    LedgerEntry, Micros,
};
use rayon::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === General entry errors (E1xxx) ===
    /// E1001: Currency code is not known.
    UnknownCurrency,
    /// E1002: Exchange rate without quote currency.
    MissingQuoteCurrency,
    /// E1003: Exchange rate whose base is not the ledger's base currency.
    ExchangeRateBaseMismatch,
    /// E1004: Exchange rate that references an asset.
    ExchangeRateWithAsset,
    /// E1005: Exchange rate that is not positive or quotes a currency against itself.
    InvalidExchangeRate,

    // === Asset linkage errors (E2xxx) ===
    /// E2001: Entry without asset reference.
    MissingAssetReference,
    /// E2002: Entry references an asset that does not exist.
    UnknownAsset,
    /// E2003: Entry type not allowed for the asset's type.
    EntryTypeNotAllowed,
    /// E2004: Entry currency differs from the asset's currency.
    CurrencyMismatch,

    // === Numeric errors (E3xxx) ===
    /// E3001: Price must be non-zero.
    ZeroPrice,
    /// E3002: Quantity must be non-zero.
    ZeroQuantity,
    /// E3003: Quantity sign does not match the direction of the entry.
    QuantitySign,
    /// E3004: Value sign does not match the direction of the entry.
    ValueSign,
    /// E3005: Value must be non-zero.
    ZeroValue,
    /// E3006: Cost must not be negative.
    NegativeCost,

    // === Asset errors (E4xxx) ===
    /// E4001: Asset has no identifying field set.
    MissingAssetId,
    /// E4002: Asset has no name.
    MissingAssetName,
    /// E4003: Interest fields on an asset category that pays no interest.
    InterestNotAllowed,
    /// E4004: Issue or maturity date on an asset that is not fixed income.
    DatesNotAllowed,
    /// E4005: Maturity date before issue date.
    MaturityBeforeIssue,
    /// E4006: IBAN checksum mismatch.
    InvalidIban,
    /// E4007: Exchange time zone does not resolve.
    UnknownTimeZone,
}

impl ErrorCode {
    /// Get the error code string (e.g., "E1001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownCurrency => "E1001",
            Self::MissingQuoteCurrency => "E1002",
            Self::ExchangeRateBaseMismatch => "E1003",
            Self::ExchangeRateWithAsset => "E1004",
            Self::InvalidExchangeRate => "E1005",
            Self::MissingAssetReference => "E2001",
            Self::UnknownAsset => "E2002",
            Self::EntryTypeNotAllowed => "E2003",
            Self::CurrencyMismatch => "E2004",
            Self::ZeroPrice => "E3001",
            Self::ZeroQuantity => "E3002",
            Self::QuantitySign => "E3003",
            Self::ValueSign => "E3004",
            Self::ZeroValue => "E3005",
            Self::NegativeCost => "E3006",
            Self::MissingAssetId => "E4001",
            Self::MissingAssetName => "E4002",
            Self::InterestNotAllowed => "E4003",
            Self::DatesNotAllowed => "E4004",
            Self::MaturityBeforeIssue => "E4005",
            Self::InvalidIban => "E4006",
            Self::UnknownTimeZone => "E4007",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ValidationError {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Additional context (asset ID, sequence number, ...).
    pub context: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Lazily filled cache of resolved IANA time zones.
#[derive(Debug, Clone, Default)]
pub struct TimeZoneCache {
    zones: HashMap<String, Option<Tz>>,
}

impl TimeZoneCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a time zone name, caching hits and misses.
    pub fn resolve(&mut self, name: &str) -> Option<Tz> {
        if let Some(tz) = self.zones.get(name) {
            return *tz;
        }
        let tz = name.parse::<Tz>().ok();
        self.zones.insert(name.to_string(), tz);
        tz
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Check if nothing has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// What entry validation needs to know about the ledger.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    /// Assets by ID.
    pub assets: &'a HashMap<String, Asset>,
    /// Asset type configuration.
    pub asset_types: &'a AssetTypeTable,
    /// The ledger's base currency.
    pub base_currency: &'a str,
}

/// Validate a single entry.
///
/// The entry must already carry its resolved `asset_id` and its currency;
/// defaulting those is the store's job.
pub fn validate_entry(entry: &LedgerEntry, ctx: &EntryContext<'_>) -> Result<(), ValidationError> {
    let fail = |code: ErrorCode, message: String| {
        Err(ValidationError::new(code, message)
            .with_context(format!("{} on {}", entry.entry_type(), entry.value_date)))
    };

    if !entry.currency.is_empty() && !is_known_currency(&entry.currency) {
        return fail(
            ErrorCode::UnknownCurrency,
            format!("unknown currency {:?}", entry.currency),
        );
    }

    if let EntryKind::ExchangeRate {
        quote_currency,
        rate,
    } = &entry.kind
    {
        if !entry.asset_id.is_empty() || !entry.asset_ref.is_empty() {
            return fail(
                ErrorCode::ExchangeRateWithAsset,
                "exchange rate must not reference an asset".to_string(),
            );
        }
        if quote_currency.is_empty() {
            return fail(
                ErrorCode::MissingQuoteCurrency,
                "exchange rate requires a quote currency".to_string(),
            );
        }
        if !is_known_currency(quote_currency) {
            return fail(
                ErrorCode::UnknownCurrency,
                format!("unknown quote currency {quote_currency:?}"),
            );
        }
        let base = if entry.currency.is_empty() {
            ctx.base_currency
        } else {
            entry.currency.as_str()
        };
        if base != ctx.base_currency {
            return fail(
                ErrorCode::ExchangeRateBaseMismatch,
                format!(
                    "exchange rate base {base} is not the base currency {}",
                    ctx.base_currency
                ),
            );
        }
        if quote_currency == base {
            return fail(
                ErrorCode::InvalidExchangeRate,
                format!("exchange rate quotes {base} against itself"),
            );
        }
        if !rate.is_positive() {
            return fail(
                ErrorCode::InvalidExchangeRate,
                format!("exchange rate must be positive, got {rate}"),
            );
        }
        return Ok(());
    }

    if entry.asset_id.is_empty() {
        return fail(
            ErrorCode::MissingAssetReference,
            "entry does not reference an asset".to_string(),
        );
    }
    let Some(asset) = ctx.assets.get(&entry.asset_id) else {
        return fail(
            ErrorCode::UnknownAsset,
            format!("unknown asset {:?}", entry.asset_id),
        );
    };
    if !ctx.asset_types.allows(asset.asset_type, entry.entry_type()) {
        return fail(
            ErrorCode::EntryTypeNotAllowed,
            format!(
                "{} entries are not allowed for {} assets",
                entry.entry_type(),
                asset.asset_type
            ),
        );
    }
    if entry.currency != asset.currency {
        return fail(
            ErrorCode::CurrencyMismatch,
            format!(
                "entry currency {:?} differs from asset currency {}",
                entry.currency, asset.currency
            ),
        );
    }

    check_amounts(&entry.kind).or_else(|(code, message)| fail(code, message))
}

type Violation = (ErrorCode, String);

/// Per-type numeric constraints.
fn check_amounts(kind: &EntryKind) -> Result<(), Violation> {
    match kind {
        EntryKind::AssetPurchase {
            quantity,
            price,
            cost,
        } => {
            check_non_zero(*price, ErrorCode::ZeroPrice, "price")?;
            check_sign(*quantity, true)?;
            check_cost(*cost)
        }
        EntryKind::AssetSale {
            quantity,
            price,
            cost,
        } => {
            check_non_zero(*price, ErrorCode::ZeroPrice, "price")?;
            check_sign(*quantity, false)?;
            check_cost(*cost)
        }
        EntryKind::AssetPrice { price } => check_non_zero(*price, ErrorCode::ZeroPrice, "price"),
        EntryKind::AssetHolding { quantity, price } => {
            check_non_zero(*price, ErrorCode::ZeroPrice, "price")?;
            check_non_zero(*quantity, ErrorCode::ZeroQuantity, "quantity")
        }
        EntryKind::AccountCredit { value, cost } => {
            if !value.is_positive() {
                return Err((
                    ErrorCode::ValueSign,
                    format!("credit value must be positive, got {value}"),
                ));
            }
            check_cost(*cost)
        }
        EntryKind::AccountDebit { value, cost } => {
            if !value.is_negative() {
                return Err((
                    ErrorCode::ValueSign,
                    format!("debit value must be negative, got {value}"),
                ));
            }
            check_cost(*cost)
        }
        EntryKind::DividendPayment { value } | EntryKind::InterestPayment { value } => {
            check_non_zero(*value, ErrorCode::ZeroValue, "value")
        }
        EntryKind::AccountBalance { .. }
        | EntryKind::AssetMaturity { .. }
        | EntryKind::ExchangeRate { .. } => Ok(()),
    }
}

fn check_non_zero(v: Micros, code: ErrorCode, what: &str) -> Result<(), Violation> {
    if v.is_zero() {
        return Err((code, format!("{what} must be non-zero")));
    }
    Ok(())
}

fn check_sign(quantity: Micros, positive: bool) -> Result<(), Violation> {
    check_non_zero(quantity, ErrorCode::ZeroQuantity, "quantity")?;
    if quantity.is_positive() != positive {
        let want = if positive { "positive" } else { "negative" };
        return Err((
            ErrorCode::QuantitySign,
            format!("quantity must be {want}, got {quantity}"),
        ));
    }
    Ok(())
}

fn check_cost(cost: Micros) -> Result<(), Violation> {
    if cost.is_negative() {
        return Err((
            ErrorCode::NegativeCost,
            format!("cost must not be negative, got {cost}"),
        ));
    }
    Ok(())
}

/// Validate many entries in parallel.
///
/// Returns the error of the first failing entry in slice order.
pub fn validate_entries(
    entries: &[LedgerEntry],
    ctx: &EntryContext<'_>,
) -> Result<(), ValidationError> {
    match entries
        .par_iter()
        .find_map_first(|e| validate_entry(e, ctx).err())
    {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validate an asset.
pub fn validate_asset(
    asset: &Asset,
    asset_types: &AssetTypeTable,
    time_zones: &mut TimeZoneCache,
) -> Result<(), ValidationError> {
    let Some(id) = asset.id() else {
        return Err(ValidationError::new(
            ErrorCode::MissingAssetId,
            format!("asset {:?} has no identifying field", asset.name),
        ));
    };
    let fail = |code: ErrorCode, message: String| {
        Err(ValidationError::new(code, message).with_context(id.to_string()))
    };

    if asset.name.trim().is_empty() {
        return fail(ErrorCode::MissingAssetName, "asset has no name".to_string());
    }
    if !is_known_currency(&asset.currency) {
        return fail(
            ErrorCode::UnknownCurrency,
            format!("unknown currency {:?}", asset.currency),
        );
    }

    let category = asset_types.category(asset.asset_type);
    if matches!(category, AssetCategory::Equity | AssetCategory::Commodities)
        && (asset.interest_rate.is_some() || asset.interest_schedule.is_some())
    {
        return fail(
            ErrorCode::InterestNotAllowed,
            format!("{category} assets cannot carry interest"),
        );
    }
    if category != AssetCategory::FixedIncome
        && (asset.issue_date.is_some() || asset.maturity_date.is_some())
    {
        return fail(
            ErrorCode::DatesNotAllowed,
            format!("issue and maturity dates are only allowed for fixed income, not {category}"),
        );
    }
    if let (Some(issue), Some(maturity)) = (asset.issue_date, asset.maturity_date) {
        if maturity < issue {
            return fail(
                ErrorCode::MaturityBeforeIssue,
                format!("maturity date {maturity} is before issue date {issue}"),
            );
        }
    }
    if !asset.iban.is_empty() && !is_valid_iban(&asset.iban) {
        return fail(
            ErrorCode::InvalidIban,
            format!("invalid IBAN {:?}", asset.iban),
        );
    }
    if !asset.exchange_time_zone.is_empty()
        && time_zones.resolve(&asset.exchange_time_zone).is_none()
    {
        return fail(
            ErrorCode::UnknownTimeZone,
            format!("unknown time zone {:?}", asset.exchange_time_zone),
        );
    }
    Ok(())
}
