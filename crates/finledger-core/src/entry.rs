//! Ledger entry types.
//!
//! A [`LedgerEntry`] records one event on the ledger: a purchase, a sale, a
//! price observation, an account movement, an exchange rate, and so on. The
//! event-specific fields live in [`EntryKind`], a closed sum type where each
//! variant carries exactly the fields that are legal for it. Common fields
//! (value date, asset reference, currency) live on the entry itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Micros;

/// The type of a ledger entry, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryType {
    /// Units bought.
    AssetPurchase,
    /// Units sold.
    AssetSale,
    /// A price observation.
    AssetPrice,
    /// An assertion of the current holding (quantity and price).
    AssetHolding,
    /// Money paid into an account.
    AccountCredit,
    /// Money taken out of an account.
    AccountDebit,
    /// An assertion of an account balance.
    AccountBalance,
    /// An asset reached maturity and was paid out.
    AssetMaturity,
    /// A dividend was paid.
    DividendPayment,
    /// Interest was paid.
    InterestPayment,
    /// An exchange rate between the base currency and a quote currency.
    ExchangeRate,
}

impl EntryType {
    /// All entry types.
    pub const ALL: [Self; 11] = [
        Self::AssetPurchase,
        Self::AssetSale,
        Self::AssetPrice,
        Self::AssetHolding,
        Self::AccountCredit,
        Self::AccountDebit,
        Self::AccountBalance,
        Self::AssetMaturity,
        Self::DividendPayment,
        Self::InterestPayment,
        Self::ExchangeRate,
    ];

    /// Identifier used in serialized ledgers and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AssetPurchase => "AssetPurchase",
            Self::AssetSale => "AssetSale",
            Self::AssetPrice => "AssetPrice",
            Self::AssetHolding => "AssetHolding",
            Self::AccountCredit => "AccountCredit",
            Self::AccountDebit => "AccountDebit",
            Self::AccountBalance => "AccountBalance",
            Self::AssetMaturity => "AssetMaturity",
            Self::DividendPayment => "DividendPayment",
            Self::InterestPayment => "InterestPayment",
            Self::ExchangeRate => "ExchangeRate",
        }
    }

    /// Human readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AssetPurchase => "Purchase",
            Self::AssetSale => "Sale",
            Self::AssetPrice => "Price",
            Self::AssetHolding => "Holding",
            Self::AccountCredit => "Credit",
            Self::AccountDebit => "Debit",
            Self::AccountBalance => "Balance",
            Self::AssetMaturity => "Maturity",
            Self::DividendPayment => "Dividend",
            Self::InterestPayment => "Interest",
            Self::ExchangeRate => "Exchange rate",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown entry type: {s}"))
    }
}

/// The payload of a ledger entry.
///
/// Quantities of sales are negative, quantities of purchases positive.
/// Account credits carry a positive value, debits a negative one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntryKind {
    /// Units bought at `price` per unit, plus fees.
    AssetPurchase {
        /// Units bought (positive).
        quantity: Micros,
        /// Price per unit.
        price: Micros,
        /// Fees and commissions.
        #[serde(default)]
        cost: Micros,
    },
    /// Units sold at `price` per unit, minus fees.
    AssetSale {
        /// Units sold (negative).
        quantity: Micros,
        /// Price per unit.
        price: Micros,
        /// Fees and commissions.
        #[serde(default)]
        cost: Micros,
    },
    /// Observed market price.
    AssetPrice {
        /// Price per unit.
        price: Micros,
    },
    /// Asserted holding.
    AssetHolding {
        /// Units held.
        quantity: Micros,
        /// Price per unit.
        price: Micros,
    },
    /// Money paid into an account.
    AccountCredit {
        /// Amount credited (positive).
        value: Micros,
        /// Fees.
        #[serde(default)]
        cost: Micros,
    },
    /// Money taken out of an account.
    AccountDebit {
        /// Amount debited (negative).
        value: Micros,
        /// Fees.
        #[serde(default)]
        cost: Micros,
    },
    /// Asserted account balance.
    AccountBalance {
        /// The balance.
        value: Micros,
    },
    /// Maturity payout.
    AssetMaturity {
        /// Amount paid out at maturity.
        #[serde(default)]
        value: Micros,
    },
    /// Dividend payment.
    DividendPayment {
        /// Amount paid.
        value: Micros,
    },
    /// Interest payment.
    InterestPayment {
        /// Amount paid.
        value: Micros,
    },
    /// One unit of the entry's currency is worth `rate` units of `quote_currency`.
    ExchangeRate {
        /// The quote currency.
        quote_currency: String,
        /// Units of quote currency per unit of base currency.
        rate: Micros,
    },
}

impl EntryKind {
    /// The type tag of this payload.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        match self {
            Self::AssetPurchase { .. } => EntryType::AssetPurchase,
            Self::AssetSale { .. } => EntryType::AssetSale,
            Self::AssetPrice { .. } => EntryType::AssetPrice,
            Self::AssetHolding { .. } => EntryType::AssetHolding,
            Self::AccountCredit { .. } => EntryType::AccountCredit,
            Self::AccountDebit { .. } => EntryType::AccountDebit,
            Self::AccountBalance { .. } => EntryType::AccountBalance,
            Self::AssetMaturity { .. } => EntryType::AssetMaturity,
            Self::DividendPayment { .. } => EntryType::DividendPayment,
            Self::InterestPayment { .. } => EntryType::InterestPayment,
            Self::ExchangeRate { .. } => EntryType::ExchangeRate,
        }
    }

    /// Units moved or held, zero for payloads without a quantity.
    #[must_use]
    pub const fn quantity(&self) -> Micros {
        match self {
            Self::AssetPurchase { quantity, .. }
            | Self::AssetSale { quantity, .. }
            | Self::AssetHolding { quantity, .. } => *quantity,
            _ => Micros::ZERO,
        }
    }

    /// Price per unit (or exchange rate), zero for payloads without one.
    #[must_use]
    pub const fn price(&self) -> Micros {
        match self {
            Self::AssetPurchase { price, .. }
            | Self::AssetSale { price, .. }
            | Self::AssetPrice { price }
            | Self::AssetHolding { price, .. } => *price,
            Self::ExchangeRate { rate, .. } => *rate,
            _ => Micros::ZERO,
        }
    }

    /// Monetary value, zero for payloads without one.
    #[must_use]
    pub const fn value(&self) -> Micros {
        match self {
            Self::AccountCredit { value, .. }
            | Self::AccountDebit { value, .. }
            | Self::AccountBalance { value }
            | Self::AssetMaturity { value }
            | Self::DividendPayment { value }
            | Self::InterestPayment { value } => *value,
            _ => Micros::ZERO,
        }
    }

    /// Fees, zero for payloads without them.
    #[must_use]
    pub const fn cost(&self) -> Micros {
        match self {
            Self::AssetPurchase { cost, .. }
            | Self::AssetSale { cost, .. }
            | Self::AccountCredit { cost, .. }
            | Self::AccountDebit { cost, .. } => *cost,
            _ => Micros::ZERO,
        }
    }
}

/// A single ledger entry.
///
/// The sequence number is assigned by the store on insertion and never
/// changes afterwards; `0` means "not yet inserted". The asset can be given
/// symbolically via `asset_ref` (ticker, ISIN, name, ...); the store
/// resolves it to `asset_id` on insertion.
///
/// # Examples
///
/// ```
/// use finledger_core::{EntryKind, EntryType, LedgerEntry, Micros, NaiveDate};
///
/// let entry = LedgerEntry::new(
///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///     EntryKind::AssetPurchase {
///         quantity: Micros::from_units(10),
///         price: Micros::from_units(150),
///         cost: Micros::ZERO,
///     },
/// )
/// .with_asset_ref("AAPL");
///
/// assert_eq!(entry.entry_type(), EntryType::AssetPurchase);
/// assert_eq!(entry.quantity(), Micros::from_units(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Insertion sequence number.
    #[serde(default)]
    pub sequence_num: u64,
    /// The date the entry takes effect.
    pub value_date: NaiveDate,
    /// When the entry was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Symbolic asset reference as supplied by the caller.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_ref: String,
    /// Resolved asset ID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_id: String,
    /// Currency of the amounts; defaulted from the asset (or the base
    /// currency for exchange rates) when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub currency: String,
    /// Event-specific payload.
    #[serde(flatten)]
    pub kind: EntryKind,
    /// Free text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl LedgerEntry {
    /// Create an entry that is not yet linked to an asset.
    #[must_use]
    pub fn new(value_date: NaiveDate, kind: EntryKind) -> Self {
        Self {
            sequence_num: 0,
            value_date,
            created: None,
            asset_ref: String::new(),
            asset_id: String::new(),
            currency: String::new(),
            kind,
            comment: String::new(),
        }
    }

    /// Set the symbolic asset reference.
    #[must_use]
    pub fn with_asset_ref(mut self, asset_ref: impl Into<String>) -> Self {
        self.asset_ref = asset_ref.into();
        self
    }

    /// Set the resolved asset ID.
    #[must_use]
    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = asset_id.into();
        self
    }

    /// Set the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// The entry type.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        self.kind.entry_type()
    }

    /// See [`EntryKind::quantity`].
    #[must_use]
    pub const fn quantity(&self) -> Micros {
        self.kind.quantity()
    }

    /// See [`EntryKind::price`].
    #[must_use]
    pub const fn price(&self) -> Micros {
        self.kind.price()
    }

    /// See [`EntryKind::value`].
    #[must_use]
    pub const fn value(&self) -> Micros {
        self.kind.value()
    }

    /// See [`EntryKind::cost`].
    #[must_use]
    pub const fn cost(&self) -> Micros {
        self.kind.cost()
    }

    /// Quote currency of an exchange rate entry.
    #[must_use]
    pub fn quote_currency(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::ExchangeRate { quote_currency, .. } => Some(quote_currency),
            _ => None,
        }
    }

    /// Sort key for chronological indices: value date, then sequence number.
    #[must_use]
    pub const fn chrono_key(&self) -> (NaiveDate, u64) {
        (self.value_date, self.sequence_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_accessors() {
        let sale = EntryKind::AssetSale {
            quantity: Micros::from_units(-5),
            price: Micros::from_units(20),
            cost: Micros::from_units(1),
        };
        assert_eq!(sale.entry_type(), EntryType::AssetSale);
        assert_eq!(sale.quantity(), Micros::from_units(-5));
        assert_eq!(sale.price(), Micros::from_units(20));
        assert_eq!(sale.cost(), Micros::from_units(1));
        assert_eq!(sale.value(), Micros::ZERO);

        let credit = EntryKind::AccountCredit {
            value: Micros::from_units(100),
            cost: Micros::ZERO,
        };
        assert_eq!(credit.value(), Micros::from_units(100));
        assert_eq!(credit.quantity(), Micros::ZERO);
        assert_eq!(credit.price(), Micros::ZERO);
    }

    #[test]
    fn test_entry_type_from_str() {
        assert_eq!(
            "assetpurchase".parse::<EntryType>(),
            Ok(EntryType::AssetPurchase)
        );
        assert_eq!("ExchangeRate".parse::<EntryType>(), Ok(EntryType::ExchangeRate));
        assert!("Transfer".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let entry = LedgerEntry::new(
            date(2024, 1, 2),
            EntryKind::ExchangeRate {
                quote_currency: "EUR".to_string(),
                rate: Micros::from_raw(1_050_000),
            },
        )
        .with_currency("CHF");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "ExchangeRate");
        assert_eq!(json["quote_currency"], "EUR");
        assert_eq!(json["rate"], 1_050_000);
        assert!(json.get("asset_id").is_none());

        let back: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.quote_currency(), Some("EUR"));
    }

    #[test]
    fn test_cost_defaults_to_zero() {
        let json = serde_json::json!({
            "value_date": "2024-01-02",
            "type": "AssetPurchase",
            "quantity": 1_000_000,
            "price": 2_000_000,
        });
        let entry: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.cost(), Micros::ZERO);
        assert_eq!(entry.sequence_num, 0);
    }
}
