//! Assets and the asset type configuration table.
//!
//! An [`Asset`] is a financial instrument or account. Its [`AssetType`]
//! determines its [`AssetCategory`] and which [`EntryType`]s may reference
//! it; that mapping lives in an [`AssetTypeTable`], built once and passed by
//! reference to validation and position accounting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{EntryType, Micros};

/// Broad asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Stocks and stock funds.
    Equity,
    /// Bonds, bond funds and fixed deposits.
    FixedIncome,
    /// Bank and brokerage accounts.
    CashEquivalents,
    /// Pension accounts.
    RetirementSavings,
    /// Physical commodities.
    Commodities,
    /// Tax liabilities and payments.
    Taxes,
    /// Credit cards and loans.
    Debt,
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equity => "Equity",
            Self::FixedIncome => "Fixed income",
            Self::CashEquivalents => "Cash equivalents",
            Self::RetirementSavings => "Retirement savings",
            Self::Commodities => "Commodities",
            Self::Taxes => "Taxes",
            Self::Debt => "Debt",
        };
        f.write_str(name)
    }
}

/// The kind of instrument or account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AssetType {
    Stock,
    StockExchangeTradedFund,
    StockMutualFund,
    BondExchangeTradedFund,
    BondMutualFund,
    CorporateBond,
    GovernmentBond,
    FixedDepositAccount,
    MoneyMarketAccount,
    SavingsAccount,
    CheckingAccount,
    BrokerageAccount,
    PensionAccount,
    Commodity,
    Creditcard,
    TaxLiability,
    TaxPayment,
    OtherDebt,
}

impl AssetType {
    /// All asset types.
    pub const ALL: [Self; 18] = [
        Self::Stock,
        Self::StockExchangeTradedFund,
        Self::StockMutualFund,
        Self::BondExchangeTradedFund,
        Self::BondMutualFund,
        Self::CorporateBond,
        Self::GovernmentBond,
        Self::FixedDepositAccount,
        Self::MoneyMarketAccount,
        Self::SavingsAccount,
        Self::CheckingAccount,
        Self::BrokerageAccount,
        Self::PensionAccount,
        Self::Commodity,
        Self::Creditcard,
        Self::TaxLiability,
        Self::TaxPayment,
        Self::OtherDebt,
    ];
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown asset type: {s}"))
    }
}

/// How interest is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestSchedule {
    /// Interest compounds and is paid at maturity.
    Accrued,
    /// Interest is paid once a year on the nominal value.
    Annual,
}

/// A financial instrument or account.
///
/// The asset's ID is derived from its identifying fields, see [`Asset::id`].
/// Empty strings mean "not set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Instrument or account kind.
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// Display name.
    pub name: String,
    /// Short display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_name: String,
    /// Currency the asset is denominated in.
    pub currency: String,
    /// International Securities Identification Number.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub isin: String,
    /// German securities identification number.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wkn: String,
    /// International Bank Account Number.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iban: String,
    /// Non-IBAN account number.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_number: String,
    /// Exchange ticker symbol.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ticker_symbol: String,
    /// User-assigned identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_id: String,
    /// IANA time zone of the exchange the asset trades on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exchange_time_zone: String,
    /// Issue date (fixed income only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    /// Maturity date (fixed income only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
    /// Nominal interest rate, e.g. `0.04` for 4%.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Micros>,
    /// Interest payment schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_schedule: Option<InterestSchedule>,
    /// Free text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Asset {
    /// Create an asset with no identifying fields set.
    #[must_use]
    pub fn new(asset_type: AssetType, name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            asset_type,
            name: name.into(),
            short_name: String::new(),
            currency: currency.into(),
            isin: String::new(),
            wkn: String::new(),
            iban: String::new(),
            account_number: String::new(),
            ticker_symbol: String::new(),
            custom_id: String::new(),
            exchange_time_zone: String::new(),
            issue_date: None,
            maturity_date: None,
            interest_rate: None,
            interest_schedule: None,
            comment: String::new(),
        }
    }

    /// Set the ISIN.
    #[must_use]
    pub fn with_isin(mut self, isin: impl Into<String>) -> Self {
        self.isin = isin.into();
        self
    }

    /// Set the IBAN.
    #[must_use]
    pub fn with_iban(mut self, iban: impl Into<String>) -> Self {
        self.iban = iban.into();
        self
    }

    /// Set the ticker symbol.
    #[must_use]
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker_symbol = ticker.into();
        self
    }

    /// Set the custom ID.
    #[must_use]
    pub fn with_custom_id(mut self, id: impl Into<String>) -> Self {
        self.custom_id = id.into();
        self
    }

    /// Set issue and maturity dates.
    #[must_use]
    pub fn with_dates(mut self, issue: Option<NaiveDate>, maturity: Option<NaiveDate>) -> Self {
        self.issue_date = issue;
        self.maturity_date = maturity;
        self
    }

    /// Set the interest rate and payment schedule.
    #[must_use]
    pub fn with_interest(mut self, rate: Micros, schedule: InterestSchedule) -> Self {
        self.interest_rate = Some(rate);
        self.interest_schedule = Some(schedule);
        self
    }

    /// The asset's unique ID.
    ///
    /// The first non-empty of ISIN, WKN, IBAN, account number, ticker
    /// symbol and custom ID, in that order.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        [
            &self.isin,
            &self.wkn,
            &self.iban,
            &self.account_number,
            &self.ticker_symbol,
            &self.custom_id,
        ]
        .into_iter()
        .map(String::as_str)
        .find(|s| !s.is_empty())
    }

    /// Check whether a symbolic reference names this asset.
    ///
    /// Identifiers match exactly, names case-insensitively.
    #[must_use]
    pub fn matches_ref(&self, asset_ref: &str) -> bool {
        if asset_ref.is_empty() {
            return false;
        }
        let ids = [
            &self.isin,
            &self.wkn,
            &self.iban,
            &self.account_number,
            &self.ticker_symbol,
            &self.custom_id,
        ];
        ids.into_iter().any(|s| s == asset_ref)
            || self.name.eq_ignore_ascii_case(asset_ref)
            || (!self.short_name.is_empty() && self.short_name.eq_ignore_ascii_case(asset_ref))
    }
}

/// Static properties of an [`AssetType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTypeInfo {
    /// The asset class.
    pub category: AssetCategory,
    /// Human readable name.
    pub display_name: &'static str,
    /// Entry types that may reference an asset of this type.
    pub entry_types: Vec<EntryType>,
    /// Whether credits and debits are tracked as individual lots.
    pub tracks_transactions: bool,
}

/// Immutable asset type configuration.
///
/// Build it once with [`AssetTypeTable::standard`] and share it; every
/// [`AssetType`] is guaranteed to have an entry.
#[derive(Debug, Clone)]
pub struct AssetTypeTable {
    infos: HashMap<AssetType, AssetTypeInfo>,
}

impl AssetTypeTable {
    /// The standard configuration.
    #[must_use]
    pub fn standard() -> Self {
        use AssetCategory::{
            CashEquivalents, Commodities, Debt, Equity, FixedIncome, RetirementSavings, Taxes,
        };
        use EntryType::{
            AccountBalance, AccountCredit, AccountDebit, AssetHolding, AssetMaturity,
            AssetPrice, AssetPurchase, AssetSale, DividendPayment, InterestPayment,
        };

        let securities = |extra: &[EntryType]| {
            let mut v = vec![AssetPurchase, AssetSale, AssetHolding, AssetPrice];
            v.extend_from_slice(extra);
            v
        };
        let account = |extra: &[EntryType]| {
            let mut v = vec![AccountCredit, AccountDebit, AccountBalance];
            v.extend_from_slice(extra);
            v
        };

        let infos = AssetType::ALL
            .into_iter()
            .map(|t| {
                let (category, display_name, entry_types, tracks_transactions) = match t {
                    AssetType::Stock => (Equity, "Stock", securities(&[DividendPayment]), false),
                    AssetType::StockExchangeTradedFund => {
                        (Equity, "Stock ETF", securities(&[DividendPayment]), false)
                    }
                    AssetType::StockMutualFund => {
                        (Equity, "Stock mutual fund", securities(&[DividendPayment]), false)
                    }
                    AssetType::BondExchangeTradedFund => {
                        (FixedIncome, "Bond ETF", securities(&[DividendPayment]), false)
                    }
                    AssetType::BondMutualFund => {
                        (FixedIncome, "Bond mutual fund", securities(&[DividendPayment]), false)
                    }
                    AssetType::CorporateBond => (
                        FixedIncome,
                        "Corporate bond",
                        securities(&[AssetMaturity, InterestPayment]),
                        false,
                    ),
                    AssetType::GovernmentBond => (
                        FixedIncome,
                        "Government bond",
                        securities(&[AssetMaturity, InterestPayment]),
                        false,
                    ),
                    AssetType::FixedDepositAccount => (
                        FixedIncome,
                        "Fixed deposit account",
                        account(&[InterestPayment, AssetMaturity]),
                        true,
                    ),
                    AssetType::MoneyMarketAccount => (
                        CashEquivalents,
                        "Money market account",
                        account(&[InterestPayment]),
                        false,
                    ),
                    AssetType::SavingsAccount => {
                        (CashEquivalents, "Savings account", account(&[InterestPayment]), false)
                    }
                    AssetType::CheckingAccount => {
                        (CashEquivalents, "Checking account", account(&[InterestPayment]), false)
                    }
                    AssetType::BrokerageAccount => {
                        (CashEquivalents, "Brokerage account", account(&[InterestPayment]), false)
                    }
                    AssetType::PensionAccount => {
                        (RetirementSavings, "Pension account", account(&[InterestPayment]), true)
                    }
                    AssetType::Commodity => (Commodities, "Commodity", securities(&[]), false),
                    AssetType::Creditcard => (Debt, "Credit card", account(&[]), false),
                    AssetType::TaxLiability => (Taxes, "Tax liability", account(&[]), false),
                    AssetType::TaxPayment => (Taxes, "Tax payment", account(&[]), false),
                    AssetType::OtherDebt => (Debt, "Other debt", account(&[InterestPayment]), false),
                };
                let info = AssetTypeInfo {
                    category,
                    display_name,
                    entry_types,
                    tracks_transactions,
                };
                (t, info)
            })
            .collect();

        Self { infos }
    }

    /// Replace the configuration of one asset type.
    #[must_use]
    pub fn with_info(mut self, asset_type: AssetType, info: AssetTypeInfo) -> Self {
        self.infos.insert(asset_type, info);
        self
    }

    /// Properties of `asset_type`.
    #[must_use]
    pub fn info(&self, asset_type: AssetType) -> &AssetTypeInfo {
        &self.infos[&asset_type]
    }

    /// The category of `asset_type`.
    #[must_use]
    pub fn category(&self, asset_type: AssetType) -> AssetCategory {
        self.info(asset_type).category
    }

    /// Whether entries of `entry_type` may reference an asset of `asset_type`.
    #[must_use]
    pub fn allows(&self, asset_type: AssetType, entry_type: EntryType) -> bool {
        self.info(asset_type).entry_types.contains(&entry_type)
    }

    /// Whether credits and debits on `asset_type` are tracked as lots.
    #[must_use]
    pub fn tracks_transactions(&self, asset_type: AssetType) -> bool {
        self.info(asset_type).tracks_transactions
    }
}

impl Default for AssetTypeTable {
    fn default() -> Self {
        Self::standard()
    }
}
