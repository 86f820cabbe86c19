//! Known ISO 4217 currency codes.

/// Currency codes accepted on assets and ledger entries.
pub const KNOWN_CURRENCIES: &[&str] = &[
    "AUD", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HUF", "INR", "JPY",
    "MXN", "NOK", "NZD", "PLN", "SEK", "SGD", "USD", "ZAR",
];

/// Check whether `code` is one of [`KNOWN_CURRENCIES`].
#[must_use]
pub fn is_known_currency(code: &str) -> bool {
    KNOWN_CURRENCIES.binary_search(&code).is_ok()
}
