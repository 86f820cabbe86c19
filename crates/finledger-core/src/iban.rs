//! IBAN checksum validation (ISO 13616, mod 97).

/// Check whether `iban` carries a valid ISO 13616 checksum.
///
/// Internal whitespace is ignored, leading or trailing whitespace is not.
/// The country code must be two uppercase letters followed by two check
/// digits.
///
/// ```
/// use finledger_core::iban::is_valid_iban;
///
/// assert!(is_valid_iban("CH4804835167777581000"));
/// assert!(is_valid_iban("CH48 0483 5167 7775 8100 0"));
/// assert!(!is_valid_iban("CH4704835167777581000"));
/// ```
#[must_use]
pub fn is_valid_iban(iban: &str) -> bool {
    if iban.is_empty() || iban.trim() != iban {
        return false;
    }
    let compact: Vec<char> = iban.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() < 5 {
        return false;
    }
    if !compact[..2].iter().all(char::is_ascii_uppercase)
        || !compact[2..4].iter().all(char::is_ascii_digit)
    {
        return false;
    }

    let mut remainder: u32 = 0;
    for ch in compact[4..].iter().chain(&compact[..4]) {
        let value = match ch {
            '0'..='9' => *ch as u32 - '0' as u32,
            'A'..='Z' => *ch as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}
