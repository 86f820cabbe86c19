//! Fixed-point monetary values scaled by one million.
//!
//! A [`Micros`] stores a value as a signed 64-bit integer with six implied
//! fractional digits, so `1.5` is stored as `1_500_000`. All arithmetic is
//! exact or detected: multiplication and fractions compute the product in a
//! 64-bit fast path and fall back to 128-bit integers when that overflows.
//! Operator impls panic if the result cannot be represented, the `checked_*`
//! methods return `None` instead.
//!
//! Values can be parsed from decimal strings and rendered with a small
//! formatting language, see [`FormatSpec`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// The scale factor: one unit is one million micros.
pub const UNIT: i64 = 1_000_000;

/// Number of fractional digits represented by [`Micros`].
pub const FRACTION_DIGITS: usize = 6;

/// Largest integer part accepted by [`Micros::parse`].
///
/// This keeps every parsed value (including its six fractional digits)
/// inside the `i64` range, with headroom for sign handling.
pub const MAX_INTEGER_PART: u64 = 9_223_372_036_853;

/// Errors from parsing decimal strings or format specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicrosError {
    /// The input string was empty.
    #[error("empty decimal string")]
    Empty,

    /// The input contained no digits at all (e.g. `"-"` or `"."`).
    #[error("no digits in decimal string {input:?}")]
    NoDigits {
        /// The rejected input.
        input: String,
    },

    /// The input contained a character that is not part of a decimal number.
    #[error("invalid character {ch:?} in decimal string {input:?}")]
    InvalidCharacter {
        /// The rejected input.
        input: String,
        /// The offending character.
        ch: char,
    },

    /// More than six fractional digits.
    #[error("too many fractional digits in {input:?} (at most {FRACTION_DIGITS})")]
    TooManyFractionalDigits {
        /// The rejected input.
        input: String,
    },

    /// The value does not fit the supported range.
    #[error("decimal {input:?} is out of range")]
    OutOfRange {
        /// The rejected input.
        input: String,
    },

    /// A malformed format specification.
    #[error("invalid format spec {spec:?}: {reason}")]
    InvalidFormatSpec {
        /// The rejected format specification.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A monetary or quantity value with six fractional digits.
///
/// # Examples
///
/// ```
/// use finledger_core::Micros;
///
/// let price: Micros = "12.50".parse().unwrap();
/// let quantity = Micros::from_units(4);
/// assert_eq!(price * quantity, Micros::from_units(50));
/// assert_eq!(price.to_string(), "12.50");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Micros(i64);

impl Micros {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One unit (`1.000000`).
    pub const ONE: Self = Self(UNIT);
    /// The largest representable value.
    pub const MAX: Self = Self(i64::MAX);
    /// The smallest representable value.
    pub const MIN: Self = Self(i64::MIN);

    /// Wrap a raw scaled integer.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw scaled integer.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// A whole number of units.
    ///
    /// # Panics
    ///
    /// Panics if `units * 1_000_000` overflows.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        match units.checked_mul(UNIT) {
            Some(raw) => Self(raw),
            None => panic!("Micros::from_units({units}) overflows"),
        }
    }

    /// Check if the value is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if the value is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Check if the value is strictly negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    ///
    /// # Panics
    ///
    /// Panics for [`Micros::MIN`], whose absolute value is not representable.
    #[must_use]
    pub fn abs(self) -> Self {
        match self.0.checked_abs() {
            Some(raw) => Self(raw),
            None => panic!("Micros::abs overflows for {}", self.0),
        }
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Checked multiplication: `self * other / 1_000_000`, truncated toward zero.
    ///
    /// Returns `None` if the rescaled result does not fit.
    #[must_use]
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        if let Some(product) = self.0.checked_mul(other.0) {
            return Some(Self(product / UNIT));
        }
        let wide = i128::from(self.0) * i128::from(other.0) / i128::from(UNIT);
        i64::try_from(wide).ok().map(Self)
    }

    /// Checked division: `self * 1_000_000 / other`, truncated toward zero.
    ///
    /// Returns `None` if `other` is zero or the result does not fit.
    #[must_use]
    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.checked_frac(Self::ONE, other)
    }

    /// Checked fraction: `self * numer / denom`, truncated toward zero.
    ///
    /// The ratio `numer / denom` is scale-free, so `x.checked_frac(a, b)`
    /// scales `x` by `a / b` without an intermediate rounding step.
    #[must_use]
    pub fn checked_frac(self, numer: Self, denom: Self) -> Option<Self> {
        if denom.0 == 0 {
            return None;
        }
        if let Some(product) = self.0.checked_mul(numer.0) {
            return product.checked_div(denom.0).map(Self);
        }
        let wide = i128::from(self.0) * i128::from(numer.0) / i128::from(denom.0);
        i64::try_from(wide).ok().map(Self)
    }

    /// `self * numer / denom`, truncated toward zero.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero or the result is not representable.
    #[must_use]
    pub fn frac(self, numer: Self, denom: Self) -> Self {
        match self.checked_frac(numer, denom) {
            Some(v) => v,
            None => panic!("Micros::frac({self:?}, {numer:?}, {denom:?}) is not representable"),
        }
    }

    /// Convert to a floating point number (lossy).
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / UNIT as f64
    }

    /// Convert from a floating point number, rounding to the nearest micro.
    ///
    /// Returns `None` for non-finite or out-of-range inputs.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        let scaled = (value * UNIT as f64).round();
        if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// Convert to an exact [`Decimal`].
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, FRACTION_DIGITS as u32)
    }

    /// Convert from a [`Decimal`], truncating digits beyond the sixth.
    ///
    /// Returns `None` if the value does not fit.
    #[must_use]
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let scaled = value.checked_mul(Decimal::from(UNIT))?.trunc();
        i64::try_from(scaled.mantissa() / 10i128.pow(scaled.scale()))
            .ok()
            .map(Self)
    }

    /// Parse a decimal string such as `"-1234.56"`.
    ///
    /// Accepts an optional sign, an optional integer part and an optional
    /// `.` followed by at most six fractional digits. Whitespace, empty
    /// input and values whose integer part exceeds [`MAX_INTEGER_PART`] are
    /// rejected. `"-0"` parses as zero.
    pub fn parse(input: &str) -> Result<Self, MicrosError> {
        if input.is_empty() {
            return Err(MicrosError::Empty);
        }
        let (negative, body) = match input.as_bytes()[0] {
            b'-' => (true, &input[1..]),
            b'+' => (false, &input[1..]),
            _ => (false, input),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if let Some(ch) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(MicrosError::InvalidCharacter {
                input: input.to_string(),
                ch,
            });
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(MicrosError::NoDigits {
                input: input.to_string(),
            });
        }
        if frac_part.len() > FRACTION_DIGITS {
            return Err(MicrosError::TooManyFractionalDigits {
                input: input.to_string(),
            });
        }

        let mut int_value: u64 = 0;
        for b in int_part.bytes() {
            int_value = int_value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .filter(|v| *v <= MAX_INTEGER_PART)
                .ok_or_else(|| MicrosError::OutOfRange {
                    input: input.to_string(),
                })?;
        }
        let mut frac_value: i64 = 0;
        for b in frac_part.bytes() {
            frac_value = frac_value * 10 + i64::from(b - b'0');
        }
        frac_value *= 10i64.pow((FRACTION_DIGITS - frac_part.len()) as u32);

        // MAX_INTEGER_PART keeps this inside i64.
        let raw = int_value as i64 * UNIT + frac_value;
        Ok(Self(if negative { -raw } else { raw }))
    }

    /// Format using a parsed [`FormatSpec`].
    #[must_use]
    pub fn format(self, spec: &FormatSpec) -> String {
        let mut value = i128::from(self.0);
        if spec.percent {
            value *= 100;
        }
        let unit = UNIT as u128;
        let mut abs = value.unsigned_abs();

        let fraction = match spec.decimals {
            Decimals::Fixed(places) => {
                let factor = 10u128.pow(FRACTION_DIGITS as u32 - u32::from(places));
                // Round half away from zero.
                abs = (abs + factor / 2) / factor * factor;
                let digits = format!("{:06}", abs % unit);
                digits[..usize::from(places)].to_string()
            }
            Decimals::Auto => {
                let frac = abs % unit;
                if frac == 0 {
                    String::new()
                } else if frac % 10_000 == 0 {
                    format!("{:02}", frac / 10_000)
                } else {
                    format!("{frac:06}").trim_end_matches('0').to_string()
                }
            }
        };

        let mut out = group_thousands(abs / unit, spec.thousands_separator);
        if !fraction.is_empty() {
            out.push('.');
            out.push_str(&fraction);
        }
        if spec.percent {
            out.push('%');
        }
        if value < 0 && abs != 0 {
            if spec.parenthesize_negative {
                out = format!("({out})");
            } else {
                out.insert(0, '-');
            }
        }
        out
    }

    /// Parse `spec` and format with it.
    pub fn format_with(self, spec: &str) -> Result<String, MicrosError> {
        Ok(self.format(&spec.parse()?))
    }
}

fn group_thousands(int_part: u128, separator: Option<char>) -> String {
    let digits = int_part.to_string();
    let Some(sep) = separator else {
        return digits;
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// How many fractional digits to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decimals {
    /// As few digits as needed: none for whole numbers, two when the
    /// remainder is a whole number of cents, otherwise up to six.
    #[default]
    Auto,
    /// Exactly this many digits (0-6), rounded half away from zero.
    Fixed(u8),
}

/// A parsed formatting specification for [`Micros::format`].
///
/// The mini-language is a sequence of flags in any order:
///
/// | Flag | Meaning |
/// |------|---------|
/// | `'` or `,` | group thousands with that character |
/// | `.N` | exactly `N` fractional digits (`0`-`6`); default is auto |
/// | `%` | multiply by 100 and append `%` |
/// | `()` | wrap negative numbers in parentheses instead of a leading `-` |
///
/// ```
/// use finledger_core::Micros;
///
/// let v = Micros::from_raw(-1_234_567_891);
/// assert_eq!(v.format_with(",.2").unwrap(), "-1,234.57");
/// assert_eq!(v.format_with("(').0").unwrap(), "(1'235)");
/// assert_eq!(Micros::from_raw(125_000).format_with(".1%").unwrap(), "12.5%");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatSpec {
    /// Thousands separator, if any.
    pub thousands_separator: Option<char>,
    /// Fractional digits.
    pub decimals: Decimals,
    /// Render as a percentage.
    pub percent: bool,
    /// Parenthesize negative numbers.
    pub parenthesize_negative: bool,
}

impl FromStr for FormatSpec {
    type Err = MicrosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| MicrosError::InvalidFormatSpec {
            spec: s.to_string(),
            reason,
        };
        let mut spec = Self::default();
        let mut chars = s.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\'' | ',' => {
                    if spec.thousands_separator.replace(ch).is_some() {
                        return Err(invalid("duplicate thousands separator".to_string()));
                    }
                }
                '.' => {
                    let places = chars
                        .next()
                        .and_then(|d| d.to_digit(10))
                        .filter(|d| *d as usize <= FRACTION_DIGITS)
                        .ok_or_else(|| invalid("'.' must be followed by a digit 0-6".to_string()))?;
                    spec.decimals = Decimals::Fixed(places as u8);
                }
                '%' => spec.percent = true,
                '(' | ')' => spec.parenthesize_negative = true,
                other => return Err(invalid(format!("unexpected character {other:?}"))),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&FormatSpec::default()))
    }
}

impl FromStr for Micros {
    type Err = MicrosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Micros> for Decimal {
    fn from(m: Micros) -> Self {
        m.to_decimal()
    }
}

impl Add for Micros {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        match self.checked_add(other) {
            Some(v) => v,
            None => panic!("Micros addition overflows: {self:?} + {other:?}"),
        }
    }
}

impl Sub for Micros {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        match self.checked_sub(other) {
            Some(v) => v,
            None => panic!("Micros subtraction overflows: {self:?} - {other:?}"),
        }
    }
}

impl Mul for Micros {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        match self.checked_mul(other) {
            Some(v) => v,
            None => panic!("Micros multiplication overflows: {self:?} * {other:?}"),
        }
    }
}

impl Div for Micros {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        match self.checked_div(other) {
            Some(v) => v,
            None => panic!("Micros division is not representable: {self:?} / {other:?}"),
        }
    }
}

impl Neg for Micros {
    type Output = Self;

    fn neg(self) -> Self {
        Self::ZERO - self
    }
}

impl AddAssign for Micros {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Micros {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Sum for Micros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Micros {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
