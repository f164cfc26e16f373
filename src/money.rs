//! Monetary value types.
//!
//! Amounts are exact decimals, never floats. A [`Money`] value binds an
//! amount to a [`Currency`]; arithmetic across currencies is a hard error
//! rather than a silent coercion.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Error from currency-safe arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
}

/// A currency identified by its 3-letter code, with a fixed display scale.
///
/// Equality is by code alone; the scale only affects formatting.
#[derive(Debug, Clone, Copy)]
pub struct Currency {
    code: [u8; 3],
    decimal_places: u32,
}

impl Currency {
    pub const USD: Currency = Currency::new(*b"USD", 2);
    pub const EUR: Currency = Currency::new(*b"EUR", 2);
    pub const GBP: Currency = Currency::new(*b"GBP", 2);
    pub const JPY: Currency = Currency::new(*b"JPY", 0);

    pub const fn new(code: [u8; 3], decimal_places: u32) -> Self {
        Currency {
            code,
            decimal_places,
        }
    }

    pub fn code(&self) -> &str {
        // Codes come from the ASCII constants above or from `new`.
        std::str::from_utf8(&self.code).unwrap_or("???")
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Currency {}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An immutable amount + currency pair.
///
/// Every computation produces a new value; nothing mutates in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Money::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Add two amounts of the same currency.
    pub fn checked_add(self, rhs: Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(rhs)?;
        Ok(Money::new(self.amount + rhs.amount, self.currency))
    }

    /// Subtract an amount of the same currency.
    pub fn checked_sub(self, rhs: Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(rhs)?;
        Ok(Money::new(self.amount - rhs.amount, self.currency))
    }

    fn ensure_same_currency(self, rhs: Money) -> Result<(), MoneyError> {
        if self.currency != rhs.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: rhs.currency,
            });
        }
        Ok(())
    }
}

/// Ordering is only defined within one currency; comparing across
/// currencies yields `None`.
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.currency != other.currency {
            return None;
        }
        self.amount.partial_cmp(&other.amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$} {}",
            self.amount,
            self.currency,
            prec = self.currency.decimal_places as usize
        )
    }
}
