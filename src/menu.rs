//! Menu and money.
//!
//! Prices are held as integer cents so tax and totals never drift; the
//! decimal text form (`"15.99"`) is only used at the config and bill edges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::types::{Error, Result};

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    /// `self * bp / 10_000`, rounded half-up to the cent.
    pub fn apply_rate_bp(self, bp: u32) -> Money {
        let scaled = u128::from(self.0) * u128::from(bp);
        let rounded = (scaled + 5_000) / 10_000;
        Money(u64::try_from(rounded).unwrap_or(u64::MAX))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().trim_start_matches('$');
        let invalid = || Error::validation(format!("invalid amount: {s:?}"));

        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Money)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Money {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

/// One dish and its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: Money,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Read-only price table, loaded once from configuration.
#[derive(Debug, Clone)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Price of the dish whose name matches the order text exactly.
    pub fn price(&self, name: &str) -> Result<Money> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.price)
            .ok_or_else(|| Error::UnknownMenuItem(name.to_string()))
    }

    /// Item at `index`, wrapping around the menu length.
    pub fn pick(&self, index: usize) -> Option<&MenuItem> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(index % self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Config;

    #[test]
    fn test_money_parse_and_display() {
        assert_eq!("15.99".parse::<Money>().unwrap(), Money::from_cents(1599));
        assert_eq!("$4.5".parse::<Money>().unwrap(), Money::from_cents(450));
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_cents(1200));
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(4967).to_string(), "49.67");

        assert!("".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("-3.00".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
    }

    #[test]
    fn test_rate_rounds_half_up() {
        // 15.99 * 8% = 1.2792
        assert_eq!(Money::from_cents(1599).apply_rate_bp(800), Money::from_cents(128));
        // 0.25 * 10% = 0.025
        assert_eq!(Money::from_cents(25).apply_rate_bp(1000), Money::from_cents(3));
        assert_eq!(Money::ZERO.apply_rate_bp(800), Money::ZERO);
    }

    #[test]
    fn test_money_serde_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(2599)).unwrap();
        assert_eq!(json, "\"25.99\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_cents(2599));
        assert!(serde_json::from_str::<Money>("\"1.999\"").is_err());
    }

    #[test]
    fn test_menu_lookup() {
        let menu = Menu::new(Config::default().menu);
        assert_eq!(menu.price("Steak and wine").unwrap(), Money::from_cents(4599));

        let err = menu.price("Lobster").unwrap_err();
        assert!(matches!(err, Error::UnknownMenuItem(ref name) if name == "Lobster"));

        assert_eq!(menu.pick(0).unwrap().name, "Pizza and soda");
        assert_eq!(menu.pick(menu.len()).unwrap().name, "Pizza and soda");
        assert!(Menu::new(Vec::new()).pick(0).is_none());
    }
}
