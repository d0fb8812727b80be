use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

/// An exchange trading pair such as `BTCUSDT`.
///
/// Always non-empty and made of ASCII upper-case letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    /// Strict constructor: the input must already be upper-case.
    pub fn new(value: impl Into<String>) -> Result<Self, MonitorError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if valid {
            Ok(Self(value))
        } else {
            Err(MonitorError::InvalidSymbol(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lenient parse for user input: trims and upper-cases before validating.
impl FromStr for Symbol {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim().to_uppercase())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_upper_case_pairs() {
        assert_eq!(Symbol::new("BTCUSDT").unwrap().as_str(), "BTCUSDT");
        assert_eq!(Symbol::new("1INCHUSDT").unwrap().as_str(), "1INCHUSDT");
    }

    #[test]
    fn strict_constructor_rejects_lower_case_and_empty() {
        assert!(matches!(
            Symbol::new("btcusdt"),
            Err(MonitorError::InvalidSymbol(_))
        ));
        assert!(Symbol::new("").is_err());
        assert!(Symbol::new("BTC-USDT").is_err());
        assert!(Symbol::new("BTC USDT").is_err());
    }

    #[test]
    fn from_str_normalizes_user_input() {
        let symbol: Symbol = " ethusdt ".parse().unwrap();
        assert_eq!(symbol.to_string(), "ETHUSDT");
        assert!("".parse::<Symbol>().is_err());
    }
}
