use std::fmt;

use serde::{Deserialize, Serialize};

/// An equity symbol, exchange suffix included (`SAP.DE`, `BRK-B`).
///
/// Identity is the exact string. Use [`Ticker::parse`] for anything that
/// comes from outside the process: it rejects the blanks and placeholders a
/// scraped table tends to contain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Option<Self> {
        let symbol = raw.trim();

        if symbol.is_empty() || symbol.chars().any(char::is_whitespace) {
            return None;
        }
        if !symbol.chars().any(char::is_alphanumeric) {
            return None;
        }
        if symbol.eq_ignore_ascii_case("nan") {
            return None;
        }

        Some(Self(symbol.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_keeps_exact_case() {
        let ticker = Ticker::parse("  SAP.DE ").unwrap();
        assert_eq!(ticker.as_str(), "SAP.DE");
        assert_ne!(Ticker::parse("sap.de"), Some(ticker));
    }

    #[test]
    fn parse_rejects_degenerate_cells() {
        for raw in ["", "   ", "-", "..", "nan", "NaN", "BRK B"] {
            assert!(Ticker::parse(raw).is_none(), "{raw:?} should be rejected");
        }
    }
}
