//! Classified intent and user constraints
//!
//! These are the inputs the planner consumes. Classification itself is an
//! external capability; see `classifier` for the built-in heuristic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shopping intent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Intent {
    /// Product suggestions / recommendations
    Search,
    /// Current price inquiries
    CheckPrice,
    /// Stock status
    CheckAvailability,
    /// Comparing items
    Compare,
    #[default]
    Unknown,
}

impl Intent {
    /// Parse a loosely formatted intent label ("check price", "Check_Price")
    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");

        match normalized.as_str() {
            "search" => Intent::Search,
            "check_price" => Intent::CheckPrice,
            "check_availability" => Intent::CheckAvailability,
            "compare" => Intent::Compare,
            _ => Intent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "search",
            Intent::CheckPrice => "check_price",
            Intent::CheckAvailability => "check_availability",
            Intent::Compare => "compare",
            Intent::Unknown => "unknown",
        }
    }
}

impl From<String> for Intent {
    fn from(raw: String) -> Self {
        Intent::parse(&raw)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints extracted from the question
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    /// Spending limit; treated like max_price
    pub budget: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    /// Free-text category as the user phrased it
    pub category: Option<String>,
    pub brand: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_normalization() {
        assert_eq!(Intent::parse("check price"), Intent::CheckPrice);
        assert_eq!(Intent::parse(" Check_Availability "), Intent::CheckAvailability);
        assert_eq!(Intent::parse("compare"), Intent::Compare);
        assert_eq!(Intent::parse("haggle"), Intent::Unknown);
    }

    #[test]
    fn test_intent_deserializes_loosely() {
        let intent: Intent = serde_json::from_str("\"Check Price\"").unwrap();
        assert_eq!(intent, Intent::CheckPrice);
        assert_eq!(serde_json::to_string(&Intent::CheckPrice).unwrap(), "\"check_price\"");
    }
}
