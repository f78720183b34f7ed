//! Intent classification
//!
//! Production deployments plug an LLM-backed classifier in behind
//! `IntentClassifier`. `KeywordClassifier` is the deterministic default:
//! - Intent detection from phrase patterns
//! - Budget / minimum price extraction ("under $30", "over $20")
//! - Category detection against the planner's synonym table
//! - Live-data detection ("current price", "in stock", "now")

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::intent::{Constraints, Intent};
use crate::planner::canonical_category;

/// Classifier output
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub constraints: Constraints,
    /// The question asks for real-time data
    pub need_live_price: bool,
}

/// `classify(text) -> Intent` capability
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}

/// Heuristic classifier driven by fixed phrase lists
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

const COMPARE_PHRASES: &[&str] = &["vs", "versus", "compare", "difference between", "better than"];
const PRICE_PHRASES: &[&str] = &["price", "prices", "cost", "costs", "how much", "cheapest", "deal", "deals"];
const STOCK_PHRASES: &[&str] = &["in stock", "available", "availability", "sold out", "where can i buy"];
const SEARCH_PHRASES: &[&str] = &["recommend", "suggest", "find", "looking for", "best", "show me", "need a", "want a"];
const LIVE_PHRASES: &[&str] = &["current price", "latest price", "right now", "now", "today", "in stock", "available now"];

/// Lower-cased words joined by single spaces, padded at both ends
fn word_text(query: &str) -> String {
    let words: Vec<&str> = query.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    format!(" {} ", words.join(" "))
}

/// Whole-word phrase match against `word_text` output
fn has_phrase(words: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| words.contains(&format!(" {} ", p)))
}

fn max_price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:under|below|less than|at most|up to|max(?:imum)?|budget(?: of)?)\s+\$?\s?(\d+(?:\.\d{1,2})?)")
            .expect("valid max price pattern")
    })
}

fn min_price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:over|above|more than|at least)\s+\$?\s?(\d+(?:\.\d{1,2})?)")
            .expect("valid min price pattern")
    })
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn detect_intent(&self, words: &str) -> Intent {
        if has_phrase(words, COMPARE_PHRASES) {
            return Intent::Compare;
        }
        if has_phrase(words, STOCK_PHRASES) {
            return Intent::CheckAvailability;
        }
        if has_phrase(words, PRICE_PHRASES) {
            return Intent::CheckPrice;
        }
        if has_phrase(words, SEARCH_PHRASES) {
            return Intent::Search;
        }
        Intent::Unknown
    }

    fn extract_constraints(&self, query: &str) -> Constraints {
        let capture_price = |pattern: &Regex| -> Option<Decimal> {
            pattern
                .captures(query)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        };

        Constraints {
            budget: None,
            max_price: capture_price(max_price_pattern()),
            min_price: capture_price(min_price_pattern()),
            category: self.detect_category(query),
            brand: None,
        }
    }

    /// First bigram or word that names a known category
    fn detect_category(&self, query: &str) -> Option<String> {
        let words: Vec<&str> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            if canonical_category(&bigram).is_some() {
                return Some(bigram);
            }
        }
        words
            .iter()
            .find(|w| canonical_category(w).is_some())
            .map(|w| w.to_string())
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let query = text.trim().to_lowercase();
        let words = word_text(&query);

        Classification {
            intent: self.detect_intent(&words),
            constraints: self.extract_constraints(&query),
            need_live_price: has_phrase(&words, LIVE_PHRASES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Classification {
        KeywordClassifier::new().classify(text)
    }

    #[test]
    fn test_price_intent_with_budget() {
        let result = classify("What's the current price of Catan under $50?");
        assert_eq!(result.intent, Intent::CheckPrice);
        assert_eq!(result.constraints.max_price, Some(Decimal::from(50)));
        assert!(result.need_live_price);
    }

    #[test]
    fn test_availability_intent() {
        let result = classify("Is the Xbox controller in stock?");
        assert_eq!(result.intent, Intent::CheckAvailability);
        assert_eq!(result.constraints.category.as_deref(), Some("controller"));
    }

    #[test]
    fn test_compare_intent() {
        let result = classify("Catan vs Ticket to Ride");
        assert_eq!(result.intent, Intent::Compare);
    }

    #[test]
    fn test_search_intent_with_category_bigram() {
        let result = classify("Recommend a board game for four players over $20");
        assert_eq!(result.intent, Intent::Search);
        assert_eq!(result.constraints.category.as_deref(), Some("board game"));
        assert_eq!(result.constraints.min_price, Some(Decimal::from(20)));
        assert!(!result.need_live_price);
    }

    #[test]
    fn test_phrases_match_whole_words() {
        assert_eq!(classify("Find an ideal board game").intent, Intent::Search);
        assert_eq!(classify("a costume for finding nemo").intent, Intent::Unknown);
        assert_eq!(classify("How much does the pirate costume cost?").intent, Intent::CheckPrice);
        assert!(!classify("snow globe kits").need_live_price);
    }

    #[test]
    fn test_unknown_intent() {
        assert_eq!(classify("hello there").intent, Intent::Unknown);
    }
}
