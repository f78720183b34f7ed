//! Price and availability signals from free-text snippets
//!
//! Extraction never guesses: a snippet with a price range, discount
//! phrasing, or more than one distinct amount yields no price.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use crate::record::Availability;

/// Outcome of reading a price out of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSignal {
    /// Exactly one single-value price
    Found(Decimal),
    /// No price mentioned
    Absent,
    /// Ranged, discount, or conflicting amounts
    Ambiguous,
}

impl PriceSignal {
    pub fn price(self) -> Option<Decimal> {
        match self {
            PriceSignal::Found(price) => Some(price),
            PriceSignal::Absent | PriceSignal::Ambiguous => None,
        }
    }
}

/// Phrases that mean the item cannot be bought right now
pub const OUT_OF_STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "sold out",
    "coming soon",
    "unavailable",
    "temporarily unavailable",
    "backordered",
];

const AMOUNT: &str = r"\$\s?(?P<whole>\d{1,3}(?:,\d{3})+|\d+)(?:\.(?P<cents>\d{1,2}))?";

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // second operand must itself read as a price, or be glued to the dash
        Regex::new(
            r"(?i)\$\s?\d[\d,]*(?:\.\d+)?(?:-\d|\s*(?:-|–|—|to)\s*(?:\$\s?\d|\d[\d,]*(?:\.\d+)?\s*(?:usd|dollars?)\b))",
        )
        .expect("valid range pattern")
    })
}

fn discount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:\bsave\b[^$]{0,12}\$|\$\s?\d[\d,]*(?:\.\d+)?\s*off\b|\bup\s+to\s+\$|\bunder\s+\$|\bless\s+than\s+\$)")
            .expect("valid discount pattern")
    })
}

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(AMOUNT).expect("valid amount pattern"))
}

fn currency_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // no start inside a longer number or right after a dollar sign
        Regex::new(
            r"(?i)(?:^|[^\d,.$])(?P<whole>\d{1,3}(?:,\d{3})+|\d+)(?:\.(?P<cents>\d{1,2}))?\s*(?:usd|dollars?)\b",
        )
        .expect("valid currency pattern")
    })
}

fn to_decimal(whole: &str, cents: Option<&str>) -> Option<Decimal> {
    let whole = whole.replace(',', "");
    let text = match cents {
        Some(cents) => format!("{}.{}", whole, cents),
        None => whole,
    };
    text.parse::<Decimal>().ok().map(|d| d.normalize())
}

/// Read a single price out of text
pub fn classify_price(text: &str) -> PriceSignal {
    if text.trim().is_empty() {
        return PriceSignal::Absent;
    }
    if range_pattern().is_match(text) || discount_pattern().is_match(text) {
        return PriceSignal::Ambiguous;
    }

    let mut amounts: Vec<Decimal> = Vec::new();
    for pattern in [amount_pattern(), currency_word_pattern()] {
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.name("whole") else { continue };
            if let Some(amount) = to_decimal(whole.as_str(), caps.name("cents").map(|m| m.as_str())) {
                if !amounts.contains(&amount) {
                    amounts.push(amount);
                }
            }
        }
    }

    match amounts.as_slice() {
        [] => PriceSignal::Absent,
        [single] => PriceSignal::Found(*single),
        _ => PriceSignal::Ambiguous,
    }
}

/// Convenience wrapper: the price, or None when absent or ambiguous
pub fn extract_price(text: &str) -> Option<Decimal> {
    classify_price(text).price()
}

/// Stock status from text; only an explicit negative phrase yields unavailable
pub fn detect_availability(text: &str) -> Availability {
    let lowered = text.to_lowercase();
    if OUT_OF_STOCK_PHRASES.iter().any(|p| lowered.contains(p)) {
        Availability::Unavailable
    } else {
        Availability::Available
    }
}
