use serde::{Deserialize, Serialize};

use crate::source::Cell;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricePolicy {
    /// Literal currency token removed wherever it occurs (e.g. `Rp`).
    pub currency_token: String,
    /// Thousands separator removed before parsing.
    pub thousands_separator: char,
    /// Treat a parsed zero as an empty price.
    pub zero_is_empty: bool,
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self {
            currency_token: "Rp".to_string(),
            thousands_separator: ',',
            zero_is_empty: true,
        }
    }
}

/// A normalized price: either a finite number or the explicit empty marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Price {
    Empty,
    Value(f64),
}

impl Price {
    pub fn value(self) -> Option<f64> {
        match self {
            Price::Value(v) => Some(v),
            Price::Empty => None,
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Price::Empty)
    }
}

pub fn is_empty(raw: &Cell, policy: &PricePolicy) -> bool {
    to_number(raw, policy).is_empty()
}

pub fn to_number(raw: &Cell, policy: &PricePolicy) -> Price {
    let parsed = match raw {
        Cell::Empty => return Price::Empty,
        Cell::Number(value) => *value,
        Cell::Text(text) => match parse_price_text(text, policy) {
            Some(value) => value,
            None => return Price::Empty,
        },
    };
    if !parsed.is_finite() || (policy.zero_is_empty && parsed == 0.0) {
        Price::Empty
    } else {
        Price::Value(parsed)
    }
}

fn parse_price_text(text: &str, policy: &PricePolicy) -> Option<f64> {
    let mut stripped: String = text
        .trim()
        .chars()
        .filter(|ch| *ch != policy.thousands_separator)
        .collect();
    if !policy.currency_token.is_empty() {
        stripped = stripped.replace(policy.currency_token.as_str(), "");
    }
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse::<f64>().ok()
}

/// Renders an amount the way prices are shown to people, e.g. `Rp 1,500`.
/// Fractions are rounded to whole currency units.
pub fn format_amount(value: f64, policy: &PricePolicy) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(policy.thousands_separator);
        }
        grouped.push(ch);
    }
    let sign = if negative { "-" } else { "" };
    if policy.currency_token.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{} {grouped}", policy.currency_token)
    }
}
