//! Normalization of raw candidates into canonical products.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::product::{bound_snippet, CanonicalProduct, RawCandidate};

const RANGE_PATTERN: &str = r"(?i)(₹|\bRs\.?|\bINR|\bUS\$|\$)?\s*([\d,]*\d(?:\.\d+)?)(?:\s*-\s*(?:₹|\bRs\.?|\bINR|\bUS\$|\$)?\s*([\d,]*\d(?:\.\d+)?))?";

/// Why a raw candidate could not become a canonical product.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title is empty")]
    EmptyTitle,
    #[error("marketplace is empty")]
    EmptyMarketplace,
    #[error("category is empty")]
    EmptyCategory,
}

/// A dropped record, kept so the caller can report it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub marketplace: String,
    pub category: String,
    pub title: String,
    pub reason: String,
}

/// Numeric reading of a free-text price fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub currency: Option<String>,
}

/// Validates `raw` and converts it into a [`CanonicalProduct`].
///
/// Numeric price bounds supplied by the raw record win; otherwise the free
/// text price is parsed. Normalizing an already-canonical record is a no-op.
pub fn normalize(raw: RawCandidate) -> Result<CanonicalProduct, ValidationError> {
    if raw.marketplace.trim().is_empty() {
        return Err(ValidationError::EmptyMarketplace);
    }
    if raw.category.trim().is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    let title = clean_title(&raw.title);
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let (price_min, price_max, parsed_currency) = if raw.price_min.is_some() || raw.price_max.is_some() {
        (raw.price_min, raw.price_max, None)
    } else {
        match raw.price.as_deref().and_then(parse_price_range) {
            Some(range) => (Some(range.min), Some(range.max), range.currency),
            None => (None, None, None),
        }
    };

    let currency = raw
        .currency
        .as_deref()
        .and_then(normalize_currency)
        .or(parsed_currency);

    Ok(CanonicalProduct {
        marketplace: raw.marketplace,
        category: raw.category,
        title,
        price_min,
        price_max,
        currency,
        unit: raw.unit,
        supplier_name: raw.supplier_name,
        supplier_location: raw.supplier_location,
        url: raw.url,
        source_html_snippet: raw.source_snippet.map(|s| bound_snippet(&s)),
    })
}

/// Normalizes every record, dropping (and logging) the ones that fail.
/// Order of the survivors is preserved.
pub fn normalize_all(raws: Vec<RawCandidate>) -> (Vec<CanonicalProduct>, Vec<Rejection>) {
    let mut products = Vec::with_capacity(raws.len());
    let mut rejections = Vec::new();
    for raw in raws {
        let marketplace = raw.marketplace.clone();
        let category = raw.category.clone();
        let title = raw.title.clone();
        match normalize(raw) {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::warn!(
                    marketplace = %marketplace,
                    category = %category,
                    reason = %e,
                    "record skipped"
                );
                rejections.push(Rejection {
                    marketplace,
                    category,
                    title,
                    reason: e.to_string(),
                });
            }
        }
    }
    (products, rejections)
}

/// Collapses whitespace runs to single spaces and trims.
pub fn clean_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercases and trims a currency code; `RS` and `RS.` become `INR`.
/// Anything else passes through. Blank input yields `None`.
pub fn normalize_currency(currency: &str) -> Option<String> {
    let upper = currency.trim().to_uppercase();
    match upper.as_str() {
        "" => None,
        "RS" | "RS." => Some("INR".to_string()),
        _ => Some(upper),
    }
}

/// Parses a fragment like `Rs. 500 - 700`, `US$ 12.50` or `₹1,250` into a
/// numeric range. A single number gives `min == max`.
pub fn parse_price_range(text: &str) -> Option<PriceRange> {
    let cap = range_regex().captures(text)?;
    let first = parse_number(cap.get(2)?.as_str())?;
    let second = match cap.get(3) {
        Some(m) => parse_number(m.as_str())?,
        None => first,
    };
    let currency = cap.get(1).and_then(|m| currency_from_marker(m.as_str()));
    Some(PriceRange {
        min: first.min(second),
        max: first.max(second),
        currency,
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn currency_from_marker(marker: &str) -> Option<String> {
    let upper = marker.trim().to_uppercase();
    let code = match upper.as_str() {
        "₹" | "RS" | "RS." | "INR" => "INR",
        "$" | "US$" => "USD",
        _ => return None,
    };
    Some(code.to_string())
}

fn range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RANGE_PATTERN).expect("price range pattern compiles"))
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
