//! The two record shapes that flow through a collection run.

use serde::{Deserialize, Serialize};

/// Upper bound on `source_html_snippet`, in characters.
pub const MAX_SNIPPET_CHARS: usize = 1200;

/// An untyped listing as scraped from one page, before validation.
///
/// The legacy numeric price fields are carried so that records produced by
/// other tools (or re-fed canonical records) survive normalization intact.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub marketplace: String,
    pub category: String,
    pub title: String,
    /// Free-text price fragment as found on the page, e.g. `Rs. 500 - 700`.
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub supplier_location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_snippet: Option<String>,
}

/// A validated, schema-conformant product.
///
/// Field order here is the column order of the CSV output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub marketplace: String,
    pub category: String,
    pub title: String,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: Option<String>,
    pub unit: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_location: Option<String>,
    pub url: Option<String>,
    pub source_html_snippet: Option<String>,
}

impl CanonicalProduct {
    /// Column names in declaration order.
    pub const FIELD_NAMES: [&'static str; 11] = [
        "marketplace",
        "category",
        "title",
        "price_min",
        "price_max",
        "currency",
        "unit",
        "supplier_name",
        "supplier_location",
        "url",
        "source_html_snippet",
    ];

    /// Identity used for dedupe: exact URL (empty if absent) and lowercased title.
    pub fn dedupe_key(&self) -> (String, String) {
        (
            self.url.clone().unwrap_or_default(),
            self.title.to_lowercase(),
        )
    }
}

impl From<CanonicalProduct> for RawCandidate {
    fn from(p: CanonicalProduct) -> Self {
        Self {
            marketplace: p.marketplace,
            category: p.category,
            title: p.title,
            price: None,
            price_min: p.price_min,
            price_max: p.price_max,
            currency: p.currency,
            unit: p.unit,
            supplier_name: p.supplier_name,
            supplier_location: p.supplier_location,
            url: p.url,
            source_snippet: p.source_html_snippet,
        }
    }
}

/// Truncates `text` to at most [`MAX_SNIPPET_CHARS`] characters.
pub fn bound_snippet(text: &str) -> String {
    text.chars().take(MAX_SNIPPET_CHARS).collect()
}
