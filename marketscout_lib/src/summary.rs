//! Descriptive statistics over a persisted product dataset.

use std::collections::HashMap;

use serde::Serialize;

use crate::product::CanonicalProduct;

/// Label used for products with no supplier name.
pub const UNKNOWN_SUPPLIER: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub by_marketplace: Vec<CountRow>,
    pub by_category: Vec<CountRow>,
    pub top_suppliers: Vec<CountRow>,
    /// `None` when no product has a `price_min`.
    pub price_min: Option<PriceStats>,
}

/// Summarizes `items`, keeping the `top` most frequent suppliers.
pub fn summarize(items: &[CanonicalProduct], top: usize) -> DatasetSummary {
    let by_marketplace = count_by(items.iter().map(|p| p.marketplace.as_str()));
    let by_category = count_by(items.iter().map(|p| p.category.as_str()));

    let mut top_suppliers = count_by(items.iter().map(|p| {
        p.supplier_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SUPPLIER)
    }));
    top_suppliers.truncate(top);

    DatasetSummary {
        total: items.len(),
        by_marketplace,
        by_category,
        top_suppliers,
        price_min: price_stats(items.iter().filter_map(|p| p.price_min)),
    }
}

/// Most frequent first; ties broken by name.
fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountRow> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(name, count)| CountRow {
            name: name.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows
}

fn price_stats(values: impl Iterator<Item = f64>) -> Option<PriceStats> {
    let values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(PriceStats {
        count: values.len(),
        min,
        max,
        mean,
    })
}
