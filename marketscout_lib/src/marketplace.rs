//! Per-marketplace capability descriptors.
//!
//! Every marketplace is handled by the same extraction engine and pagination
//! loop; what differs is captured here as data: which containers hold a
//! listing, which link shapes look like product pages, where the supplier
//! name lives, and how page N of a category is addressed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How the URL of page N is derived from a category's seed URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// Replace `{prefix}1` in the seed URL with `{prefix}{page}`. When the
    /// seed has no such token, append `fallback_param={page}` instead.
    PathToken {
        prefix: String,
        fallback_param: String,
    },
    /// Append `param={page}` to the query string.
    QueryParam { param: String },
}

impl PaginationStrategy {
    /// URL of `page` (1-based) for the category seeded at `category_url`.
    pub fn page_url(&self, category_url: &str, page: u32) -> String {
        match self {
            Self::PathToken {
                prefix,
                fallback_param,
            } => {
                let token = format!("{}1", prefix);
                if category_url.contains(&token) {
                    category_url.replace(&token, &format!("{}{}", prefix, page))
                } else {
                    append_query(category_url, fallback_param, page)
                }
            }
            Self::QueryParam { param } => append_query(category_url, param, page),
        }
    }
}

fn append_query(url: &str, param: &str, page: u32) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, sep, param, page)
}

/// Selector and URL vocabulary for one marketplace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceProfile {
    /// Identifier written to every record, e.g. `alibaba`.
    #[serde(default)]
    pub name: String,
    /// CSS selectors for listing cards, tried together as one selector list.
    pub container_selectors: Vec<String>,
    /// Case-insensitive substrings that mark an absolute URL as a product page.
    pub link_tokens: Vec<String>,
    /// CSS selectors for the supplier/company name inside a card.
    #[serde(default)]
    pub supplier_selectors: Vec<String>,
    pub pagination: PaginationStrategy,
}

impl MarketplaceProfile {
    pub fn alibaba() -> Self {
        Self {
            name: "alibaba".into(),
            container_selectors: strings(&[
                "div.list-no-v2-outter",
                "div.J-offer-wrapper",
                "li.list-item",
            ]),
            link_tokens: strings(&[
                "product-detail",
                "offer",
                "/product/",
                "alibaba.com/product",
            ]),
            supplier_selectors: strings(&[
                "[class*='supplier']",
                "[class*='company']",
                ".organic-gallery-title__seller",
                ".company-name",
            ]),
            pagination: PaginationStrategy::PathToken {
                prefix: "_p".into(),
                fallback_param: "page".into(),
            },
        }
    }

    pub fn indiamart() -> Self {
        Self {
            name: "indiamart".into(),
            container_selectors: strings(&["div.card", "div.rhs-crd", "div.lst", "li.cls-listitem"]),
            link_tokens: strings(&[
                "indiamart.com",
                "/product",
                "/detail",
                "product-detail",
                "offer",
                "/catalog",
            ]),
            supplier_selectors: strings(&[
                "[class*='supplier']",
                "[class*='comp']",
                "[class*='company']",
                ".supName",
                ".cmpny",
            ]),
            pagination: PaginationStrategy::QueryParam { param: "pg".into() },
        }
    }

    /// Whether `absolute_url` looks like a product page on this marketplace.
    pub fn is_product_link(&self, absolute_url: &str) -> bool {
        if absolute_url.is_empty() {
            return false;
        }
        let lower = absolute_url.to_lowercase();
        self.link_tokens
            .iter()
            .any(|t| lower.contains(&t.to_lowercase()))
    }

    pub fn page_url(&self, category_url: &str, page: u32) -> String {
        self.pagination.page_url(category_url, page)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in descriptors plus any configured overrides, keyed by name.
pub fn builtin_profiles() -> BTreeMap<String, MarketplaceProfile> {
    [MarketplaceProfile::alibaba(), MarketplaceProfile::indiamart()]
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect()
}

/// Merges user-defined descriptors over the built-ins. A configured profile
/// with the same name replaces the built-in one entirely.
pub fn resolve_profiles(
    overrides: &BTreeMap<String, MarketplaceProfile>,
) -> BTreeMap<String, MarketplaceProfile> {
    let mut profiles = builtin_profiles();
    for (name, profile) in overrides {
        let mut profile = profile.clone();
        profile.name = name.clone();
        profiles.insert(name.clone(), profile);
    }
    profiles
}
