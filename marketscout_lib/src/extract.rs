//! Turns one rendered listing page into raw candidate records.
//!
//! Two passes, in order: the marketplace's container selectors, and if those
//! match nothing, every anchor whose resolved URL looks like a product page.
//! Each candidate node is then mined for a title, a URL, and (from a few
//! ancestors up) a price fragment and a supplier name.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::marketplace::MarketplaceProfile;
use crate::product::{RawCandidate, MAX_SNIPPET_CHARS};

/// How many ancestors above the anchor make up a listing's context.
pub const CONTEXT_DEPTH: usize = 3;

const PRICE_PATTERN: &str =
    r"(?i)((?:₹|\bRs\.?|\bINR|\$|\bUS\$\s?)\s?[\d,]+(?:\.\d+)?(?:\s*-\s*[\d,]+(?:\.\d+)?)?)";

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector '{selector}' for marketplace {marketplace}: {reason}")]
    Selector {
        marketplace: String,
        selector: String,
        reason: String,
    },
}

/// Which pass produced the candidate nodes of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionPass {
    Structured,
    LinkFallback,
    Nothing,
}

/// Result of extracting one page.
#[derive(Debug)]
pub struct PageExtraction {
    pub candidates: Vec<RawCandidate>,
    /// True when at least one candidate survived field extraction. False
    /// means "end of results" and stops pagination.
    pub found_any: bool,
    pub pass: ExtractionPass,
}

/// Extraction engine compiled for one marketplace.
pub struct Extractor {
    profile: MarketplaceProfile,
    containers: Option<Selector>,
    anchors: Selector,
    supplier: Option<Selector>,
}

impl Extractor {
    pub fn new(profile: MarketplaceProfile) -> Result<Self, ExtractError> {
        let containers = compile_list(&profile.name, &profile.container_selectors)?;
        let supplier = compile_list(&profile.name, &profile.supplier_selectors)?;
        let anchors = compile(&profile.name, "a[href]")?;
        Ok(Self {
            profile,
            containers,
            anchors,
            supplier,
        })
    }

    pub fn profile(&self) -> &MarketplaceProfile {
        &self.profile
    }

    pub fn marketplace(&self) -> &str {
        &self.profile.name
    }

    /// Extracts candidates from `html`, resolving relative links against
    /// `page_url` and labelling every record with `category`.
    pub fn extract(&self, html: &str, page_url: &str, category: &str) -> PageExtraction {
        let document = Html::parse_document(html);

        let mut pass = ExtractionPass::Structured;
        let mut nodes: Vec<ElementRef> = match &self.containers {
            Some(sel) => document.select(sel).collect(),
            None => Vec::new(),
        };

        if nodes.is_empty() {
            pass = ExtractionPass::LinkFallback;
            nodes = document
                .select(&self.anchors)
                .filter(|a| {
                    let href = a.value().attr("href").unwrap_or("").trim();
                    !href.is_empty() && self.profile.is_product_link(&resolve_url(href, page_url))
                })
                .collect();
        }

        if nodes.is_empty() {
            tracing::debug!("{}: no candidate nodes on {}", self.profile.name, page_url);
            return PageExtraction {
                candidates: Vec::new(),
                found_any: false,
                pass: ExtractionPass::Nothing,
            };
        }

        let node_count = nodes.len();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut candidates = Vec::new();
        for node in nodes {
            let Some(candidate) = self.candidate_from_node(node, page_url, category) else {
                continue;
            };
            let key = (
                candidate.url.clone().unwrap_or_default(),
                candidate.title.to_lowercase(),
            );
            if !seen.insert(key) {
                continue;
            }
            candidates.push(candidate);
        }

        tracing::debug!(
            "{}: {:?} pass matched {} nodes, {} candidates on {}",
            self.profile.name,
            pass,
            node_count,
            candidates.len(),
            page_url
        );

        PageExtraction {
            found_any: !candidates.is_empty(),
            candidates,
            pass,
        }
    }

    fn candidate_from_node(
        &self,
        node: ElementRef<'_>,
        page_url: &str,
        category: &str,
    ) -> Option<RawCandidate> {
        let anchor = if node.value().name() == "a" {
            node
        } else {
            node.select(&self.anchors).next().unwrap_or(node)
        };

        let mut title = collapse_whitespace(&element_text(anchor));
        if title.is_empty() {
            title = anchor
                .value()
                .attr("title")
                .map(collapse_whitespace)
                .unwrap_or_default();
        }

        let href = anchor.value().attr("href").unwrap_or("").trim();
        let url = (!href.is_empty()).then(|| resolve_url(href, page_url));

        if title.is_empty() && url.is_none() {
            return None;
        }

        let context = context_node(anchor, CONTEXT_DEPTH);
        let context_text = element_text(context);

        let supplier_name = self
            .supplier
            .as_ref()
            .and_then(|sel| context.select(sel).next())
            .map(|el| collapse_whitespace(&element_text(el)))
            .filter(|s| !s.is_empty());

        Some(RawCandidate {
            marketplace: self.profile.name.clone(),
            category: category.to_string(),
            title,
            price: extract_price(&context_text),
            supplier_name,
            url,
            source_snippet: Some(bounded_html(context, MAX_SNIPPET_CHARS)),
            ..RawCandidate::default()
        })
    }
}

fn compile(marketplace: &str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        marketplace: marketplace.to_string(),
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn compile_list(marketplace: &str, selectors: &[String]) -> Result<Option<Selector>, ExtractError> {
    let parts: Vec<&str> = selectors
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return Ok(None);
    }
    compile(marketplace, &parts.join(", ")).map(Some)
}

/// Climbs at most `depth` element ancestors from `anchor`, stopping at the
/// document root.
fn context_node(anchor: ElementRef<'_>, depth: usize) -> ElementRef<'_> {
    let mut current = anchor;
    for _ in 0..depth {
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Text nodes of `el`, each trimmed, empty ones dropped, joined by a space.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Outer HTML of `el`, cut at `cap` characters. Serialization stops at the
/// cap, so a context that climbed to `<body>` costs no more than a card.
fn bounded_html(el: ElementRef<'_>, cap: usize) -> String {
    let mut writer = SnippetWriter {
        buf: String::new(),
        remaining: cap,
    };
    writer.element(el);
    writer.buf
}

struct SnippetWriter {
    buf: String,
    remaining: usize,
}

impl SnippetWriter {
    /// Returns false once the cap is reached.
    fn push(&mut self, text: &str) -> bool {
        for ch in text.chars() {
            if self.remaining == 0 {
                return false;
            }
            self.buf.push(ch);
            self.remaining -= 1;
        }
        self.remaining > 0
    }

    fn element(&mut self, el: ElementRef<'_>) -> bool {
        let value = el.value();
        let name = value.name();
        let mut open = format!("<{}", name);
        for (key, val) in value.attrs() {
            open.push_str(&format!(" {}=\"{}\"", key, escape(val, true)));
        }
        open.push('>');
        if !self.push(&open) {
            return false;
        }
        if VOID_ELEMENTS.contains(&name) {
            return true;
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
        for child in el.children() {
            let more = match ElementRef::wrap(child) {
                Some(child_el) => self.element(child_el),
                None => match child.value() {
                    Node::Text(text) if raw_text => self.push(text),
                    Node::Text(text) => self.push(&escape(text, false)),
                    Node::Comment(comment) => self.push(&format!("<!--{}-->", &**comment)),
                    _ => true,
                },
            };
            if !more {
                return false;
            }
        }
        self.push(&format!("</{}>", name))
    }
}

fn escape(text: &str, attr: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr => out.push_str("&quot;"),
            '<' if !attr => out.push_str("&lt;"),
            '>' if !attr => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Makes `href` absolute: `//host/path` becomes `https://host/path`, relative
/// paths are joined onto `page_url`, absolute URLs are returned untouched.
pub fn resolve_url(href: &str, page_url: &str) -> String {
    let href = href.trim();
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// First currency-marked number or range in `text`, e.g. `Rs. 500 - 700`.
pub fn extract_price(text: &str) -> Option<String> {
    price_regex()
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PRICE_PATTERN).expect("price pattern compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::PaginationStrategy;

    fn indiamart() -> Extractor {
        Extractor::new(MarketplaceProfile::indiamart()).unwrap()
    }

    fn alibaba() -> Extractor {
        Extractor::new(MarketplaceProfile::alibaba()).unwrap()
    }

    const CARD_PAGE: &str =
        r#"<div class="card"><a href="/offer/123">Blue Widget</a><span>Rs. 500 - 700</span></div>"#;

    // -- page-level behavior --

    #[test]
    fn card_scenario_structured_pass() {
        let out = indiamart().extract(CARD_PAGE, "https://example.com/cat", "widgets");
        assert!(out.found_any);
        assert_eq!(out.pass, ExtractionPass::Structured);
        assert_eq!(out.candidates.len(), 1);

        let c = &out.candidates[0];
        assert_eq!(c.title, "Blue Widget");
        assert_eq!(c.url.as_deref(), Some("https://example.com/offer/123"));
        assert!(c.price.as_deref().unwrap().contains("500 - 700"));
        assert_eq!(c.marketplace, "indiamart");
        assert_eq!(c.category, "widgets");
    }

    #[test]
    fn card_scenario_link_fallback() {
        let out = alibaba().extract(CARD_PAGE, "https://example.com/cat", "widgets");
        assert_eq!(out.pass, ExtractionPass::LinkFallback);
        assert_eq!(out.candidates.len(), 1);
        let c = &out.candidates[0];
        assert_eq!(c.title, "Blue Widget");
        assert_eq!(c.url.as_deref(), Some("https://example.com/offer/123"));
        assert_eq!(c.price.as_deref(), Some("Rs. 500 - 700"));
    }

    #[test]
    fn empty_page_signals_end_of_results() {
        let out = alibaba().extract(
            "<html><body><p>No results</p><a href=\"/about\">About</a></body></html>",
            "https://example.com/cat",
            "widgets",
        );
        assert!(!out.found_any);
        assert!(out.candidates.is_empty());
        assert_eq!(out.pass, ExtractionPass::Nothing);
    }

    #[test]
    fn matched_but_empty_containers_do_not_signal_more_data() {
        let html = r#"<div class="card"></div><div class="card">   </div>"#;
        let out = indiamart().extract(html, "https://example.com/cat", "widgets");
        assert_eq!(out.pass, ExtractionPass::Structured);
        assert!(!out.found_any);
        assert!(out.candidates.is_empty());
    }

    #[test]
    fn structured_pass_wins_over_stray_links() {
        let html = r#"
            <a href="/offer/999">Sidebar Offer</a>
            <li class="list-item"><a href="/product-detail/1.html">Gate Valve</a></li>
        "#;
        let out = alibaba().extract(html, "https://www.alibaba.com/catalog/valves_p1.html", "valves");
        assert_eq!(out.pass, ExtractionPass::Structured);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].title, "Gate Valve");
    }

    #[test]
    fn duplicate_anchors_collapse_within_a_page() {
        let html = r#"
            <a href="https://x.com/offer/1">Widget</a>
            <a href="https://x.com/offer/1">WIDGET</a>
            <a href="https://x.com/offer/2">Widget</a>
        "#;
        let out = alibaba().extract(html, "https://x.com/list", "widgets");
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.candidates[0].title, "Widget");
        assert_eq!(out.candidates[1].url.as_deref(), Some("https://x.com/offer/2"));
    }

    #[test]
    fn candidates_keep_document_order() {
        let html = r#"
            <div class="lst"><a href="/p/1">First</a></div>
            <div class="card"><a href="/p/2">Second</a></div>
            <div class="lst"><a href="/p/3">Third</a></div>
        "#;
        let out = indiamart().extract(html, "https://dir.indiamart.com/impcat/x.html", "x");
        let titles: Vec<&str> = out.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
    }

    // -- field extraction --

    #[test]
    fn title_falls_back_to_title_attribute() {
        let html = r#"<a href="/offer/9" title="  Red   Pump "><img src="x.png"></a>"#;
        let out = alibaba().extract(html, "https://example.com/", "pumps");
        assert_eq!(out.candidates[0].title, "Red Pump");
    }

    #[test]
    fn title_whitespace_is_collapsed() {
        let html = "<div class=\"card\"><a href=\"/p/1\">\n  Steel \t Pipe\n</a></div>";
        let out = indiamart().extract(html, "https://example.com/", "pipes");
        assert_eq!(out.candidates[0].title, "Steel Pipe");
    }

    #[test]
    fn protocol_relative_links_are_upgraded() {
        let html = r#"<a href="//www.alibaba.com/product-detail/valve_1.html">Valve</a>"#;
        let out = alibaba().extract(html, "http://www.alibaba.com/catalog", "valves");
        assert_eq!(
            out.candidates[0].url.as_deref(),
            Some("https://www.alibaba.com/product-detail/valve_1.html")
        );
    }

    #[test]
    fn card_without_link_uses_card_text() {
        let html = r#"<div class="card"><h2>Brass Fitting</h2></div>"#;
        let out = indiamart().extract(html, "https://example.com/", "fittings");
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].title, "Brass Fitting");
        assert!(out.candidates[0].url.is_none());
    }

    #[test]
    fn supplier_found_in_context() {
        let html = r#"
            <div class="card">
              <a href="/p/1">Pump</a>
              <div class="company-name"> Acme  Pumps Ltd </div>
            </div>
        "#;
        let out = indiamart().extract(html, "https://example.com/", "pumps");
        assert_eq!(out.candidates[0].supplier_name.as_deref(), Some("Acme Pumps Ltd"));
    }

    #[test]
    fn supplier_absent_is_none() {
        let out = indiamart().extract(CARD_PAGE, "https://example.com/cat", "widgets");
        assert!(out.candidates[0].supplier_name.is_none());
    }

    #[test]
    fn context_reaches_price_outside_anchor() {
        let html = r#"
            <li class="list-item">
              <div class="title"><h3><a href="/product-detail/7.html">Ball Valve</a></h3></div>
              <div class="price">US$ 12.50 - 18.00</div>
            </li>
        "#;
        let out = alibaba().extract(html, "https://www.alibaba.com/", "valves");
        assert_eq!(out.candidates[0].price.as_deref(), Some("US$ 12.50 - 18.00"));
    }

    #[test]
    fn snippet_is_bounded() {
        let filler = "x".repeat(5000);
        let html = format!(
            r#"<div class="card"><a href="/p/1">Long</a><p>{}</p></div>"#,
            filler
        );
        let out = indiamart().extract(&html, "https://example.com/", "long");
        let snippet = out.candidates[0].source_snippet.as_deref().unwrap();
        assert_eq!(snippet.chars().count(), crate::product::MAX_SNIPPET_CHARS);
    }

    #[test]
    fn bounded_html_matches_full_serialization_prefix() {
        let html = r#"<html><body><div class="card" data-x='a "q" &amp; b'>
            <a href="/p/1?x=1&amp;y=2">Valve &lt;DN50&gt;&nbsp;PN16</a><br>
            <img src="v.png" alt="valve"><!-- promo -->
            <script>if (a < b && c) {}</script><span>Rs. 500</span>
        </div></body></html>"#;
        let document = Html::parse_document(html);
        let card = document.select(&Selector::parse("div.card").unwrap()).next().unwrap();
        let full = card.html();
        assert_eq!(bounded_html(card, 10_000), full);
        for cap in [0, 1, 17, 60, 123] {
            let expected: String = full.chars().take(cap).collect();
            assert_eq!(bounded_html(card, cap), expected, "cap {cap}");
        }
    }

    #[test]
    fn fallback_snippet_from_large_page_is_bounded() {
        let filler = "<p>filler text</p>".repeat(2000);
        let html = format!(r#"<html><body>{}<a href="/offer/1">Pump</a></body></html>"#, filler);
        let out = alibaba().extract(&html, "https://example.com/", "pumps");
        assert_eq!(out.pass, ExtractionPass::LinkFallback);
        let snippet = out.candidates[0].source_snippet.as_deref().unwrap();
        assert!(snippet.starts_with("<html>"));
        assert_eq!(snippet.chars().count(), crate::product::MAX_SNIPPET_CHARS);
    }

    #[test]
    fn profile_without_containers_goes_straight_to_links() {
        let profile = MarketplaceProfile {
            name: "links-only".into(),
            container_selectors: vec![],
            link_tokens: vec!["/item/".into()],
            supplier_selectors: vec![],
            pagination: PaginationStrategy::QueryParam { param: "p".into() },
        };
        let ex = Extractor::new(profile).unwrap();
        let out = ex.extract(
            r#"<a href="/item/1">One</a><a href="/help">Help</a>"#,
            "https://shop.test/",
            "misc",
        );
        assert_eq!(out.pass, ExtractionPass::LinkFallback);
        assert_eq!(out.candidates.len(), 1);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let mut profile = MarketplaceProfile::alibaba();
        profile.container_selectors = vec!["div[".into()];
        let err = Extractor::new(profile).err().unwrap();
        assert!(matches!(err, ExtractError::Selector { .. }));
    }

    // -- helpers --

    #[test]
    fn resolve_url_variants() {
        let page = "https://example.com/cat/list?page=2";
        assert_eq!(resolve_url("/offer/1", page), "https://example.com/offer/1");
        assert_eq!(resolve_url("item/5", page), "https://example.com/cat/item/5");
        assert_eq!(resolve_url("//cdn.example.com/a", page), "https://cdn.example.com/a");
        assert_eq!(
            resolve_url("http://Other.com/X?a=1", page),
            "http://Other.com/X?a=1"
        );
    }

    #[test]
    fn resolve_url_with_unparseable_base_returns_href() {
        assert_eq!(resolve_url("/offer/1", "not a url"), "/offer/1");
    }

    #[test]
    fn price_patterns() {
        assert_eq!(extract_price("Price: ₹ 1,250 / Piece").as_deref(), Some("₹ 1,250"));
        assert_eq!(extract_price("INR 99.50").as_deref(), Some("INR 99.50"));
        assert_eq!(extract_price("from $5 - $9").as_deref(), Some("$5"));
        assert_eq!(extract_price("rs.300-450 per kg").as_deref(), Some("rs.300-450"));
        assert_eq!(extract_price("Get latest price"), None);
        assert_eq!(extract_price(""), None);
    }

    #[test]
    fn price_first_match_wins() {
        assert_eq!(
            extract_price("MRP Rs. 900 now Rs. 700").as_deref(),
            Some("Rs. 900")
        );
    }

    #[test]
    fn currency_letters_inside_words_are_not_markers() {
        assert_eq!(extract_price("Induction Motors 5 HP"), None);
        assert_eq!(extract_price("Steel Bars 12 mm"), None);
        assert_eq!(extract_price("Spur Gears 20 teeth Rs. 450").as_deref(), Some("Rs. 450"));
        assert_eq!(extract_price("SKINR 40"), None);
    }

    #[test]
    fn title_ending_in_rs_does_not_shadow_card_price() {
        let html = r#"<div class="card"><a href="/p/1">Induction Motors 5 HP</a><span>Rs. 18,500</span></div>"#;
        let out = indiamart().extract(html, "https://dir.indiamart.com/impcat/motors.html", "motors");
        let raw = out.candidates.into_iter().next().unwrap();
        assert_eq!(raw.price.as_deref(), Some("Rs. 18,500"));

        let product = crate::validation::normalize(raw).unwrap();
        assert_eq!(product.price_min, Some(18500.0));
        assert_eq!(product.price_max, Some(18500.0));
        assert_eq!(product.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn collapse_whitespace_trims_and_joins() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
