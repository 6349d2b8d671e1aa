//! Pagination controller: walks a category page by page until results run
//! out, the limit is reached, or the page ceiling is hit.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use marketscout_fetch::RenderProvider;
use rand::Rng;

use crate::extract::Extractor;
use crate::product::RawCandidate;
use crate::storage::{RawHtmlStore, StorageError};

/// Hard bound on pages fetched per category.
pub const PAGE_CEILING: u32 = 50;

/// Inclusive interval the inter-page delay is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Negative, non-finite or out-of-range seconds are treated as zero.
    pub fn from_secs(min: f64, max: f64) -> Self {
        Self::new(secs(min), secs(max))
    }

    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Suspends the collector between pages.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Drives one marketplace's extractor across the pages of a category.
pub struct Collector<'a> {
    extractor: &'a Extractor,
    renderer: &'a dyn RenderProvider,
    pacer: &'a dyn Pacer,
    delay: DelayRange,
    timeout: Duration,
    page_ceiling: u32,
    raw_store: Option<&'a RawHtmlStore>,
}

impl<'a> Collector<'a> {
    pub fn new(
        extractor: &'a Extractor,
        renderer: &'a dyn RenderProvider,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            extractor,
            renderer,
            pacer,
            delay: DelayRange::from_secs(1.0, 2.0),
            timeout: Duration::from_secs(15),
            page_ceiling: PAGE_CEILING,
            raw_store: None,
        }
    }

    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_ceiling(mut self, page_ceiling: u32) -> Self {
        self.page_ceiling = page_ceiling;
        self
    }

    pub fn with_raw_store(mut self, store: &'a RawHtmlStore) -> Self {
        self.raw_store = Some(store);
        self
    }

    /// Collects at most `limit` candidates for `category`.
    ///
    /// Fetch failures and empty pages end this category early and keep what
    /// was gathered so far. Only a failure to archive raw HTML is an error.
    pub async fn collect(
        &self,
        category: &str,
        category_url: &str,
        limit: usize,
        persist_raw: bool,
    ) -> Result<Vec<RawCandidate>, StorageError> {
        let marketplace = self.extractor.marketplace();
        let mut out: Vec<RawCandidate> = Vec::new();
        let mut accepted: HashSet<(String, String)> = HashSet::new();
        let mut page: u32 = 1;

        if persist_raw && self.raw_store.is_none() {
            tracing::warn!("{}: raw HTML archiving requested but no store configured", marketplace);
        }

        while out.len() < limit && page <= self.page_ceiling {
            let page_url = self.extractor.profile().page_url(category_url, page);
            tracing::info!("{} page {}: {}", marketplace, page, page_url);

            let html = match self.renderer.fetch_rendered(&page_url, self.timeout).await {
                Ok(html) if !html.trim().is_empty() => html,
                Ok(_) => {
                    tracing::warn!("{} page {} came back empty, stopping '{}'", marketplace, page, category);
                    break;
                }
                Err(e) => {
                    tracing::warn!("{} page {} failed: {}, stopping '{}'", marketplace, page, e, category);
                    break;
                }
            };

            if persist_raw {
                if let Some(store) = self.raw_store {
                    let path = store.save(marketplace, category, page, &html)?;
                    tracing::debug!("saved raw page to {}", path.display());
                }
            }

            let extraction = self.extractor.extract(&html, &page_url, category);
            if !extraction.found_any {
                tracing::info!("no product candidates found on page {}, stopping", page);
                break;
            }

            let mut fresh = 0usize;
            for candidate in extraction.candidates {
                if out.len() >= limit {
                    break;
                }
                let key = (
                    candidate.url.clone().unwrap_or_default(),
                    candidate.title.to_lowercase(),
                );
                if !accepted.insert(key) {
                    continue;
                }
                fresh += 1;
                out.push(candidate);
            }

            if fresh == 0 {
                tracing::info!("page {} only repeated earlier results, stopping", page);
                break;
            }

            page += 1;
            let delay = self.delay.sample(&mut rand::thread_rng());
            self.pacer.pause(delay).await;
        }

        tracing::info!(
            "{} extracted {} items for category '{}'",
            marketplace,
            out.len(),
            category
        );
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use marketscout_fetch::Error as FetchError;

    type Responder = Box<dyn Fn(&str) -> Result<String, FetchError> + Send + Sync>;

    /// Renderer that answers from a closure and records every URL asked for.
    pub struct FakeRenderer {
        respond: Responder,
        pub fetched: Mutex<Vec<String>>,
    }

    impl FakeRenderer {
        pub fn new(respond: impl Fn(&str) -> Result<String, FetchError> + Send + Sync + 'static) -> Self {
            Self {
                respond: Box::new(respond),
                fetched: Mutex::new(Vec::new()),
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RenderProvider for FakeRenderer {
        async fn fetch_rendered(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
            self.fetched.lock().unwrap().push(url.to_string());
            (self.respond)(url)
        }
    }

    /// Fake clock: records requested delays instead of sleeping.
    #[derive(Default)]
    pub struct RecordingPacer {
        pub delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    /// A page of `n` product cards whose URLs are unique to `url`.
    pub fn cards_page(url: &str, n: usize) -> String {
        let tag = url.rsplit('=').next().unwrap_or("0");
        let cards: String = (0..n)
            .map(|i| {
                format!(
                    r#"<div class="card"><a href="/p/{tag}-{i}">Item {tag}-{i}</a><span>Rs. {i}00</span></div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }
}
