//! Run orchestrator: walks the category registry, collects and normalizes
//! each category, then dedupes and persists the combined dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use marketscout_fetch::RenderProvider;
use serde::Serialize;

use crate::collector::{Collector, Pacer};
use crate::config::{CategoryRegistry, ScoutConfig};
use crate::error::MarketScoutError;
use crate::extract::Extractor;
use crate::marketplace::resolve_profiles;
use crate::product::CanonicalProduct;
use crate::storage::{dedupe, write_outputs, OutputPaths, RawHtmlStore};
use crate::validation::{normalize_all, Rejection};

/// What one (marketplace, category) pair contributed to a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryOutcome {
    pub marketplace: String,
    pub category: String,
    pub raw_count: usize,
    pub accepted_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub categories: Vec<CategoryOutcome>,
    pub rejections: Vec<Rejection>,
    /// Registry entries with no matching descriptor.
    pub skipped_marketplaces: Vec<String>,
    /// Records written after dedupe.
    pub total_written: usize,
    pub outputs: OutputPaths,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn total_raw(&self) -> usize {
        self.categories.iter().map(|c| c.raw_count).sum()
    }

    pub fn total_accepted(&self) -> usize {
        self.categories.iter().map(|c| c.accepted_count).sum()
    }
}

pub struct Pipeline<'a> {
    config: &'a ScoutConfig,
    renderer: &'a dyn RenderProvider,
    pacer: &'a dyn Pacer,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a ScoutConfig,
        renderer: &'a dyn RenderProvider,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            config,
            renderer,
            pacer,
        }
    }

    /// Collects every category in registry order and writes the outputs.
    ///
    /// A failing category never stops the run; only invalid settings,
    /// persistence errors and descriptors whose selectors do not compile are
    /// returned as errors.
    /// `on_category` is called once per finished category.
    pub async fn run<F>(
        &self,
        registry: &CategoryRegistry,
        mut on_category: F,
    ) -> Result<RunReport, MarketScoutError>
    where
        F: FnMut(&CategoryOutcome),
    {
        let started_at = Utc::now();
        self.config.validate()?;
        let timeout = self.config.timeout()?;
        let extractors = self.extractors()?;
        let raw_store = RawHtmlStore::new(&self.config.raw_dir);

        let mut products: Vec<CanonicalProduct> = Vec::new();
        let mut categories = Vec::with_capacity(registry.category_count());
        let mut rejections = Vec::new();
        let mut skipped_marketplaces = Vec::new();

        for entry in &registry.marketplaces {
            let Some(extractor) = extractors.get(&entry.marketplace) else {
                tracing::warn!("unknown marketplace '{}', skipping", entry.marketplace);
                skipped_marketplaces.push(entry.marketplace.clone());
                continue;
            };

            let collector = Collector::new(extractor, self.renderer, self.pacer)
                .with_delay(self.config.delay())
                .with_timeout(timeout)
                .with_raw_store(&raw_store);

            for seed in &entry.categories {
                tracing::info!("collecting {} / {}", entry.marketplace, seed.label);
                let raw = collector
                    .collect(
                        &seed.label,
                        &seed.url,
                        self.config.limit_per_category,
                        self.config.save_raw_html,
                    )
                    .await
                    .map_err(|e| {
                        tracing::error!("failed to archive raw HTML: {}", e);
                        e
                    })?;
                let raw_count = raw.len();
                let (accepted, rejected) = normalize_all(raw);

                let outcome = CategoryOutcome {
                    marketplace: entry.marketplace.clone(),
                    category: seed.label.clone(),
                    raw_count,
                    accepted_count: accepted.len(),
                };
                on_category(&outcome);
                categories.push(outcome);
                products.extend(accepted);
                rejections.extend(rejected);
            }
        }

        let before = products.len();
        let products = dedupe(products);
        tracing::info!(
            "dedupe kept {} of {} records",
            products.len(),
            before
        );

        let outputs = write_outputs(
            &products,
            &self.config.output_dir,
            &self.config.output_basename,
        )
        .map_err(|e| {
            tracing::error!("failed to write outputs: {}", e);
            e
        })?;
        tracing::info!(
            "wrote {} records to {} and {}",
            products.len(),
            outputs.jsonl.display(),
            outputs.csv.display()
        );

        Ok(RunReport {
            categories,
            rejections,
            skipped_marketplaces,
            total_written: products.len(),
            outputs,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn extractors(&self) -> Result<BTreeMap<String, Extractor>, MarketScoutError> {
        let mut extractors = BTreeMap::new();
        for (name, profile) in resolve_profiles(&self.config.marketplaces) {
            extractors.insert(name, Extractor::new(profile)?);
        }
        Ok(extractors)
    }
}
