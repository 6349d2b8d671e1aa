//! Library layer for MarketScout: marketplace descriptors, the extraction
//! engine, pagination, normalization, dedupe and persistence.
//!
//! Pages are fetched through the `marketscout_fetch` crate's
//! [`RenderProvider`] seam, so every stage above it can run against fakes.

pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod marketplace;
pub mod pipeline;
pub mod product;
pub mod storage;
pub mod summary;
pub mod validation;

pub use marketscout_fetch;
pub use marketscout_fetch::{Client, FetchConfig, RenderProvider};

pub use collector::{Collector, DelayRange, Pacer, TokioPacer, PAGE_CEILING};
pub use config::{CategoryRegistry, CategorySeed, ConfigError, ScoutConfig};
pub use error::MarketScoutError;
pub use extract::{ExtractError, ExtractionPass, Extractor, PageExtraction};
pub use marketplace::{resolve_profiles, MarketplaceProfile, PaginationStrategy};
pub use pipeline::{CategoryOutcome, Pipeline, RunReport};
pub use product::{CanonicalProduct, RawCandidate};
pub use storage::{dedupe, OutputPaths, RawHtmlStore, StorageError};
pub use summary::{summarize, DatasetSummary};
pub use validation::{normalize, normalize_all, Rejection, ValidationError};
