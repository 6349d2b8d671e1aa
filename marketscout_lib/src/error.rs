//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::extract::ExtractError;
use crate::storage::StorageError;

/// Errors that abort a collection run. Per-page fetch failures and
/// per-record validation failures are recovered inside the run and never
/// surface here.
#[derive(Debug)]
pub enum MarketScoutError {
    /// A fetch failed outside of a pagination loop.
    Fetch(marketscout_fetch::Error),
    /// A marketplace descriptor carried a selector that does not compile.
    Extract(ExtractError),
    /// Output or raw-archive files could not be written or read.
    Storage(StorageError),
    /// Config or category registry could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for MarketScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "Fetch error: {}", e),
            Self::Extract(e) => write!(f, "Extraction setup error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for MarketScoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Extract(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<marketscout_fetch::Error> for MarketScoutError {
    fn from(e: marketscout_fetch::Error) -> Self {
        Self::Fetch(e)
    }
}

impl From<ExtractError> for MarketScoutError {
    fn from(e: ExtractError) -> Self {
        Self::Extract(e)
    }
}

impl From<StorageError> for MarketScoutError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for MarketScoutError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
