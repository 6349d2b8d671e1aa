//! Run configuration and the category registry, both loaded from YAML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::collector::DelayRange;
use crate::marketplace::MarketplaceProfile;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Options recognized in `config.yaml`. Every field has a default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub limit_per_category: usize,
    pub delay_min: f64,
    pub delay_max: f64,
    pub timeout_seconds: f64,
    pub max_retries: usize,
    pub save_raw_html: bool,
    pub output_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub output_basename: String,
    /// Extra or replacement marketplace descriptors, keyed by name.
    pub marketplaces: BTreeMap<String, MarketplaceProfile>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            limit_per_category: 100,
            delay_min: 1.0,
            delay_max: 2.0,
            timeout_seconds: 15.0,
            max_retries: 3,
            save_raw_html: false,
            output_dir: PathBuf::from("data/processed"),
            raw_dir: PathBuf::from("data/raw"),
            output_basename: "products".to_string(),
            marketplaces: BTreeMap::new(),
        }
    }
}

impl ScoutConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        Self::from_yaml(&text)
    }

    /// Parses and validates YAML. Empty input yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ScoutConfig = if yaml.trim().is_empty() {
            ScoutConfig::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let delay_min = seconds("delay_min", self.delay_min)?;
        let delay_max = seconds("delay_max", self.delay_max)?;
        if delay_max < delay_min {
            return Err(ConfigError::Invalid(format!(
                "delay_max ({}) must be >= delay_min ({})",
                self.delay_max, self.delay_min
            )));
        }
        if seconds("timeout_seconds", self.timeout_seconds)?.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "timeout_seconds must be > 0, got {}",
                self.timeout_seconds
            )));
        }
        if self.output_basename.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "output_basename must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delay(&self) -> DelayRange {
        DelayRange::from_secs(self.delay_min, self.delay_max)
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        seconds("timeout_seconds", self.timeout_seconds)
    }
}

/// NaN, negative and out-of-range values are rejected.
fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        ConfigError::Invalid(format!(
            "{} must be a number of seconds >= 0, got {}: {}",
            field, value, e
        ))
    })
}

/// One seed URL to collect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySeed {
    pub label: String,
    pub url: String,
}

/// Categories of one marketplace, in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketplaceCategories {
    pub marketplace: String,
    pub categories: Vec<CategorySeed>,
}

/// `categories.yaml`: marketplace -> (category label -> seed URL).
///
/// File order is kept for both levels, so runs visit categories in the
/// order they were written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    pub marketplaces: Vec<MarketplaceCategories>,
}

impl CategoryRegistry {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let root: serde_yml::Value = serde_yml::from_str(yaml)?;
        let top = match root {
            serde_yml::Value::Null => return Ok(Self::default()),
            serde_yml::Value::Mapping(m) => m,
            _ => {
                return Err(ConfigError::Invalid(
                    "categories file must map marketplace names to categories".to_string(),
                ))
            }
        };

        let mut marketplaces = Vec::with_capacity(top.len());
        for (name, cats) in top {
            let marketplace = scalar(&name).ok_or_else(|| {
                ConfigError::Invalid("marketplace names must be strings".to_string())
            })?;
            let categories = match cats {
                serde_yml::Value::Null => Vec::new(),
                serde_yml::Value::Mapping(m) => {
                    let mut seeds = Vec::with_capacity(m.len());
                    for (label, url) in m {
                        let label = scalar(&label).ok_or_else(|| {
                            ConfigError::Invalid(format!(
                                "category labels under '{}' must be strings",
                                marketplace
                            ))
                        })?;
                        let url = scalar(&url).ok_or_else(|| {
                            ConfigError::Invalid(format!(
                                "seed URL for '{}' / '{}' must be a string",
                                marketplace, label
                            ))
                        })?;
                        seeds.push(CategorySeed { label, url });
                    }
                    seeds
                }
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "'{}' must map category labels to seed URLs",
                        marketplace
                    )))
                }
            };
            marketplaces.push(MarketplaceCategories {
                marketplace,
                categories,
            });
        }
        Ok(Self { marketplaces })
    }

    pub fn category_count(&self) -> usize {
        self.marketplaces.iter().map(|m| m.categories.len()).sum()
    }
}

fn scalar(value: &serde_yml::Value) -> Option<String> {
    match value {
        serde_yml::Value::String(s) => Some(s.clone()),
        serde_yml::Value::Number(n) => Some(n.to_string()),
        serde_yml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
