//! Configuration for the ranking engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ranking::error::{RankingError, RankingResult};

/// Environment variable overriding the Ollama base URL.
pub const OLLAMA_URL_ENV: &str = "EQUITY_RANKER_OLLAMA_URL";
/// Environment variable overriding the completion model.
pub const MODEL_ENV: &str = "EQUITY_RANKER_MODEL";
/// Environment variable overriding the company table path.
pub const COMPANIES_CSV_ENV: &str = "EQUITY_RANKER_COMPANIES_CSV";
/// Environment variable overriding the export directory.
pub const EXPORT_DIR_ENV: &str = "EQUITY_RANKER_EXPORT_DIR";
/// Environment variable overriding the displayed row count.
pub const TOP_N_ENV: &str = "EQUITY_RANKER_TOP_N";

/// Top-level configuration for the ranker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Preference oracle settings.
    pub oracle: OracleConfig,
    /// Input and export locations.
    pub data: DataConfig,
    /// Output bounds and defaults.
    pub output: OutputConfig,
}

impl RankerConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the `EQUITY_RANKER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(OLLAMA_URL_ENV) {
            config.oracle.base_url = Some(url);
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            config.oracle.model = model;
        }
        if let Ok(path) = std::env::var(COMPANIES_CSV_ENV) {
            config.data.companies_csv = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var(EXPORT_DIR_ENV) {
            config.data.export_dir = PathBuf::from(dir);
        }
        if let Some(top_n) = std::env::var(TOP_N_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.output.top_n = top_n;
        }
        config
    }

    /// Set the completion model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.oracle.model = model.into();
        self
    }

    /// Set the Ollama base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.oracle.base_url = Some(base_url.into());
        self
    }

    /// Set the company table path.
    #[must_use]
    pub fn with_companies_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.data.companies_csv = path.into();
        self
    }

    /// Set the export directory.
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data.export_dir = dir.into();
        self
    }

    /// Set the number of rows shown and exported.
    #[must_use]
    pub const fn with_top_n(mut self, top_n: usize) -> Self {
        self.output.top_n = top_n;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> RankingResult<()> {
        if self.oracle.model.trim().is_empty() {
            return Err(RankingError::Configuration(
                "oracle.model must not be empty".to_string(),
            ));
        }

        if !self.oracle.temperature.is_finite() {
            return Err(RankingError::Configuration(
                "oracle.temperature must be finite".to_string(),
            ));
        }

        if self.output.top_n == 0 {
            return Err(RankingError::Configuration(
                "output.top_n must be > 0".to_string(),
            ));
        }

        if self.output.fetch_top_n == 0 {
            return Err(RankingError::Configuration(
                "output.fetch_top_n must be > 0".to_string(),
            ));
        }

        if self.output.slug_max_len == 0 {
            return Err(RankingError::Configuration(
                "output.slug_max_len must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.oracle.base_url {
            Url::parse(base_url).map_err(|e| {
                RankingError::Configuration(format!("oracle.base_url {base_url:?}: {e}"))
            })?;
        }

        Ok(())
    }
}

/// Completion model settings for the preference oracle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Ollama completion model name.
    pub model: String,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// Temperature for generation.
    pub temperature: f64,
    /// Optional max tokens.
    pub max_tokens: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "ministral-3:8b-instruct-2512-q8_0".to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: Some(512),
        }
    }
}

/// Input table and export locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    /// Company table (CSV with a header row).
    pub companies_csv: PathBuf,
    /// Directory that receives exported views.
    pub export_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            companies_csv: PathBuf::from("data/sp500_companies.csv"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

/// Output bounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Rows shown to the user and offered for export.
    pub top_n: usize,
    /// Rows kept from a ranking so a larger export can be offered later.
    pub fetch_top_n: usize,
    /// Whether rankings compare companies against sector peers by default.
    pub sector_neutral: bool,
    /// Maximum length of the criteria slug in export file names.
    pub slug_max_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            top_n: 15,
            fetch_top_n: 100,
            sector_neutral: true,
            slug_max_len: 80,
        }
    }
}
