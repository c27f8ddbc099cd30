//! Error types for the ranking pipeline.

use thiserror::Error;

/// Errors that can abort a ranking request.
#[derive(Debug, Error)]
pub enum RankingError {
    /// The company table is missing a required column.
    #[error("schema error: {0}")]
    Schema(String),

    /// The preference oracle is unreachable or misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No usable preference survived sanitization.
    #[error("no usable preferences: {0}")]
    EmptySpec(String),

    /// The oracle answered with something that is not a preference object.
    #[error("malformed oracle response: {0}")]
    MalformedOracleResponse(String),

    /// The caller passed an out-of-range argument.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Export was asked for before any ranking was recorded.
    #[error("no recent ranking to export")]
    NoRecentRanking,

    /// CSV read or write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv_async::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Regex error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl RankingError {
    /// Build the empty-spec error with a hint for the user.
    #[must_use]
    pub fn empty_spec() -> Self {
        Self::EmptySpec(
            "the request did not map to any known attribute; try naming what you care about \
             (e.g. low beta, low environmental risk, large market cap)"
                .to_string(),
        )
    }

    /// Whether the error stems from the caller's input rather than the service.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Schema(_) | Self::EmptySpec(_) | Self::InvalidRequest(_) | Self::NoRecentRanking
        )
    }
}

/// Convenience result alias for ranking operations.
pub type RankingResult<T> = Result<T, RankingError>;
