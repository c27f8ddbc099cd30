//! Application state shared across all request handlers.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::ranking::{Ranker, RankerConfig, RankingError, RankingResult, RankingSession, SessionId};

/// Environment variable bounding the number of remembered sessions.
pub const MAX_SESSIONS_ENV: &str = "EQUITY_RANKER_MAX_SESSIONS";

/// Sessions remembered when [`MAX_SESSIONS_ENV`] is unset.
pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// Shared application state.
pub struct AppState {
    /// Ranking pipeline backed by the configured oracle.
    pub ranker: Ranker,
    /// Last ranking per client session; least recently used sessions are
    /// evicted once full.
    sessions: Mutex<LruCache<SessionId, RankingSession>>,
    max_sessions: NonZeroUsize,
}

impl AppState {
    /// Create state from the environment-derived configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the Ollama client
    /// cannot be created.
    pub fn new() -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let ranker = Ranker::with_ollama(RankerConfig::from_env())
            .map_err(|e| format!("Failed to create ranker: {e}"))?;
        let max_sessions = std::env::var(MAX_SESSIONS_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        Self::with_ranker(ranker, max_sessions).map_err(Into::into)
    }

    /// Create state around an existing ranker.
    ///
    /// # Errors
    /// Returns `Configuration` if `max_sessions` is zero.
    pub fn with_ranker(ranker: Ranker, max_sessions: usize) -> RankingResult<Arc<Self>> {
        let capacity = NonZeroUsize::new(max_sessions).ok_or_else(|| {
            RankingError::Configuration("max_sessions must be > 0".to_string())
        })?;
        Ok(Arc::new(Self {
            ranker,
            sessions: Mutex::new(LruCache::new(capacity)),
            max_sessions: capacity,
        }))
    }

    /// Copy of a session's state, empty if unknown or evicted.
    pub async fn session(&self, id: &SessionId) -> RankingSession {
        self.sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Store a session, evicting the least recently used one when full.
    pub async fn store_session(&self, id: SessionId, session: RankingSession) {
        let evicted = self.sessions.lock().await.push(id, session);
        if let Some((evicted, _)) = evicted.filter(|(key, _)| *key != id) {
            tracing::debug!("Evicted session {evicted}");
        }
    }

    /// Number of remembered sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Upper bound on remembered sessions.
    #[must_use]
    pub const fn session_capacity(&self) -> usize {
        self.max_sessions.get()
    }
}
