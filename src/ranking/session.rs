//! Per-session holder of the most recent ranking, used for follow-up export.
//!
//! A session keeps at most one ranking; recording a new one overwrites the
//! previous slot. Callers that serve several users keep one session each.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ranking::error::{RankingError, RankingResult};
use crate::ranking::export::export_view;
use crate::ranking::ids::RankingId;
use crate::ranking::preference::PreferenceSpec;
use crate::ranking::view::{View, export_file_name};

/// The last ranking shown in a session.
#[derive(Clone, Debug)]
pub struct LastRanking {
    /// Ranking identifier.
    pub id: RankingId,
    /// When the ranking completed.
    pub ranked_at: DateTime<Utc>,
    /// Ranked rows kept for export.
    pub view: View,
    /// Spec the ranking used.
    pub spec: PreferenceSpec,
    /// Rows shown to the user and exported.
    pub top_n: usize,
}

/// Single-slot ranking cache for one interactive session.
#[derive(Clone, Debug, Default)]
pub struct RankingSession {
    last: Option<LastRanking>,
}

impl RankingSession {
    /// Create an empty session.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Store a ranking, replacing any previous one.
    pub fn record(&mut self, view: View, spec: PreferenceSpec, top_n: usize) -> RankingId {
        let id = RankingId::new();
        if let Some(previous) = &self.last {
            debug!("Replacing ranking {} with {id}", previous.id);
        }
        self.last = Some(LastRanking {
            id,
            ranked_at: Utc::now(),
            view,
            spec,
            top_n,
        });
        id
    }

    /// The stored ranking, if any.
    #[must_use]
    pub const fn last(&self) -> Option<&LastRanking> {
        self.last.as_ref()
    }

    /// Drop the stored ranking.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Export the first `top_n` rows of the stored ranking into `dir` as
    /// `top{rows}_{slug}.csv`.
    ///
    /// # Errors
    /// Returns `NoRecentRanking` if nothing was recorded, or an I/O error if
    /// writing fails.
    pub async fn export_last(&self, dir: &Path, slug_max_len: usize) -> RankingResult<PathBuf> {
        let last = self.last.as_ref().ok_or(RankingError::NoRecentRanking)?;
        let view = last.view.head(last.top_n);
        let path = dir.join(export_file_name(&last.spec, view.len(), slug_max_len)?);
        export_view(&view, &path).await?;
        Ok(path)
    }
}
