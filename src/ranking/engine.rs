//! Ranking entry point: load → resolve → score → project → export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::llm::OllamaPreferenceOracle;
use crate::ranking::config::RankerConfig;
use crate::ranking::error::{RankingError, RankingResult};
use crate::ranking::export::export_view;
use crate::ranking::preference::PreferenceSpec;
use crate::ranking::resolver::{PreferenceOracle, PreferenceResolver};
use crate::ranking::scorer::{ScoringOptions, score_and_rank};
use crate::ranking::session::RankingSession;
use crate::ranking::table::{CompanyTable, load_companies};
use crate::ranking::view::{View, project};

/// Ranks companies against natural-language preferences.
#[derive(Clone)]
pub struct Ranker {
    config: RankerConfig,
    resolver: PreferenceResolver,
}

impl Ranker {
    /// Create a ranker over an arbitrary oracle.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(config: RankerConfig, oracle: Arc<dyn PreferenceOracle>) -> RankingResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: PreferenceResolver::new(oracle),
        })
    }

    /// Create a ranker backed by the configured Ollama model.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid or the client cannot
    /// be built.
    pub fn with_ollama(config: RankerConfig) -> RankingResult<Self> {
        let oracle = OllamaPreferenceOracle::new(&config.oracle)?;
        Self::new(config, Arc::new(oracle))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank the table at `table_source` for `request_text`.
    ///
    /// Returns the first `top_n` rows and the resolved spec with weights
    /// normalized. When `export_destination` is given the returned view is
    /// written there after ranking succeeds.
    ///
    /// # Errors
    /// Fails fast with the first error from loading, resolution, scoring or
    /// export; nothing is written on failure.
    pub async fn rank(
        &self,
        table_source: &Path,
        request_text: &str,
        top_n: usize,
        sector_neutral: bool,
        export_destination: Option<&Path>,
    ) -> RankingResult<(View, PreferenceSpec)> {
        if top_n == 0 {
            return Err(RankingError::InvalidRequest("top_n must be >= 1".to_string()));
        }

        let table = load_companies(table_source).await?;
        let spec = self
            .resolver
            .resolve(request_text, &table.numeric_attributes())
            .await?
            .normalized();
        let view = rank_with_spec(&table, &spec, top_n, sector_neutral)?;

        if let Some(destination) = export_destination {
            export_view(&view, destination).await?;
        }

        info!(
            "Ranked {} companies for {:?}, returning {} rows",
            table.len(),
            request_text,
            view.len()
        );
        Ok((view, spec))
    }

    /// Rank the configured company table and remember the result in
    /// `session` for a later export.
    ///
    /// Keeps `fetch_top_n` rows so a larger export can be offered, and
    /// returns the `top_n` rows to display.
    ///
    /// # Errors
    /// Same as [`Ranker::rank`].
    pub async fn rank_into_session(
        &self,
        session: &mut RankingSession,
        request_text: &str,
        top_n: Option<usize>,
        sector_neutral: Option<bool>,
    ) -> RankingResult<(View, PreferenceSpec)> {
        let output = &self.config.output;
        let top_n = top_n.unwrap_or(output.top_n);
        let fetch = output.fetch_top_n.max(top_n);

        let (view, spec) = self
            .rank(
                &self.config.data.companies_csv,
                request_text,
                fetch,
                sector_neutral.unwrap_or(output.sector_neutral),
                None,
            )
            .await?;

        session.record(view.clone(), spec.clone(), top_n);
        Ok((view.head(top_n), spec))
    }

    /// Export the session's last ranking into the configured directory.
    ///
    /// # Errors
    /// Returns `NoRecentRanking` if the session is empty.
    pub async fn export_session(&self, session: &RankingSession) -> RankingResult<PathBuf> {
        session
            .export_last(&self.config.data.export_dir, self.config.output.slug_max_len)
            .await
    }
}

/// Score, rank and project a table under a fixed spec; no oracle involved.
///
/// # Errors
/// Returns `EmptySpec` for an empty spec and `InvalidRequest` for a zero
/// `top_n`.
pub fn rank_with_spec(
    table: &CompanyTable,
    spec: &PreferenceSpec,
    top_n: usize,
    sector_neutral: bool,
) -> RankingResult<View> {
    let ranked = score_and_rank(table, spec, &ScoringOptions::sector_neutral(sector_neutral))?;
    project(&ranked, top_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::export::read_records;
    use crate::ranking::preference::Direction;
    use crate::ranking::resolver::tests::CannedOracle;
    use crate::ranking::table::Cell;
    use crate::ranking::table::tests::table;

    const COMPANIES: &str = "ticker,name,sector,beta,env_risk,market_cap\n\
        aaa,Alpha,Tech,2.0,10,900\n\
        bbb,Bravo,Utilities,0.5,40,100\n\
        ccc,Charlie,Tech,1.0,5,400\n\
        ddd,Delta,Utilities,1.5,20,250\n";

    const LOW_BETA: &str = r#"Here you go: {"preferences": {"beta": {"weight": 2, "direction": "negative"}}}"#;

    async fn write_companies() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ranker-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("companies.csv");
        tokio::fs::write(&path, COMPANIES).await.unwrap();
        path
    }

    fn ranker(answer: Option<&str>, csv: &Path) -> Ranker {
        let config = RankerConfig::new()
            .with_companies_csv(csv)
            .with_export_dir(csv.with_file_name("exports"))
            .with_top_n(2);
        Ranker::new(config, Arc::new(CannedOracle::new(answer))).unwrap()
    }

    fn tickers(view: &View) -> Vec<String> {
        view.column("ticker")
            .unwrap()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_rank_with_spec_scenario() {
        let t = table(
            &["ticker", "name", "beta", "env_risk"],
            &[&["AAA", "Alpha", "1.5", "10"], &["BBB", "Bravo", "0.5", "40"]],
        );
        let spec = PreferenceSpec::from_pairs([("beta", 1.0, Direction::Negative)]);
        let view = rank_with_spec(&t, &spec, 2, false).unwrap();

        assert_eq!(tickers(&view), vec!["BBB", "AAA"]);
        assert_eq!(view.column("rank").unwrap(), vec![&Cell::Int(1), &Cell::Int(2)]);
        assert_eq!(
            view.column("score_total").unwrap(),
            vec![&Cell::Float(1.0), &Cell::Float(0.0)]
        );
    }

    #[tokio::test]
    async fn test_rank_end_to_end_with_export() {
        let csv = write_companies().await;
        let out = csv.with_file_name("out").join("ranked.csv");

        let (view, spec) = ranker(Some(LOW_BETA), &csv)
            .rank(&csv, "low volatility", 3, false, Some(&out))
            .await
            .unwrap();

        assert_eq!(spec.get("beta").unwrap().weight, 1.0);
        assert_eq!(tickers(&view), vec!["BBB", "CCC", "DDD"]);

        let (headers, rows) = read_records(&out).await.unwrap();
        assert_eq!(headers, view.headers);
        assert_eq!(rows, view.records());

        let _ = tokio::fs::remove_dir_all(csv.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_rank_sector_neutral() {
        let csv = write_companies().await;
        let (view, _) = ranker(Some(LOW_BETA), &csv)
            .rank(&csv, "low volatility vs peers", 4, true, None)
            .await
            .unwrap();

        // Within each sector the lower beta wins; both winners tie at the top.
        assert_eq!(tickers(&view), vec!["BBB", "CCC", "AAA", "DDD"]);
        assert_eq!(
            view.column("rank").unwrap(),
            vec![&Cell::Int(1), &Cell::Int(1), &Cell::Int(3), &Cell::Int(3)]
        );

        let _ = tokio::fs::remove_dir_all(csv.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_rank_fails_fast_and_writes_nothing() {
        let csv = write_companies().await;
        let out = csv.with_file_name("never.csv");

        let err = ranker(Some(r#"{"preferences": {"vibes": {"weight": 1}}}"#), &csv)
            .rank(&csv, "good vibes", 3, false, Some(&out))
            .await
            .unwrap_err();
        assert!(matches!(err, RankingError::EmptySpec(_)));
        assert!(!out.exists());

        let err = ranker(Some(LOW_BETA), &csv)
            .rank(&csv, "low volatility", 0, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidRequest(_)));

        let _ = tokio::fs::remove_dir_all(csv.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_session_flow() {
        let csv = write_companies().await;
        let ranker = ranker(Some(LOW_BETA), &csv);
        let mut session = RankingSession::new();

        let (shown, _) = ranker
            .rank_into_session(&mut session, "low volatility", None, Some(false))
            .await
            .unwrap();
        assert_eq!(tickers(&shown), vec!["BBB", "CCC"]);
        assert_eq!(session.last().unwrap().view.len(), 4);

        let path = ranker.export_session(&session).await.unwrap();
        assert!(path.ends_with("top2_beta-neg.csv"));
        let (_, rows) = read_records(&path).await.unwrap();
        assert_eq!(rows, shown.records());

        let _ = tokio::fs::remove_dir_all(csv.parent().unwrap()).await;
    }
}
