//! HTTP route handlers for the ranking API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::ranking::{PreferenceSpec, RankingError, SessionId, View, render_markdown};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rank", post(rank))
        .route("/api/export", post(export))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "equity-ranker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ranking request.
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    /// Free-text investment preference.
    pub request: String,
    /// Rows to return; defaults to the configured `top_n`.
    pub top_n: Option<usize>,
    /// Z-score attributes within sectors before normalizing.
    pub sector_neutral: Option<bool>,
    /// Session to record the ranking into; a new one is opened if absent.
    pub session_id: Option<SessionId>,
}

/// Ranking response.
#[derive(Debug, Serialize)]
pub struct RankResponse {
    /// Session holding this ranking for a later export.
    pub session_id: SessionId,
    /// Ranked rows.
    pub view: View,
    /// Resolved preferences with normalized weights.
    pub spec: PreferenceSpec,
    /// Human-readable rendering of the summary columns.
    pub markdown: String,
}

/// Export request.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Session whose last ranking is exported.
    pub session_id: SessionId,
}

/// Export response.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// Where the CSV was written.
    pub path: String,
}

/// Map a ranking failure onto an HTTP status.
fn error_response(err: &RankingError) -> (StatusCode, String) {
    let status = match err {
        RankingError::NoRecentRanking => StatusCode::NOT_FOUND,
        e if e.is_user_facing() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Ranking failed: {err}");
    }
    (status, err.to_string())
}

/// Resolve, rank and remember the result for the session.
async fn rank(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, (StatusCode, String)> {
    let session_id = request.session_id.unwrap_or_default();
    let mut session = state.session(&session_id).await;

    let (view, spec) = state
        .ranker
        .rank_into_session(
            &mut session,
            &request.request,
            request.top_n,
            request.sector_neutral,
        )
        .await
        .map_err(|e| error_response(&e))?;

    state.store_session(session_id, session).await;
    let markdown = render_markdown(&view, &spec);

    Ok(Json(RankResponse {
        session_id,
        view,
        spec,
        markdown,
    }))
}

/// Write the session's last ranking to the export directory.
async fn export(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, (StatusCode, String)> {
    let session = state.session(&request.session_id).await;
    let path = state
        .ranker
        .export_session(&session)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(ExportResponse {
        path: path.display().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::ranking::resolver::tests::CannedOracle;
    use crate::ranking::{Ranker, RankerConfig};

    const COMPANIES: &str = "ticker,name,sector,beta\n\
        AAA,Alpha,Tech,2.0\n\
        BBB,Bravo,Utilities,0.5\n\
        CCC,Charlie,Tech,1.0\n";

    const LOW_BETA: &str = r#"{"preferences": {"beta": {"weight": 1, "direction": "negative"}}}"#;

    async fn state_in_temp_dir(max_sessions: usize) -> (Arc<AppState>, PathBuf) {
        let dir = std::env::temp_dir().join(format!("ranker-api-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let csv = dir.join("companies.csv");
        tokio::fs::write(&csv, COMPANIES).await.unwrap();

        let config = RankerConfig::new()
            .with_companies_csv(&csv)
            .with_export_dir(dir.join("exports"))
            .with_top_n(2);
        let ranker = Ranker::new(config, Arc::new(CannedOracle::new(Some(LOW_BETA)))).unwrap();
        (AppState::with_ranker(ranker, max_sessions).unwrap(), dir)
    }

    async fn post(state: &Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = create_router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            error_response(&RankingError::NoRecentRanking).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(&RankingError::empty_spec()).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&RankingError::Configuration("oracle down".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rank_request_defaults() {
        let request: RankRequest =
            serde_json::from_str(r#"{"request": "low beta"}"#).unwrap();
        assert_eq!(request.request, "low beta");
        assert!(request.top_n.is_none());
        assert!(request.session_id.is_none());
    }

    #[tokio::test]
    async fn test_rank_then_export_over_http() {
        let (state, dir) = state_in_temp_dir(8).await;

        let (status, body) = post(&state, "/api/rank", serde_json::json!({"request": "low beta"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["rows"].as_array().unwrap().len(), 2);
        assert!(body["markdown"].as_str().unwrap().contains("| 1 | BBB | Bravo |"));
        let session_id = body["session_id"].clone();

        let (status, again) = post(
            &state,
            "/api/rank",
            serde_json::json!({"request": "low beta", "top_n": 3, "session_id": session_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["session_id"], session_id);
        assert_eq!(state.session_count().await, 1);

        let (status, saved) = post(&state, "/api/export", serde_json::json!({"session_id": session_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(saved["path"].as_str().unwrap().ends_with("top3_beta-neg.csv"));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_export_unknown_session_is_not_found() {
        let (state, dir) = state_in_temp_dir(8).await;
        let (status, _) = post(
            &state,
            "/api/export",
            serde_json::json!({"session_id": SessionId::new()}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_sessions_stay_bounded() {
        let (state, dir) = state_in_temp_dir(2).await;
        let (_, first) = post(&state, "/api/rank", serde_json::json!({"request": "low beta"})).await;
        for _ in 0..3 {
            let (status, _) = post(&state, "/api/rank", serde_json::json!({"request": "low beta"})).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(state.session_count().await, 2);

        // The oldest session was evicted, so it has nothing left to export.
        let (status, _) = post(
            &state,
            "/api/export",
            serde_json::json!({"session_id": first["session_id"]}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[test]
    fn test_zero_session_capacity_rejected() {
        let ranker = Ranker::new(RankerConfig::new(), Arc::new(CannedOracle::new(None))).unwrap();
        assert!(matches!(
            AppState::with_ranker(ranker, 0),
            Err(RankingError::Configuration(_))
        ));
    }
}
