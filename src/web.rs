use crate::analysis::Analyzer;
use crate::config::NetworkSettings;
use crate::metrics::AnalysisResult;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

pub struct AppState {
    pub settings: NetworkSettings,
    pub analyzer: Analyzer<Local>,
}

type SharedState = Arc<AppState>;

pub async fn start_web_server(state: SharedState, port: u16) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/network/analysis", get(analysis_handler))
        .route("/api/network/gaps", get(gaps_handler))
        .route("/api/network/config", get(config_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Web server listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
struct GapsQuery {
    expanded: Option<bool>,
}

/// Outcome of reading and analyzing the configured log
pub struct LogAnalysis {
    pub analysis: AnalysisResult,
    pub message: String,
}

/// Read the configured log and analyze it. Problems reading the log are
/// reported in the message alongside an empty analysis, never as failures.
pub async fn load_analysis(state: &AppState) -> LogAnalysis {
    let now = Utc::now();

    let Some(path) = state.settings.log_file.as_ref() else {
        return LogAnalysis {
            analysis: state.analyzer.analyze(Vec::new(), now),
            message: "No log file configured.".to_string(),
        };
    };

    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let analysis = state.analyzer.analyze_text(&text, now);
            debug!(
                path = %path.display(),
                outages = analysis.outage_count(),
                "Analyzed check log"
            );
            let message = if analysis.is_empty() {
                "No log entries found.".to_string()
            } else {
                format!("Loaded {} log entries.", analysis.records.len())
            };
            LogAnalysis { analysis, message }
        }
        Err(e) => {
            warn!("Unable to load log {}: {}", path.display(), e);
            LogAnalysis {
                analysis: state.analyzer.analyze(Vec::new(), now),
                message: format!("Unable to load log: {}", e),
            }
        }
    }
}

async fn analysis_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let LogAnalysis { analysis, message } = load_analysis(&state).await;
    Json(serde_json::json!({
        "success": true,
        "message": message,
        "data": analysis
    }))
}

async fn gaps_handler(
    State(state): State<SharedState>,
    Query(params): Query<GapsQuery>,
) -> impl IntoResponse {
    let LogAnalysis { analysis, message } = load_analysis(&state).await;
    let listing = state
        .settings
        .gap_filter()
        .apply(&analysis.gaps, params.expanded.unwrap_or(false));
    Json(serde_json::json!({
        "success": true,
        "message": message,
        "count": listing.gaps.len(),
        "data": listing
    }))
}

async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": state.settings
    }))
}
