use crate::citations::Citation;
use crate::coordinator::{FollowUp, SearchCoordinator, SearchError, SearchResult};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    coordinator: SearchCoordinator,
}

impl AppState {
    pub fn new(coordinator: SearchCoordinator) -> Self {
        Self { coordinator }
    }
}

/// Query string of a new search: `?q=...`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Body of a follow-up question
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    session_id: Option<String>,
    query: Option<String>,
}

/// Answer payload. `session_id` is present when a new session was started.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub summary: String,
    pub sources: Vec<Citation>,
}

impl SearchResponse {
    fn started(result: SearchResult) -> Self {
        Self {
            session_id: Some(result.session_id),
            summary: result.summary,
            sources: result.sources,
        }
    }

    fn continued(result: SearchResult) -> Self {
        Self {
            session_id: None,
            summary: result.summary,
            sources: result.sources,
        }
    }
}

impl From<FollowUp> for SearchResponse {
    fn from(follow_up: FollowUp) -> Self {
        match follow_up {
            FollowUp::Continued(result) => SearchResponse::continued(result),
            FollowUp::StartedNew { result, .. } => SearchResponse::started(result),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Search(SearchError),
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError::Search(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => {
                warn!(message, "Rejected request");
                (StatusCode::BAD_REQUEST, message.to_string())
            }
            Self::Search(e) => {
                error!(error = %e, "Search request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/search", get(handle_search))
        .route("/api/chat", get(handle_search).post(handle_follow_up))
        .route("/api/follow-up", post(handle_follow_up))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "Search daemon is running"
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Handler for new searches
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = required(params.q).ok_or(ApiError::BadRequest(
        "Query parameter 'q' is required",
    ))?;

    let result = state.coordinator.start_search(&query).await?;
    Ok(Json(SearchResponse::started(result)))
}

/// Handler for follow-up questions
async fn handle_follow_up(
    State(state): State<AppState>,
    Json(payload): Json<FollowUpRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (Some(session_id), Some(query)) = (required(payload.session_id), required(payload.query))
    else {
        return Err(ApiError::BadRequest("Both sessionId and query are required"));
    };

    let follow_up = state.coordinator.continue_search(&session_id, &query).await?;
    Ok(Json(follow_up.into()))
}
