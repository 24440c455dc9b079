//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for game logic and
//! let [`GameError`](crate::error::GameError) map failures to status codes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::response::api_success;
use crate::api::AppState;
use crate::error::GameResult;
use crate::protocol_constants::{DEFAULT_TOPN, SERVICE_ID};
use crate::services::{SessionEngine, Song};
use crate::similarity::lookup_similar;

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SimilarRequest {
    word: String,
    #[serde(default = "default_topn")]
    topn: i64,
}

fn default_topn() -> i64 {
    DEFAULT_TOPN
}

#[derive(Deserialize)]
struct CreateRequest {
    client_id: String,
    #[serde(default)]
    min_streams: i64,
    song: Song,
}

#[derive(Deserialize)]
struct JoinRequest {
    code: String,
    client_id: String,
}

#[derive(Deserialize)]
struct StateQuery {
    #[serde(default)]
    client_id: String,
}

#[derive(Deserialize)]
struct GuessRequest {
    code: String,
    client_id: String,
    word: String,
}

#[derive(Deserialize)]
struct TitleRequest {
    code: String,
    client_id: String,
    title: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/similar", post(handle_similar))
        .nest("/team/session", session_routes(state.team.clone()))
        .nest("/versus/session", session_routes(state.versus.clone()))
        .with_state(state)
}

/// Routes shared by every session mode, bound to one engine.
fn session_routes<E, S>(engine: Arc<E>) -> Router<S>
where
    E: SessionEngine,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/create", post(create_session::<E>))
        .route("/join", post(join_session::<E>))
        .route("/{code}/state", get(session_state::<E>))
        .route("/guess", post(submit_guess::<E>))
        .route("/title", post(submit_title::<E>))
        .with_state(engine)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe with live session counts.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "active_sessions": {
            "team": state.team.active_sessions(),
            "versus": state.versus.active_sessions(),
        }
    }))
}

/// POST /similar
///
/// Returns the nearest neighbours of a word. The oracle is queried outside
/// any session lock.
async fn handle_similar(
    State(state): State<AppState>,
    Json(payload): Json<SimilarRequest>,
) -> GameResult<impl IntoResponse> {
    let max_topn = state.config.max_topn;
    let response = lookup_similar(state.oracle.as_ref(), &payload.word, payload.topn, max_topn)?;
    log::debug!(
        "[Similar] {:?} -> {} result(s)",
        response.normalized,
        response.results.len()
    );
    Ok(api_success(response))
}

async fn create_session<E: SessionEngine>(
    State(engine): State<Arc<E>>,
    Json(payload): Json<CreateRequest>,
) -> GameResult<impl IntoResponse> {
    let view = engine.create(&payload.client_id, payload.min_streams, payload.song)?;
    Ok(api_success(view))
}

async fn join_session<E: SessionEngine>(
    State(engine): State<Arc<E>>,
    Json(payload): Json<JoinRequest>,
) -> GameResult<impl IntoResponse> {
    let view = engine.join(&payload.code, &payload.client_id)?;
    Ok(api_success(view))
}

/// GET /{mode}/session/{code}/state?client_id=...
///
/// Polled by clients; also keeps the session from expiring.
async fn session_state<E: SessionEngine>(
    State(engine): State<Arc<E>>,
    Path(code): Path<String>,
    Query(query): Query<StateQuery>,
) -> GameResult<impl IntoResponse> {
    let view = engine.state(&code, &query.client_id)?;
    Ok(api_success(view))
}

async fn submit_guess<E: SessionEngine>(
    State(engine): State<Arc<E>>,
    Json(payload): Json<GuessRequest>,
) -> GameResult<impl IntoResponse> {
    let outcome = engine.guess(&payload.code, &payload.client_id, &payload.word)?;
    Ok(api_success(outcome))
}

async fn submit_title<E: SessionEngine>(
    State(engine): State<Arc<E>>,
    Json(payload): Json<TitleRequest>,
) -> GameResult<impl IntoResponse> {
    let outcome = engine.title_guess(&payload.code, &payload.client_id, &payload.title)?;
    Ok(api_success(outcome))
}
