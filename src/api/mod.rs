//! HTTP API routes for the scoreboard
//!
//! Every handler reads the mode's document from disk, applies its change and
//! writes the whole document back. Bodies that are not JSON objects are read
//! as `{}` so the required-field checks decide the response.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::services::ServeFile;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::models::*;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/data", get(get_data).fallback(not_found))
        .route("/api/score", post(set_score).fallback(not_found))
        .route("/api/notes", post(set_notes).fallback(not_found))
        .route("/api/reset", post(reset).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

/// Full application: API, index page, pre-flight handling and CORS headers
pub fn app(state: Arc<AppState>, index_path: &Path) -> Router {
    routes(state)
        .route(
            "/",
            get_service(ServeFile::new(index_path)).fallback(not_found),
        )
        .layer(middleware::from_fn(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
}

/// OPTIONS on any path is answered here, before routing to a handler
async fn preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

// =============================================================================
// Request helpers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

fn parse_body(raw: &Bytes) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("Request body is not a JSON object, treating as empty");
            Map::new()
        }
        Err(e) => {
            if !raw.is_empty() {
                tracing::warn!("Malformed request body, treating as empty: {}", e);
            }
            Map::new()
        }
    }
}

/// A `mode` field in the body wins; without one the query string decides
fn body_mode(body: &Map<String, Value>, query: &ModeQuery) -> Mode {
    match body.get("mode") {
        Some(value) => Mode::from_value(Some(value)),
        None => Mode::resolve(query.mode.as_deref()),
    }
}

fn field_key(body: &Map<String, Value>, name: &str) -> Option<String> {
    body.get(name).and_then(key_fragment)
}

fn ok() -> Response {
    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

/// Full context chain goes to the log, only the top-level message to the client
fn internal_error(mode: Mode, e: anyhow::Error) -> Response {
    tracing::error!("Storage failure for {} scoreboard: {:#}", mode, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

async fn get_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModeQuery>,
) -> Response {
    let mode = Mode::resolve(query.mode.as_deref());
    let data = match state.store.read(mode).await {
        Ok(doc) => doc.tagged(mode).map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    match data {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => internal_error(mode, e),
    }
}

async fn set_score(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModeQuery>,
    raw: Bytes,
) -> Response {
    let body = parse_body(&raw);
    let mode = body_mode(&body, &query);

    let model = field_key(&body, "model");
    let step = field_key(&body, "step");
    let raw_score = body.get("score").filter(|v| !v.is_null());
    let (Some(model), Some(step), Some(raw_score)) = (model, step, raw_score) else {
        return bad_request("need model, step, score");
    };
    let Some(score) = parse_score(raw_score) else {
        return bad_request("score must be an integer");
    };

    match state
        .store
        .update(mode, |doc| doc.set_score(&model, &step, score))
        .await
    {
        Ok(stored) => {
            tracing::info!("[{}] score {}/{} = {} (submitted {})", mode, model, step, stored, score);
            ok()
        }
        Err(e) => internal_error(mode, e),
    }
}

async fn set_notes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModeQuery>,
    raw: Bytes,
) -> Response {
    let body = parse_body(&raw);
    let mode = body_mode(&body, &query);

    let (Some(model), Some(step)) = (field_key(&body, "model"), field_key(&body, "step")) else {
        return bad_request("need model, step");
    };
    let text = note_text(body.get("notes"));

    match state
        .store
        .update(mode, |doc| doc.set_note(&model, &step, text))
        .await
    {
        Ok(()) => {
            tracing::debug!("[{}] notes updated for {}", mode, note_key(&model, &step));
            ok()
        }
        Err(e) => internal_error(mode, e),
    }
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModeQuery>,
    raw: Bytes,
) -> Response {
    let body = parse_body(&raw);
    let mode = body_mode(&body, &query);

    // Absent, null or "" means the whole board
    let target = match body.get("model") {
        None | Some(Value::Null) => None,
        Some(value) => match key_fragment(value) {
            Some(model) if model.is_empty() => None,
            Some(model) => Some(model),
            None => return bad_request("model must be a string, number or boolean"),
        },
    };

    let result = state
        .store
        .update(mode, |doc| match &target {
            Some(model) => doc.reset_model(model),
            None => doc.reset_all(),
        })
        .await;

    match result {
        Ok(()) => {
            match &target {
                Some(model) => tracing::info!("[{}] reset model {}", mode, model),
                None => tracing::info!("[{}] reset all scores and notes", mode),
            }
            ok()
        }
        Err(e) => internal_error(mode, e),
    }
}
