use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::api::{self, DataEnvelope, ErrorBody};
use glmrelay_core::{Orchestrator, OrchestratorError, SchemaVariant, StructuredResult};

pub const CHAT_PATH: &str = "/api/chat";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(readiness))
        .route("/health", get(readiness))
        .route(CHAT_PATH, post(submit_chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- HANDLERS ---

async fn readiness(State(state): State<AppState>) -> String {
    format!(
        "AI 聊天服务已就绪。\n请向 {CHAT_PATH} 发送 POST 请求。\n模型: {}",
        state.orchestrator.config().model
    )
}

async fn submit_chat(State(state): State<AppState>, body: Bytes) -> Response {
    // STEP 1: PARSE (the body must at least be JSON)
    let variant = state.orchestrator.config().variant;
    let input = match api::parse_body(&body, variant) {
        Ok(input) => input,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, api::BAD_REQUEST_DETAIL);
        }
    };

    // STEP 2: RUN (canonicalize, prompt, call, extract)
    match state.orchestrator.handle(input).await {
        Ok(result) => render(result, variant),
        Err(OrchestratorError::InvalidInputShape(reason)) => {
            warn!("Input could not be canonicalized: {}", reason);
            error_response(StatusCode::BAD_REQUEST, api::BAD_REQUEST_DETAIL)
        }
        Err(e) => {
            // Full detail is logged by the orchestrator; the caller gets the generic text.
            debug!("Request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, api::UPSTREAM_FAILURE_DETAIL)
        }
    }
}

// STEP 3: RENDER
// The free-text relay only ever answers plain text; structured variants wrap in `data`.
fn render(result: StructuredResult, variant: SchemaVariant) -> Response {
    match (variant, result) {
        (_, StructuredResult::PlainText(text)) => text.into_response(),
        (SchemaVariant::FreeText, StructuredResult::Diagnostic { message }) => {
            message.into_response()
        }
        (_, result) => Json(DataEnvelope { data: result }).into_response(),
    }
}

fn error_response(status: StatusCode, detail: &'static str) -> Response {
    (status, Json(ErrorBody { detail })).into_response()
}
