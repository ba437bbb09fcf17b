use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::error::EngineError;
use crate::llm::engine::ConversationEngine;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<ConversationEngine>,
}

#[derive(Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    message: String,
}

#[derive(Deserialize, Validate)]
pub struct SelectModelRequest {
    #[validate(length(min = 1, max = 100))]
    model: String,
    temperature: Option<f32>,
}

#[derive(Serialize)]
pub struct StartConversationResponse {
    message: String,
}

#[derive(Serialize)]
pub struct RelevantChunk {
    content: String,
    url: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    response: String,
    relevant_chunks: Vec<RelevantChunk>,
    token_usage: u32,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    models: Vec<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    success: bool,
    message: String,
}

/// Map an engine failure to a response. Backend failures become 502s;
/// anything uncategorized is logged in full and surfaced without detail.
fn error_response(error: EngineError) -> Response {
    let (status, message) = match &error {
        EngineError::Validation(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        EngineError::RetrievalUnavailable(_) | EngineError::GenerationFailure(_) => {
            log::error!("backend failure: {}", error);
            (StatusCode::BAD_GATEWAY, error.to_string())
        }
        EngineError::Configuration(_) | EngineError::Unexpected(_) => {
            log::error!("internal failure: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    };

    (
        status,
        Json(StatusResponse {
            success: false,
            message,
        }),
    )
        .into_response()
}

/// Create and configure the API router.
pub fn create_api(engine: Arc<ConversationEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/start-conversation", post(start_conversation_handler))
        .route("/api/send-message", post(send_message_handler))
        .route("/api/available-models", get(available_models_handler))
        .route("/api/select-model", post(select_model_handler))
        .route("/api/clear-memory", post(clear_memory_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(AppState { engine })
}

async fn start_conversation_handler(State(state): State<AppState>) -> Response {
    let message = state.engine.start_conversation();
    Json(StartConversationResponse { message }).into_response()
}

async fn send_message_handler(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(EngineError::Validation(e.to_string()));
    }

    match state.engine.respond(&request.message).await {
        Ok(turn) => Json(SendMessageResponse {
            response: turn.answer,
            relevant_chunks: turn
                .passages
                .into_iter()
                .map(|passage| RelevantChunk {
                    content: passage.content,
                    url: passage.source,
                })
                .collect(),
            token_usage: turn.usage.total_tokens,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn available_models_handler(State(state): State<AppState>) -> Response {
    match state.engine.available_models().await {
        Ok(models) => Json(ModelsResponse { models }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn select_model_handler(
    State(state): State<AppState>,
    Json(request): Json<SelectModelRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(EngineError::Validation(e.to_string()));
    }

    let temperature = request.temperature.unwrap_or_else(|| state.engine.temperature());

    match state.engine.change_model(&request.model, temperature).await {
        Ok(()) => Json(StatusResponse {
            success: true,
            message: format!("Model {} selected", request.model),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn clear_memory_handler(State(state): State<AppState>) -> Response {
    state.engine.clear_memory();
    Json(StatusResponse {
        success: true,
        message: "Memory cleared".to_string(),
    })
    .into_response()
}

async fn health_check() -> Response {
    Json(StatusResponse {
        success: true,
        message: "Server is running and healthy".to_string(),
    })
    .into_response()
}
