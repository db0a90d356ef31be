//! HTTP server for the bot.
//!
//! Receives Telegram webhook deliveries and exposes admin endpoints for
//! registering the webhook and running a transcription directly.

use crate::audio::validate_url;
use crate::bot::{Bot, BotRuntime};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{Result, SkrivError};
use crate::orchestrator::Orchestrator;
use crate::telegram::{TelegramClient, Update};
use crate::timecode::TimeRange;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Header Telegram fills with the secret given to `setWebhook`.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared application state.
struct AppState {
    bot: Arc<Bot>,
    client: Arc<TelegramClient>,
    orchestrator: Arc<Orchestrator>,
    webhook_secret: Option<String>,
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'skriv doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let runtime = BotRuntime::start(&settings)?;

    let state = Arc::new(AppState {
        bot: runtime.bot,
        client: runtime.client,
        orchestrator: runtime.orchestrator,
        webhook_secret: settings.telegram.webhook_secret.clone(),
    });

    let host = host.unwrap_or(settings.server.host.as_str());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Skriv Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Webhook", "POST /webhook");
    Output::kv("Set webhook", "POST /set_webhook");
    Output::kv("Transcribe", "POST /transcribe");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .route("/set_webhook", post(set_webhook))
        .route("/transcribe", post(transcribe))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SetWebhookRequest {
    webhook_url: String,
}

#[derive(Deserialize)]
struct TranscribeRequest {
    video_url: String,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Serialize)]
struct TranscribeResponse {
    transcript: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: &SkrivError) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    if let Some(secret) = &state.webhook_secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            warn!("Rejected webhook call with a missing or wrong secret");
            return StatusCode::UNAUTHORIZED;
        }
    }

    // Telegram retries non-2xx deliveries, so failures are only logged.
    if let Err(e) = state.bot.handle_update(update).await {
        error!("Failed to handle update: {}", e);
    }
    StatusCode::OK
}

async fn set_webhook(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetWebhookRequest>,
) -> impl IntoResponse {
    info!("Setting webhook to {}", req.webhook_url);
    match state
        .client
        .set_webhook(&req.webhook_url, state.webhook_secret.as_deref())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, &e),
    }
}

async fn transcribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscribeRequest>,
) -> impl IntoResponse {
    match transcribe_request(&state.orchestrator, &req).await {
        Ok(transcript) => Json(TranscribeResponse { transcript }).into_response(),
        Err(e) if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, &e),
        Err(e) => {
            error!("Transcription request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

async fn transcribe_request(orchestrator: &Orchestrator, req: &TranscribeRequest) -> Result<String> {
    validate_url(&req.video_url)?;
    let range = TimeRange::parse(req.start_time.as_deref(), req.end_time.as_deref())?;
    let result = orchestrator.transcribe_url(&req.video_url, &range).await?;
    Ok(result.transcript)
}
