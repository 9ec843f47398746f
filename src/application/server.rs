#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use anyhow::Result;
use axum::body::Body;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use crate::domain::models::PayloadKind;
use crate::infrastructure::backends::mock::canned_reply;

/// The mock agent API: the HTTP surface a real shopping agent will replace.
/// Paths, validation rules, and reply shapes are the contract the chat client
/// is built against.
pub fn router() -> Router {
    return Router::new()
        .route("/api/chat/message", post(process_message).options(preflight))
        .route("/api/chat/new", post(acknowledge))
        .route("/api/chat/reset", post(acknowledge));
}

pub async fn serve(address: &str) -> Result<()> {
    let listener = TcpListener::bind(address).await?;
    tracing::info!(address, "Mock agent API listening");
    println!("Mock agent API listening on http://{address}");

    axum::serve(listener, router()).await?;

    return Ok(());
}

fn bad_request(error: &str) -> Response {
    return (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response();
}

async fn process_message(body: String) -> Response {
    let data: serde_json::Value = match serde_json::from_str(&body) {
        Ok(data) => data,
        Err(err) => {
            tracing::error!(error = ?err, "Error processing chat message");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };

    let kind = match data.get("type").and_then(|kind| return kind.as_str()) {
        Some("text") => PayloadKind::Text,
        Some("image") => PayloadKind::Image,
        Some("audio") => PayloadKind::Audio,
        _ => return bad_request("Invalid input type"),
    };

    let message = data
        .get("message")
        .and_then(|message| return message.as_str())
        .unwrap_or_default();
    let base64_data = data
        .get("base64Data")
        .and_then(|data| return data.as_str())
        .unwrap_or_default();

    if kind == PayloadKind::Text && message.is_empty() {
        return bad_request("Message is required for text input");
    }

    if kind != PayloadKind::Text && base64_data.is_empty() {
        return bad_request("Base64 data is required for media messages");
    }

    tracing::debug!(
        kind = ?kind,
        message_len = message.len(),
        has_base64 = !base64_data.is_empty(),
        "Received chat message"
    );

    return (
        StatusCode::OK,
        Json(json!({ "response": canned_reply(kind, message) })),
    )
        .into_response();
}

async fn acknowledge() -> Response {
    return (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response();
}

async fn preflight() -> Response {
    return Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .body(Body::empty())
        .unwrap();
}
