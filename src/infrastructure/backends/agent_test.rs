use anyhow::Result;
use serde_json::json;

use super::Agent;
use crate::domain::models::Backend;
use crate::domain::models::BackendError;
use crate::domain::models::OutboundPayload;

impl Agent {
    fn with_url(url: String) -> Agent {
        return Agent {
            url,
            timeout: "200".to_string(),
        };
    }
}

#[tokio::test]
async fn it_starts_sessions() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/new")
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .create();

    let backend = Agent::with_url(server.url());
    let res = backend.start_session().await;

    assert!(res.is_ok());
    mock.assert();
}

#[tokio::test]
async fn it_fails_starting_sessions() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/new")
        .with_status(500)
        .create();

    let backend = Agent::with_url(server.url());
    let res = backend.start_session().await;

    assert!(res.is_err());
    mock.assert();
}

#[tokio::test]
async fn it_resets_sessions() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/reset")
        .with_status(200)
        .with_body(r#"{"status": "ok"}"#)
        .create();

    let backend = Agent::with_url(server.url());
    let res = backend.reset_session().await;

    assert!(res.is_ok());
    mock.assert();
}

#[tokio::test]
async fn it_sends_text_messages() -> Result<()> {
    let body = json!({
        "response": {
            "text": "I understand you said: \"Show me laptops\"."
        }
    })
    .to_string();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/message")
        .match_body(mockito::Matcher::PartialJson(json!({
            "type": "text",
            "message": "Show me laptops"
        })))
        .with_status(200)
        .with_body(body)
        .create();

    let backend = Agent::with_url(server.url());
    let reply = backend
        .send_message(OutboundPayload::text("Show me laptops"))
        .await?;

    assert_eq!(reply.text, "I understand you said: \"Show me laptops\".");
    assert!(reply.bounding_boxes.is_empty());
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_parses_bounding_boxes() -> Result<()> {
    let body = json!({
        "response": {
            "text": "I can see the image you uploaded. Here's what I found:",
            "boundingBoxes": [
                { "label": "Sample Object 1", "box_2d": [100, 100, 200, 200] },
                { "label": "Sample Object 2", "box_2d": [300, 300, 400, 400] }
            ]
        }
    })
    .to_string();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/message")
        .with_status(200)
        .with_body(body)
        .create();

    let backend = Agent::with_url(server.url());
    let reply = backend
        .send_message(OutboundPayload::image("data:image/png;base64,aGk=", ""))
        .await?;

    assert_eq!(reply.bounding_boxes.len(), 2);
    assert_eq!(reply.bounding_boxes[0].label, "Sample Object 1");
    assert_eq!(reply.bounding_boxes[1].box_2d, [300.0, 300.0, 400.0, 400.0]);
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_surfaces_error_statuses() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/api/chat/message")
        .with_status(400)
        .with_body(r#"{"error": "Invalid input type"}"#)
        .create();

    let backend = Agent::with_url(server.url());
    let err = backend
        .send_message(OutboundPayload::text("hello"))
        .await
        .unwrap_err();

    match err.downcast_ref::<BackendError>() {
        Some(BackendError::Status(status)) => assert_eq!(*status, 400),
        _ => panic!("expected a status error"),
    }
    assert!(!BackendError::is_timeout(&err));
    mock.assert();
}
