use anyhow::Result;

use super::canned_reply;
use super::MockAgent;
use crate::domain::models::Backend;
use crate::domain::models::OutboundPayload;
use crate::domain::models::PayloadKind;

#[tokio::test]
async fn it_echoes_text_messages() -> Result<()> {
    let backend = MockAgent::default();
    let reply = backend
        .send_message(OutboundPayload::text("Show me laptops"))
        .await?;

    insta::assert_snapshot!(reply.text, @r###"I understand you said: "Show me laptops". This is a canned response until the live shopping agent takes over."###);
    assert!(reply.bounding_boxes.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_labels_uploaded_images() -> Result<()> {
    let backend = MockAgent::default();
    let reply = backend
        .send_message(OutboundPayload::image("data:image/png;base64,aGk=", ""))
        .await?;

    assert_eq!(
        reply.text,
        "I can see the image you uploaded. Here's what I found:"
    );
    assert_eq!(reply.bounding_boxes.len(), 2);
    assert_eq!(reply.bounding_boxes[0].label, "Sample Object 1");
    assert_eq!(reply.bounding_boxes[0].box_2d, [100.0, 100.0, 200.0, 200.0]);

    return Ok(());
}

#[tokio::test]
async fn it_quotes_voice_transcripts() -> Result<()> {
    let backend = MockAgent::default();
    let reply = backend
        .send_message(OutboundPayload::audio(
            "aGk=",
            "I'd like to order a new smartphone",
        ))
        .await?;

    insta::assert_snapshot!(reply.text, @r###"I heard your voice message: "I'd like to order a new smartphone". The live shopping agent will handle it soon."###);

    return Ok(());
}

#[test]
fn it_answers_untranscribed_voice_messages() {
    let reply = canned_reply(PayloadKind::Audio, "");
    assert_eq!(
        reply.text,
        "I heard your voice message. The live shopping agent will handle it soon."
    );
}

#[tokio::test]
async fn it_accepts_session_lifecycle_calls() -> Result<()> {
    let backend = MockAgent::default();
    backend.start_session().await?;
    backend.reset_session().await?;

    return Ok(());
}
