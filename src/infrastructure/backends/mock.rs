#[cfg(test)]
#[path = "mock_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::AgentReply;
use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::BoundingBox;
use crate::domain::models::OutboundPayload;
use crate::domain::models::PayloadKind;

/// Canned reply for one input kind, shared by the in-process mock backend and
/// the mock agent API server so both surfaces answer identically.
pub fn canned_reply(kind: PayloadKind, message: &str) -> AgentReply {
    match kind {
        PayloadKind::Text => {
            return AgentReply {
                text: format!(
                    "I understand you said: \"{message}\". This is a canned response until the live shopping agent takes over."
                ),
                bounding_boxes: vec![],
            };
        }
        PayloadKind::Image => {
            return AgentReply {
                text: "I can see the image you uploaded. Here's what I found:".to_string(),
                bounding_boxes: vec![
                    BoundingBox {
                        label: "Sample Object 1".to_string(),
                        box_2d: [100.0, 100.0, 200.0, 200.0],
                    },
                    BoundingBox {
                        label: "Sample Object 2".to_string(),
                        box_2d: [300.0, 300.0, 400.0, 400.0],
                    },
                ],
            };
        }
        PayloadKind::Audio => {
            let text = if message.is_empty() {
                "I heard your voice message. The live shopping agent will handle it soon.".to_string()
            } else {
                format!(
                    "I heard your voice message: \"{message}\". The live shopping agent will handle it soon."
                )
            };

            return AgentReply {
                text,
                bounding_boxes: vec![],
            };
        }
    }
}

/// In-process stand-in for the real shopping agent, used when no agent API is
/// running.
#[derive(Default)]
pub struct MockAgent {}

#[async_trait]
impl Backend for MockAgent {
    fn name(&self) -> BackendName {
        return BackendName::Mock;
    }

    async fn start_session(&self) -> Result<()> {
        return Ok(());
    }

    async fn reset_session(&self) -> Result<()> {
        return Ok(());
    }

    async fn send_message(&self, payload: OutboundPayload) -> Result<AgentReply> {
        return Ok(canned_reply(
            payload.kind,
            payload.message.as_deref().unwrap_or_default(),
        ));
    }
}
