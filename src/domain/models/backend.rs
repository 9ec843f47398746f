#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Text,
    Image,
    Audio,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundPayload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "base64Data", skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
}

fn optional(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    return Some(text.to_string());
}

impl OutboundPayload {
    pub fn text(message: &str) -> OutboundPayload {
        return OutboundPayload {
            kind: PayloadKind::Text,
            message: Some(message.to_string()),
            base64_data: None,
        };
    }

    pub fn image(base64_data: &str, caption: &str) -> OutboundPayload {
        return OutboundPayload {
            kind: PayloadKind::Image,
            message: optional(caption),
            base64_data: Some(base64_data.to_string()),
        };
    }

    pub fn audio(base64_data: &str, transcript: &str) -> OutboundPayload {
        return OutboundPayload {
            kind: PayloadKind::Audio,
            message: optional(transcript),
            base64_data: Some(base64_data.to_string()),
        };
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub box_2d: [f64; 4],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    #[serde(
        rename = "boundingBoxes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bounding_boxes: Vec<BoundingBox>,
}

/// Failures the session controller tells apart from ordinary transport
/// errors. A timeout aborts only its own request and is kept quiet in spots
/// where repeating the toast would spam the user.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("agent request timed out and was aborted")]
    Timeout,
    #[error("agent returned status code {0}")]
    Status(u16),
}

impl BackendError {
    pub fn is_timeout(err: &anyhow::Error) -> bool {
        return matches!(
            err.downcast_ref::<BackendError>(),
            Some(BackendError::Timeout)
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendName {
    Agent,
    Mock,
}

impl BackendName {
    pub fn parse(text: String) -> Result<BackendName> {
        for name in BackendName::iter() {
            if name.to_string() == text {
                return Ok(name);
            }
        }

        bail!(format!("There is no backend named {text}"))
    }
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;

#[async_trait]
pub trait Backend {
    fn name(&self) -> BackendName;

    /// Asks the agent to start a fresh session. Called once per session by
    /// the controller's initialize operation.
    async fn start_session(&self) -> Result<()>;

    /// Asks the agent to drop all conversation state it holds.
    async fn reset_session(&self) -> Result<()>;

    /// Submits one user payload and returns the agent's structured reply.
    /// Each call carries its own deadline; timing out cancels only this
    /// request.
    async fn send_message(&self, payload: OutboundPayload) -> Result<AgentReply>;
}
