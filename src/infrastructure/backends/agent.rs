#[cfg(test)]
#[path = "agent_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AgentReply;
use crate::domain::models::Backend;
use crate::domain::models::BackendError;
use crate::domain::models::BackendName;
use crate::domain::models::OutboundPayload;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MessageResponse {
    response: AgentReply,
}

pub struct Agent {
    url: String,
    timeout: String,
}

impl Default for Agent {
    fn default() -> Agent {
        return Agent {
            url: Config::get(ConfigKey::AgentURL),
            timeout: Config::get(ConfigKey::AgentTimeout),
        };
    }
}

impl Agent {
    fn deadline(&self) -> Duration {
        return Duration::from_millis(self.timeout.parse::<u64>().unwrap_or(30_000));
    }

    // Every call carries its own deadline, so one slow request cannot take an
    // unrelated one down with it.
    async fn post(&self, path: &str, body: Option<&OutboundPayload>) -> Result<reqwest::Response> {
        let mut req = reqwest::Client::new()
            .post(format!("{url}{path}", url = self.url))
            .timeout(self.deadline());

        if let Some(body) = body {
            req = req.json(body);
        }

        let res = match req.send().await {
            Ok(res) => res,
            Err(err) => {
                if err.is_timeout() {
                    tracing::warn!(path, "Agent request timed out");
                    return Err(BackendError::Timeout.into());
                }

                return Err(err.into());
            }
        };

        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), path, "Agent request failed");
            return Err(BackendError::Status(res.status().as_u16()).into());
        }

        return Ok(res);
    }
}

#[async_trait]
impl Backend for Agent {
    fn name(&self) -> BackendName {
        return BackendName::Agent;
    }

    async fn start_session(&self) -> Result<()> {
        self.post("/api/chat/new", None).await?;
        return Ok(());
    }

    async fn reset_session(&self) -> Result<()> {
        self.post("/api/chat/reset", None).await?;
        return Ok(());
    }

    async fn send_message(&self, payload: OutboundPayload) -> Result<AgentReply> {
        let res = self
            .post("/api/chat/message", Some(&payload))
            .await?
            .json::<MessageResponse>()
            .await;

        match res {
            Ok(body) => {
                tracing::debug!(body = ?body, "Agent reply");
                return Ok(body.response);
            }
            Err(err) if err.is_timeout() => return Err(BackendError::Timeout.into()),
            Err(err) => return Err(err.into()),
        }
    }
}
