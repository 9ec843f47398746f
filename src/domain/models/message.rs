#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::sync::Mutex;

use chrono::DateTime;
use chrono::Local;
use once_cell::sync::Lazy;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use ulid::Generator;
use ulid::Ulid;

use super::AgentReply;
use super::Author;

pub const APOLOGY_TEXT: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

// Monotonic within the process so lexicographic id order is creation order.
static IDS: Lazy<Mutex<Generator>> = Lazy::new(|| return Mutex::new(Generator::new()));

fn next_id() -> String {
    let mut ids = IDS.lock().unwrap();
    return ids
        .generate()
        .unwrap_or_else(|_| return Ulid::new())
        .to_string();
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Plain(String),
    Structured(AgentReply),
}

impl Content {
    pub fn text(&self) -> &str {
        match self {
            Content::Plain(text) => return text,
            Content::Structured(reply) => return &reply.text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Author,
    pub content: Content,
    pub timestamp: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip)]
    pub audio_url: Option<String>,
}

impl Message {
    pub fn user(text: &str) -> Message {
        return Message {
            id: next_id(),
            role: Author::User,
            content: Content::Plain(text.to_string()),
            timestamp: Local::now(),
            images: vec![],
            audio_url: None,
        };
    }

    pub fn assistant(reply: AgentReply) -> Message {
        return Message {
            id: next_id(),
            role: Author::Assistant,
            content: Content::Structured(reply),
            timestamp: Local::now(),
            images: vec![],
            audio_url: None,
        };
    }

    pub fn apology() -> Message {
        return Message {
            id: next_id(),
            role: Author::Assistant,
            content: Content::Plain(APOLOGY_TEXT.to_string()),
            timestamp: Local::now(),
            images: vec![],
            audio_url: None,
        };
    }

    pub fn with_images(mut self, images: Vec<String>) -> Message {
        self.images = images;
        return self;
    }

    pub fn with_audio_url(mut self, audio_url: Option<String>) -> Message {
        self.audio_url = audio_url;
        return self;
    }
}
