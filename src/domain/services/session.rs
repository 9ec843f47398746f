#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use tokio::sync::mpsc;

use super::HistoryStore;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendError;
use crate::domain::models::Draft;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::Notice;
use crate::domain::models::OutboundPayload;
use crate::domain::models::SessionState;

/// Owns one conversation: the in-memory message list, its persisted copy, and
/// every call to the agent. Methods take `&mut self`, so operations through
/// one handle are serialized in call order.
pub struct SessionController {
    backend: BackendBox,
    history: HistoryStore,
    messages: Vec<Message>,
    state: SessionState,
    initialized: bool,
    waiting_for_agent: bool,
    tx: mpsc::UnboundedSender<Event>,
}

impl SessionController {
    /// Opens a session handle, picking up whatever history survived the last
    /// run.
    pub async fn open(
        backend: BackendBox,
        history: HistoryStore,
        tx: mpsc::UnboundedSender<Event>,
    ) -> SessionController {
        let messages = history.load().await;

        return SessionController {
            backend,
            history,
            messages,
            state: SessionState::Uninitialized,
            initialized: false,
            waiting_for_agent: false,
            tx,
        };
    }

    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn state(&self) -> SessionState {
        return self.state;
    }

    pub fn is_waiting(&self) -> bool {
        return self.waiting_for_agent;
    }

    /// Starts a fresh session with the agent, wiping local state. Re-entrant
    /// calls collapse: a second initialize while one is in flight, or after
    /// one succeeded, is a no-op. Failure leaves the session uninitialized so
    /// a retry can succeed.
    pub async fn initialize(&mut self) {
        if self.state.is_transitioning() || self.initialized {
            return;
        }

        self.state = SessionState::Initializing;
        self.waiting_for_agent = true;

        let res = self.backend.start_session().await;
        self.waiting_for_agent = false;

        match res {
            Ok(()) => {
                self.messages.clear();
                self.history.clear().await;
                self.initialized = true;
                self.state = SessionState::Ready;
                self.notify(Notice::info("New chat session initialized"));
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to initialize chat session");
                self.state = SessionState::Uninitialized;
                if !BackendError::is_timeout(&err) {
                    self.notify(Notice::error(&format!("Failed to initialize chat: {err}")));
                }
            }
        }
    }

    /// Sends one draft: the user message is appended and persisted before the
    /// agent is called, the reply after. Agent failure degrades into an
    /// apologetic assistant message instead of an error; the waiting flag
    /// clears on every path.
    pub async fn send(&mut self, draft: Draft) {
        if draft.is_empty() {
            return;
        }

        let payload = payload_for(&draft);
        let audio_url = draft.audio.as_ref().and_then(|audio| return audio.url.clone());
        let user_message = Message::user(&draft.text)
            .with_images(draft.images)
            .with_audio_url(audio_url);
        self.push(user_message).await;

        self.state = SessionState::Sending;
        self.waiting_for_agent = true;

        let res = self.backend.send_message(payload).await;

        self.waiting_for_agent = false;
        self.state = SessionState::Ready;

        let reply = match res {
            Ok(reply) => Message::assistant(reply),
            Err(err) => {
                tracing::error!(error = ?err, "Error processing message");
                Message::apology()
            }
        };

        self.push(reply).await;
    }

    /// Clears the conversation on both sides. When the agent call fails, the
    /// local state is left exactly as it was; there is no partial clear.
    pub async fn reset(&mut self) {
        if self.state.is_transitioning() {
            return;
        }

        self.state = SessionState::Resetting;
        self.waiting_for_agent = true;

        let res = self.backend.reset_session().await;
        self.waiting_for_agent = false;
        self.state = SessionState::Ready;

        match res {
            Ok(()) => {
                self.messages.clear();
                self.history.clear().await;
                self.notify(Notice::info("Chat history cleared"));
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to reset chat");
                self.notify(Notice::error("Failed to reset chat. Please try again."));
            }
        }
    }

    async fn push(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.history.append(&message).await;
        let _ = self.tx.send(Event::MessageAppended(message));
    }

    fn notify(&self, notice: Notice) {
        let _ = self.tx.send(Event::Notice(notice));
    }
}

fn payload_for(draft: &Draft) -> OutboundPayload {
    if let Some(audio) = &draft.audio {
        return OutboundPayload::audio(&audio.to_base64(), &draft.text);
    }

    // The wire field is singular: the agent sees the first staged image, the
    // rest travel on the message record only.
    if let Some(image) = draft.images.first() {
        return OutboundPayload::image(image, &draft.text);
    }

    return OutboundPayload::text(draft.text.trim());
}
