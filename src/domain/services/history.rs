#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

use std::path;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::Message;

/// Reload-surviving message log: one YAML record per message, keyed by id.
///
/// Storage trouble is never an application error. Every operation swallows
/// its own failures, logs them, and lets the session carry on in memory only.
pub struct HistoryStore {
    pub store_dir: path::PathBuf,
}

impl Default for HistoryStore {
    fn default() -> HistoryStore {
        let store_dir = dirs::cache_dir().unwrap().join("sidecart/history");

        return HistoryStore::new(store_dir);
    }
}

impl HistoryStore {
    pub fn new(store_dir: path::PathBuf) -> HistoryStore {
        return HistoryStore { store_dir };
    }

    fn record_path(&self, id: &str) -> path::PathBuf {
        return self.store_dir.join(format!("{id}.yaml"));
    }

    /// Returns every stored message in creation order. Ids are monotonic
    /// ULIDs, so sorting on id reproduces insertion order.
    pub async fn load(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = vec![];
        if !self.store_dir.exists() {
            return messages;
        }

        let mut dir = match fs::read_dir(&self.store_dir).await {
            Ok(dir) => dir,
            Err(err) => {
                tracing::warn!(error = ?err, "Unable to read the history directory");
                return messages;
            }
        };

        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = ?err, "Unable to walk the history directory");
                    break;
                }
            };

            let payload = match fs::read_to_string(entry.path()).await {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(error = ?err, file = ?entry.path(), "Skipping unreadable history record");
                    continue;
                }
            };

            match serde_yaml::from_str::<Message>(&payload) {
                Ok(message) => messages.push(message),
                Err(err) => {
                    tracing::warn!(error = ?err, file = ?entry.path(), "Skipping corrupt history record");
                }
            }
        }

        messages.sort_by(|a, b| return a.id.cmp(&b.id));

        return messages;
    }

    pub async fn append(&self, message: &Message) {
        let payload = match serde_yaml::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = ?err, id = %message.id, "Unable to serialize history record");
                return;
            }
        };

        if !self.store_dir.exists() {
            if let Err(err) = fs::create_dir_all(&self.store_dir).await {
                tracing::warn!(error = ?err, "Unable to create the history directory");
                return;
            }
        }

        let file_res = fs::File::create(self.record_path(&message.id)).await;
        let mut file = match file_res {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(error = ?err, id = %message.id, "Unable to create history record");
                return;
            }
        };

        if let Err(err) = file.write_all(payload.as_bytes()).await {
            tracing::warn!(error = ?err, id = %message.id, "Unable to write history record");
        }
    }

    pub async fn clear(&self) {
        if !self.store_dir.exists() {
            return;
        }

        if let Err(err) = fs::remove_dir_all(&self.store_dir).await {
            tracing::warn!(error = ?err, "Unable to clear the history directory");
        }
    }
}
