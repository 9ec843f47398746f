#[cfg(test)]
#[path = "composer_test.rs"]
mod tests;

use std::path;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future;
use tokio::fs;
use tokio::sync::mpsc;

use super::Recorder;
use crate::domain::models::Draft;
use crate::domain::models::Event;
use crate::domain::models::Notice;

pub const MAX_IMAGES: usize = 3;
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Turns raw compose-box interactions into normalized drafts: typed text, a
/// validated image batch, or a voice recording with its transcript. Only one
/// media mode may be staged at a time; whichever was staged first wins.
///
/// Nothing here returns an error to the caller. Rejected input becomes a
/// notice and the rest of the interaction carries on.
pub struct Composer {
    text: String,
    images: Vec<String>,
    recorder: Recorder,
    tx: mpsc::UnboundedSender<Event>,
}

impl Composer {
    pub fn new(recorder: Recorder, tx: mpsc::UnboundedSender<Event>) -> Composer {
        return Composer {
            text: "".to_string(),
            images: vec![],
            recorder,
            tx,
        };
    }

    pub fn text(&self) -> &str {
        return &self.text;
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn images(&self) -> &[String] {
        return &self.images;
    }

    pub fn remove_image(&mut self, index: usize) {
        if index < self.images.len() {
            self.images.remove(index);
        }
    }

    pub fn is_recording(&self) -> bool {
        return self.recorder.is_recording();
    }

    /// Stages a batch of image files. The whole batch is rejected when it
    /// would push the selection past the limit; otherwise files are read
    /// concurrently, invalid ones are skipped with a notice, and the staged
    /// list grows only once the full batch has settled.
    pub async fn attach_images(&mut self, paths: &[path::PathBuf]) {
        if self.recorder.is_recording() {
            self.notify_error("Stop recording before attaching images");
            return;
        }

        if self.images.len() + paths.len() > MAX_IMAGES {
            self.notify_error("Maximum 3 images allowed");
            return;
        }

        let reads = paths.iter().map(|path| return read_image(path));
        let results = future::join_all(reads).await;

        let mut accepted: Vec<String> = vec![];
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(data_url) => accepted.push(data_url),
                Err(err) => {
                    tracing::warn!(error = ?err, file = ?path, "Rejected image attachment");
                    self.notify_error(&err.to_string());
                }
            }
        }

        self.images.extend(accepted);
    }

    /// Drains the staged text and images into a sendable draft. Returns None
    /// when the trimmed text is empty and nothing is attached.
    pub fn draft(&mut self) -> Option<Draft> {
        let text = self.text.trim().to_string();
        if text.is_empty() && self.images.is_empty() {
            return None;
        }

        self.text.clear();
        let images = std::mem::take(&mut self.images);

        return Some(Draft {
            text,
            images,
            audio: None,
        });
    }

    pub async fn start_recording(&mut self) -> bool {
        if !self.images.is_empty() {
            self.notify_error("Remove attached images before recording");
            return false;
        }

        return self.recorder.start().await;
    }

    /// Stops an active recording. The last final transcript segment
    /// overwrites the compose-box text, and when that leaves the box
    /// non-empty the clip goes out right away as an audio draft.
    pub async fn stop_recording(&mut self) -> Option<Draft> {
        let (recording, transcript) = self.recorder.stop().await?;

        if let Some(transcript) = transcript {
            self.text = transcript;
        }

        let text = self.text.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.text.clear();

        return Some(Draft {
            text,
            images: vec![],
            audio: Some(recording),
        });
    }

    fn notify_error(&self, text: &str) {
        let _ = self.tx.send(Event::Notice(Notice::error(text)));
    }
}

async fn read_image(path: &path::Path) -> Result<String> {
    let name = file_name(path);

    let format = match image::ImageFormat::from_path(path) {
        Ok(format) => format,
        Err(_) => bail!(format!("File {name} is not an image")),
    };

    let meta = fs::metadata(path)
        .await
        .map_err(|_| return anyhow!(format!("Error reading {name}")))?;
    if meta.len() > MAX_IMAGE_BYTES {
        bail!(format!("{name} must be less than 5MB"));
    }

    let bytes = fs::read(path)
        .await
        .map_err(|_| return anyhow!(format!("Error reading {name}")))?;

    return Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ));
}

fn file_name(path: &path::Path) -> String {
    return path
        .file_name()
        .map(|name| return name.to_string_lossy().to_string())
        .unwrap_or_else(|| return path.display().to_string());
}
