use std::any::Any;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::mpsc;

pub type MicrophoneBox = Box<dyn Microphone + Send + Sync>;
pub type TranscriberBox = Box<dyn Transcriber + Send + Sync>;

/// Mono f32 sample chunks flowing from an acquired input device. Dropping the
/// stream releases the device, no matter which path stopped the recording.
pub struct CaptureStream {
    pub samples: mpsc::UnboundedReceiver<Vec<f32>>,
    pub sample_rate_hz: u32,
    _release: Box<dyn Any + Send>,
}

impl CaptureStream {
    pub fn new(
        samples: mpsc::UnboundedReceiver<Vec<f32>>,
        sample_rate_hz: u32,
        release: Box<dyn Any + Send>,
    ) -> CaptureStream {
        return CaptureStream {
            samples,
            sample_rate_hz,
            _release: release,
        };
    }
}

#[async_trait]
pub trait Microphone {
    /// Acquires exclusive use of the input device. Fails when no device is
    /// present or it cannot be opened; only one acquisition may be live at a
    /// time.
    async fn acquire(&self) -> Result<CaptureStream>;
}

pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

pub trait Transcriber {
    /// Starts a recognition pass alongside a recording. Segments arrive on
    /// the returned channel until the listener is dropped. Final segments are
    /// meant to overwrite the compose-box text.
    fn listen(&self) -> mpsc::UnboundedReceiver<TranscriptSegment>;
}

/// A finished voice recording. `url` points at the saved clip on disk and is
/// never persisted with the message record.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    pub wav: Vec<u8>,
    pub duration_secs: u64,
    pub url: Option<String>,
}

impl Recording {
    pub fn to_base64(&self) -> String {
        return STANDARD.encode(&self.wav);
    }
}
