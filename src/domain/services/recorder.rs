#[cfg(test)]
#[path = "recorder_test.rs"]
mod tests;

use std::io::Cursor;
use std::path;
use std::time::Duration;

use anyhow::Result;
use hound::SampleFormat;
use hound::WavSpec;
use hound::WavWriter;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::domain::models::Event;
use crate::domain::models::MicrophoneBox;
use crate::domain::models::Notice;
use crate::domain::models::Recording;
use crate::domain::models::TranscriberBox;

/// Owns the microphone lifecycle for the compose box: exclusive acquisition,
/// chunk buffering, the parallel transcription listener, and the per-second
/// duration counter. Finished clips are WAV-encoded and saved under the clips
/// directory so messages can reference them after the buffer is gone.
pub struct Recorder {
    microphone: MicrophoneBox,
    transcriber: TranscriberBox,
    clips_dir: path::PathBuf,
    active: Option<ActiveRecording>,
    tx: mpsc::UnboundedSender<Event>,
}

struct ActiveRecording {
    collector: JoinHandle<(Vec<f32>, u32)>,
    stop: CancellationToken,
    ticker: JoinHandle<()>,
    listener: JoinHandle<()>,
    transcript: watch::Receiver<Option<String>>,
}

impl Recorder {
    pub fn new(
        microphone: MicrophoneBox,
        transcriber: TranscriberBox,
        clips_dir: path::PathBuf,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Recorder {
        return Recorder {
            microphone,
            transcriber,
            clips_dir,
            active: None,
            tx,
        };
    }

    pub fn is_recording(&self) -> bool {
        return self.active.is_some();
    }

    /// Returns true once a recording is running. Denied or missing devices
    /// are reported as a notice and leave the recorder idle.
    pub async fn start(&mut self) -> bool {
        if self.active.is_some() {
            return true;
        }

        let mut stream = match self.microphone.acquire().await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = ?err, "Unable to acquire the microphone");
                let _ = self
                    .tx
                    .send(Event::Notice(Notice::error("Could not access microphone")));
                return false;
            }
        };

        let stop = CancellationToken::new();
        let collector_stop = stop.clone();
        let sample_rate_hz = stream.sample_rate_hz;
        let collector = tokio::spawn(async move {
            let mut samples: Vec<f32> = vec![];
            loop {
                tokio::select! {
                    _ = collector_stop.cancelled() => break,
                    chunk = stream.samples.recv() => {
                        match chunk {
                            Some(chunk) => samples.extend(chunk),
                            None => break,
                        }
                    }
                }
            }

            // The stream drops here, handing the device back.
            drop(stream);
            return (samples, sample_rate_hz);
        });

        let ticker_tx = self.tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;

            let mut elapsed: u64 = 0;
            loop {
                interval.tick().await;
                elapsed += 1;
                if ticker_tx.send(Event::RecordingTick(elapsed)).is_err() {
                    break;
                }
            }
        });

        let (transcript_tx, transcript) = watch::channel::<Option<String>>(None);
        let mut segments = self.transcriber.listen();
        let listener_tx = self.tx.clone();
        let listener = tokio::spawn(async move {
            while let Some(segment) = segments.recv().await {
                if !segment.is_final {
                    continue;
                }

                let _ = listener_tx.send(Event::TranscriptFinal(segment.text.clone()));
                if transcript_tx.send(Some(segment.text)).is_err() {
                    break;
                }
            }
        });

        self.active = Some(ActiveRecording {
            collector,
            stop,
            ticker,
            listener,
            transcript,
        });

        return true;
    }

    /// Finalizes the chunk buffer into a WAV clip, releases the device, and
    /// returns the recording together with the last final transcript segment.
    /// Returns None when no recording was active.
    pub async fn stop(&mut self) -> Option<(Recording, Option<String>)> {
        let active = self.active.take()?;

        active.stop.cancel();
        active.ticker.abort();
        active.listener.abort();
        let _ = self.tx.send(Event::RecordingTick(0));

        let (samples, sample_rate_hz) = match active.collector.await {
            Ok(collected) => collected,
            Err(err) => {
                tracing::error!(error = ?err, "Recording collector failed");
                return None;
            }
        };

        let transcript = active.transcript.borrow().clone();

        let wav = match encode_wav(&samples, sample_rate_hz) {
            Ok(wav) => wav,
            Err(err) => {
                tracing::error!(error = ?err, "Unable to encode recording");
                return None;
            }
        };

        let duration_secs = samples.len() as u64 / u64::from(sample_rate_hz.max(1));
        let url = self.save_clip(&wav).await;

        return Some((
            Recording {
                wav,
                duration_secs,
                url,
            },
            transcript,
        ));
    }

    async fn save_clip(&self, wav: &[u8]) -> Option<String> {
        if !self.clips_dir.exists() {
            if let Err(err) = fs::create_dir_all(&self.clips_dir).await {
                tracing::warn!(error = ?err, "Unable to create the clips directory");
                return None;
            }
        }

        let clip_path = self.clips_dir.join(format!("{}.wav", Ulid::new()));
        let file_res = fs::File::create(&clip_path).await;
        let mut file = match file_res {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(error = ?err, "Unable to create clip file");
                return None;
            }
        };

        if let Err(err) = file.write_all(wav).await {
            tracing::warn!(error = ?err, "Unable to write clip file");
            return None;
        }

        return Some(clip_path.to_string_lossy().to_string());
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Navigating away mid-recording still hands the device back: the
        // cancelled collector drops the capture stream.
        if let Some(active) = self.active.take() {
            active.stop.cancel();
            active.ticker.abort();
            active.listener.abort();
        }
    }
}

fn encode_wav(samples: &[f32], sample_rate_hz: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;

    return Ok(cursor.into_inner());
}
