#[cfg(test)]
#[path = "microphone_test.rs"]
mod tests;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use cpal::traits::DeviceTrait;
use cpal::traits::HostTrait;
use cpal::traits::StreamTrait;
use cpal::SampleFormat;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::domain::models::CaptureStream;
use crate::domain::models::Microphone;

/// The default system microphone. cpal streams are not Send, so each
/// acquisition parks its stream on a dedicated thread; dropping the capture
/// guard disconnects that thread's stop channel, which drops the stream and
/// releases the device.
#[derive(Default)]
pub struct SystemMicrophone {}

struct ReleaseGuard {
    _stop: std::sync::mpsc::Sender<()>,
}

#[async_trait]
impl Microphone for SystemMicrophone {
    async fn acquire(&self) -> Result<CaptureStream> {
        let (sample_tx, sample_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        std::thread::spawn(move || {
            match build_input_stream(sample_tx) {
                Ok((stream, sample_rate_hz)) => {
                    if ready_tx.send(Ok(sample_rate_hz)).is_err() {
                        return;
                    }

                    // Parked until the guard drops and the channel hangs up.
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            }
        });

        let sample_rate_hz = ready_rx
            .await
            .map_err(|_| return anyhow!("microphone thread exited before it was ready"))??;

        return Ok(CaptureStream::new(
            sample_rx,
            sample_rate_hz,
            Box::new(ReleaseGuard { _stop: stop_tx }),
        ));
    }
}

fn stream_error(err: cpal::StreamError) {
    tracing::error!(error = ?err, "Microphone stream error");
}

fn build_input_stream(
    sample_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| return anyhow!("no input microphone is available"))?;

    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let sample_rate_hz = stream_config.sample_rate.0;
    let channels = usize::from(stream_config.channels.max(1));

    let stream = match sample_format {
        SampleFormat::F32 => {
            let tx = sample_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let _ = tx.send(fold_to_mono(data, channels));
                },
                stream_error,
                None,
            )?
        }
        SampleFormat::I16 => {
            let tx = sample_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let scaled = data
                        .iter()
                        .map(|sample| return f32::from(*sample) / f32::from(i16::MAX))
                        .collect::<Vec<f32>>();
                    let _ = tx.send(fold_to_mono(&scaled, channels));
                },
                stream_error,
                None,
            )?
        }
        SampleFormat::U16 => {
            let tx = sample_tx.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _| {
                    let scaled = data
                        .iter()
                        .map(|sample| {
                            return (f32::from(*sample) / f32::from(u16::MAX)) * 2.0 - 1.0;
                        })
                        .collect::<Vec<f32>>();
                    let _ = tx.send(fold_to_mono(&scaled, channels));
                },
                stream_error,
                None,
            )?
        }
        _ => bail!(format!("unsupported input sample format: {sample_format:?}")),
    };

    stream.play()?;

    return Ok((stream, sample_rate_hz));
}

fn fold_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }

    let mut mono = Vec::with_capacity(data.len() / channels);
    for frame in data.chunks_exact(channels) {
        mono.push(frame.iter().sum::<f32>() / channels as f32);
    }

    return mono;
}
