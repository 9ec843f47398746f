use std::path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use test_utils::png_fixture;
use test_utils::transcription_fixture;
use tokio::fs;
use tokio::sync::mpsc;

use super::Composer;
use super::Recorder;
use crate::domain::models::CaptureStream;
use crate::domain::models::Event;
use crate::domain::models::Microphone;
use crate::domain::models::NoticeLevel;
use crate::domain::models::PayloadKind;
use crate::domain::models::Transcriber;
use crate::domain::models::TranscriptSegment;

struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct FakeMicrophone {
    released: Arc<AtomicBool>,
    denied: bool,
}

impl FakeMicrophone {
    fn live() -> FakeMicrophone {
        return FakeMicrophone {
            released: Arc::new(AtomicBool::new(false)),
            denied: false,
        };
    }
}

#[async_trait]
impl Microphone for FakeMicrophone {
    async fn acquire(&self) -> Result<CaptureStream> {
        if self.denied {
            bail!("microphone access denied");
        }

        let (tx, rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let _ = tx.send(vec![0.25_f32; 16_000]);

        return Ok(CaptureStream::new(
            rx,
            16_000,
            Box::new(ReleaseFlag(self.released.clone())),
        ));
    }
}

struct FakeTranscriber {
    transcript: Option<String>,
}

impl Transcriber for FakeTranscriber {
    fn listen(&self) -> mpsc::UnboundedReceiver<TranscriptSegment> {
        let (tx, rx) = mpsc::unbounded_channel::<TranscriptSegment>();
        if let Some(text) = &self.transcript {
            let _ = tx.send(TranscriptSegment {
                text: text.clone(),
                is_final: true,
            });
        }

        return rx;
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    composer: Composer,
    rx: mpsc::UnboundedReceiver<Event>,
}

fn fixture(transcript: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let recorder = Recorder::new(
        Box::new(FakeMicrophone::live()),
        Box::new(FakeTranscriber {
            transcript: transcript.map(|text| return text.to_string()),
        }),
        dir.path().join("clips"),
        tx.clone(),
    );

    return Fixture {
        dir,
        composer: Composer::new(recorder, tx),
        rx,
    };
}

impl Fixture {
    async fn png(&self, name: &str) -> path::PathBuf {
        let file_path = self.dir.path().join(name);
        fs::write(&file_path, png_fixture()).await.unwrap();

        return file_path;
    }

    fn error_notices(&mut self) -> Vec<String> {
        let mut found = vec![];
        while let Ok(event) = self.rx.try_recv() {
            if let Event::Notice(notice) = event {
                if notice.level == NoticeLevel::Error {
                    found.push(notice.text);
                }
            }
        }

        return found;
    }
}

#[tokio::test]
async fn it_encodes_accepted_images_as_data_urls() {
    let mut f = fixture(None);
    let first = f.png("first.png").await;

    f.composer.attach_images(&[first]).await;

    assert_eq!(f.composer.images().len(), 1);
    assert!(f.composer.images()[0].starts_with("data:image/png;base64,"));
    assert!(f.error_notices().is_empty());
}

#[tokio::test]
async fn it_rejects_batches_over_the_image_limit() {
    let mut f = fixture(None);
    let staged = vec![f.png("one.png").await, f.png("two.png").await];
    f.composer.attach_images(&staged).await;
    assert_eq!(f.composer.images().len(), 2);

    // Two staged plus two more overflows the limit of three: the whole new
    // batch is refused, nothing is partially accepted.
    let overflow = vec![f.png("three.png").await, f.png("four.png").await];
    f.composer.attach_images(&overflow).await;

    assert_eq!(f.composer.images().len(), 2);
    assert_eq!(f.error_notices(), vec!["Maximum 3 images allowed".to_string()]);
}

#[tokio::test]
async fn it_skips_invalid_files_and_keeps_the_rest() {
    let mut f = fixture(None);
    let good = f.png("good.png").await;

    let not_an_image = f.dir.path().join("notes.txt");
    fs::write(&not_an_image, "hello").await.unwrap();

    let oversized = f.dir.path().join("huge.jpg");
    fs::write(&oversized, vec![0_u8; 6 * 1024 * 1024]).await.unwrap();

    f.composer
        .attach_images(&[good, not_an_image, oversized])
        .await;

    assert_eq!(f.composer.images().len(), 1);

    let notices = f.error_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.contains(&"File notes.txt is not an image".to_string()));
    assert!(notices.contains(&"huge.jpg must be less than 5MB".to_string()));
}

#[tokio::test]
async fn it_reports_missing_files_without_aborting_the_batch() {
    let mut f = fixture(None);
    let good = f.png("good.png").await;
    let missing = f.dir.path().join("missing.png");

    f.composer.attach_images(&[missing, good]).await;

    assert_eq!(f.composer.images().len(), 1);
    assert_eq!(
        f.error_notices(),
        vec!["Error reading missing.png".to_string()]
    );
}

#[tokio::test]
async fn it_requires_content_before_drafting() {
    let mut f = fixture(None);

    assert!(f.composer.draft().is_none());

    f.composer.set_text("   \n ");
    assert!(f.composer.draft().is_none());
}

#[tokio::test]
async fn it_drains_text_and_images_into_the_draft() {
    let mut f = fixture(None);
    let image = f.png("one.png").await;
    f.composer.attach_images(&[image]).await;
    f.composer.set_text("  what is this?  ");

    let draft = f.composer.draft().unwrap();
    assert_eq!(draft.text, "what is this?");
    assert_eq!(draft.images.len(), 1);
    assert_eq!(draft.kind(), PayloadKind::Image);

    assert!(f.composer.text().is_empty());
    assert!(f.composer.images().is_empty());
    assert!(f.composer.draft().is_none());
}

#[tokio::test]
async fn it_removes_staged_images() {
    let mut f = fixture(None);
    let staged = vec![f.png("one.png").await, f.png("two.png").await];
    f.composer.attach_images(&staged).await;

    f.composer.remove_image(0);
    assert_eq!(f.composer.images().len(), 1);

    f.composer.remove_image(5);
    assert_eq!(f.composer.images().len(), 1);
}

#[tokio::test]
async fn it_blocks_recording_while_images_are_staged() {
    let mut f = fixture(None);
    let image = f.png("one.png").await;
    f.composer.attach_images(&[image]).await;

    assert!(!f.composer.start_recording().await);
    assert!(!f.composer.is_recording());
    assert_eq!(
        f.error_notices(),
        vec!["Remove attached images before recording".to_string()]
    );
}

#[tokio::test]
async fn it_blocks_attachments_while_recording() {
    let mut f = fixture(None);
    assert!(f.composer.start_recording().await);

    let image = f.png("one.png").await;
    f.composer.attach_images(&[image]).await;

    assert!(f.composer.images().is_empty());
    assert_eq!(
        f.error_notices(),
        vec!["Stop recording before attaching images".to_string()]
    );

    let _ = f.composer.stop_recording().await;
}

#[tokio::test]
async fn it_sends_transcribed_audio_on_stop() {
    let mut f = fixture(Some(transcription_fixture()));

    assert!(f.composer.start_recording().await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let draft = f.composer.stop_recording().await.unwrap();
    assert_eq!(draft.text, transcription_fixture());
    assert_eq!(draft.kind(), PayloadKind::Audio);
    assert!(draft.audio.is_some());
    assert!(f.composer.text().is_empty());
}

#[tokio::test]
async fn it_discards_recordings_without_text() {
    let mut f = fixture(None);

    f.composer.start_recording().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(f.composer.stop_recording().await.is_none());
    assert!(!f.composer.is_recording());
}
