#[cfg(test)]
#[path = "transcriber_test.rs"]
mod tests;

use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::mpsc;

use crate::domain::models::Transcriber;
use crate::domain::models::TranscriptSegment;

const CANNED_TRANSCRIPTIONS: [&str; 4] = [
    "I'd like to order a new smartphone",
    "Can you show me the latest laptops?",
    "I need help finding a gift for my friend",
    "What are your best-selling products?",
];

/// Stand-in recognizer until real speech-to-text lands: after a short
/// listening delay it reports one canned phrase as a final segment.
#[derive(Default)]
pub struct CannedTranscriber {}

impl Transcriber for CannedTranscriber {
    fn listen(&self) -> mpsc::UnboundedReceiver<TranscriptSegment> {
        let (tx, rx) = mpsc::unbounded_channel::<TranscriptSegment>();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;

            let text = CANNED_TRANSCRIPTIONS
                .choose(&mut rand::thread_rng())
                .unwrap_or(&CANNED_TRANSCRIPTIONS[0])
                .to_string();

            let _ = tx.send(TranscriptSegment {
                text,
                is_final: true,
            });
        });

        return rx;
    }
}
