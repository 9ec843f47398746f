use std::path;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::domain::models::Content;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::NoticeLevel;
use crate::domain::services::Composer;
use crate::domain::services::SessionController;

fn print_help() {
    let text = r#"
COMMANDS:
- /attach FILE... - Stage up to 3 images to send with your next message.
- /images - List the staged images.
- /remove INDEX - Unstage the image at INDEX (starting at 1).
- /record - Start a voice recording. Stops are sent automatically when transcribed.
- /stop - Stop the active voice recording.
- /history - Print the current conversation.
- /new - Initialize a fresh session with the agent.
- /reset - Clear the conversation on both sides.
- /quit /exit (/q) - Exit the chat shell.
- /help (/h) - Provides this help menu.

Anything else you type is sent to the shopping assistant as a message.
        "#;

    println!("{}", text.trim());
}

fn print_message(message: &Message) {
    println!("{}: {}", message.role.to_string(), message.content.text());

    if let Content::Structured(reply) = &message.content {
        for bounding_box in &reply.bounding_boxes {
            let [x1, y1, x2, y2] = bounding_box.box_2d;
            println!("  - {} at [{x1}, {y1}, {x2}, {y2}]", bounding_box.label);
        }
    }

    if !message.images.is_empty() {
        println!("  ({} image(s) attached)", message.images.len());
    }

    if let Some(audio_url) = &message.audio_url {
        println!("  (voice clip: {audio_url})");
    }
}

fn render_event(event: Event) {
    match event {
        Event::MessageAppended(message) => print_message(&message),
        Event::Notice(notice) => match notice.level {
            NoticeLevel::Info => println!("* {}", notice.text),
            NoticeLevel::Error => eprintln!("! {}", notice.text),
        },
        Event::RecordingTick(secs) => {
            if secs > 0 {
                println!("● Recording {}:{:02}", secs / 60, secs % 60);
            }
        }
        Event::TranscriptFinal(text) => println!("(heard) {text}"),
    }
}

async fn handle_line(
    session: &mut SessionController,
    composer: &mut Composer,
    line: &str,
) -> bool {
    if line.is_empty() {
        return true;
    }

    if let Some(command) = line.strip_prefix('/') {
        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or_default() {
            "help" | "h" => print_help(),
            "new" => session.initialize().await,
            "reset" => session.reset().await,
            "attach" => {
                let paths = parts
                    .map(|part| return path::PathBuf::from(part))
                    .collect::<Vec<path::PathBuf>>();
                if paths.is_empty() {
                    println!("Usage: /attach FILE...");
                } else {
                    composer.attach_images(&paths).await;
                    println!("{} image(s) staged", composer.images().len());
                }
            }
            "images" => {
                if composer.images().is_empty() {
                    println!("No images staged.");
                }
                for (idx, image) in composer.images().iter().enumerate() {
                    let n = idx + 1;
                    println!("({n}) {} bytes", image.len());
                }
            }
            "remove" => {
                let index = parts.next().and_then(|raw| return raw.parse::<usize>().ok());
                match index {
                    Some(index) if index >= 1 => composer.remove_image(index - 1),
                    _ => println!("Usage: /remove INDEX"),
                }
            }
            "record" => {
                if composer.start_recording().await {
                    println!("Recording... use /stop to finish.");
                }
            }
            "stop" => {
                if let Some(draft) = composer.stop_recording().await {
                    session.send(draft).await;
                } else {
                    println!("Recording discarded, nothing to send.");
                }
            }
            "history" => {
                for message in session.messages() {
                    print_message(message);
                }
            }
            "quit" | "exit" | "q" => return false,
            other => println!("Unknown command /{other}. Type /help for commands."),
        }

        return true;
    }

    composer.set_text(line);
    if let Some(draft) = composer.draft() {
        session.send(draft).await;
    }

    return true;
}

pub async fn start(
    mut session: SessionController,
    mut composer: Composer,
    mut rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    println!("Connected to the shopping assistant. Type /help for commands.");

    session.initialize().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    // Final transcript segments overwrite the compose box, so
                    // stopping the recording sends what was heard.
                    Some(Event::TranscriptFinal(text)) => {
                        composer.set_text(&text);
                        println!("(heard) {text}");
                    }
                    Some(event) => render_event(event),
                    None => break,
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_line(&mut session, &mut composer, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    return Ok(());
}
