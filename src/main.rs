#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::path;
use std::process;

use anyhow::Error;
use anyhow::Result;
use tokio::sync::mpsc;

use crate::application::cli;
use crate::application::cli::RunMode;
use crate::application::server;
use crate::application::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::models::Event;
use crate::domain::services::Composer;
use crate::domain::services::HistoryStore;
use crate::domain::services::Recorder;
use crate::domain::services::SessionController;
use crate::infrastructure::audio::CannedTranscriber;
use crate::infrastructure::audio::SystemMicrophone;
use crate::infrastructure::backends::BackendManager;

fn handle_error(err: Error) {
    eprintln!(
        "Oh no! Sidecart has failed with the following app version and error.\n\nVersion: {}\nError: {}",
        env!("CARGO_PKG_VERSION"),
        err
    );

    process::exit(1);
}

async fn run_chat() -> Result<()> {
    let backend_name = BackendName::parse(Config::get(ConfigKey::Backend))?;
    let backend = BackendManager::get(backend_name);
    let history = HistoryStore::new(path::PathBuf::from(Config::get(ConfigKey::HistoryDir)));

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let recorder = Recorder::new(
        Box::<SystemMicrophone>::default(),
        Box::<CannedTranscriber>::default(),
        path::PathBuf::from(Config::get(ConfigKey::ClipsDir)),
        tx.clone(),
    );
    let composer = Composer::new(recorder, tx.clone());
    let session = SessionController::open(backend, history, tx).await;

    return ui::start(session, composer, rx).await;
}

#[tokio::main]
async fn main() {
    let debug_log_dir = env::var("SIDECART_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap()
            .join("sidecart")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("sidecart")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let mode = match cli::parse().await {
        Ok(Some(mode)) => mode,
        Ok(None) => {
            process::exit(0);
        }
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let res = match mode {
        RunMode::Serve => server::serve(&Config::get(ConfigKey::Address)).await,
        RunMode::Chat => run_chat().await,
    };

    if let Err(err) = res {
        handle_error(err);
    }

    process::exit(0);
}
