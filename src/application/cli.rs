use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::services::HistoryStore;

pub enum RunMode {
    Chat,
    Serve,
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if !config_file_path.parent().unwrap().exists() {
        fs::create_dir_all(config_file_path.parent().unwrap()).await?;
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    let config_path_display = config_file_path.as_os_str().to_str().unwrap();
    println!("Created default config file at {config_path_display}");
    return Ok(());
}

async fn print_history_list(store: &HistoryStore) {
    let messages = store.load().await;
    if messages.is_empty() {
        println!("There is no chat history yet. You should start your first conversation!");
        return;
    }

    for message in messages {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.role.to_string(),
            message.content.text()
        );
    }
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_history() -> Command {
    return Command::new("history")
        .about("Manage the persisted chat history.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the history directory path."))
        .subcommand(Command::new("list").about("List all persisted messages in order."))
        .subcommand(Command::new("clear").about("Delete the entire persisted history."));
}

fn arg_backend() -> Arg {
    return Arg::new(ConfigKey::Backend.to_string())
        .short('b')
        .long(ConfigKey::Backend.to_string())
        .env("SIDECART_BACKEND")
        .num_args(1)
        .help(format!(
            "The agent backend answering your messages. [default: {}]",
            Config::default(ConfigKey::Backend)
        ))
        .value_parser(PossibleValuesParser::new(BackendName::VARIANTS))
        .global(true);
}

fn arg_agent_url() -> Arg {
    return Arg::new(ConfigKey::AgentURL.to_string())
        .long(ConfigKey::AgentURL.to_string())
        .env("SIDECART_AGENT_URL")
        .num_args(1)
        .help(format!(
            "Agent API URL when using the agent backend. [default: {}]",
            Config::default(ConfigKey::AgentURL)
        ))
        .global(true);
}

fn arg_agent_timeout() -> Arg {
    return Arg::new(ConfigKey::AgentTimeout.to_string())
        .long(ConfigKey::AgentTimeout.to_string())
        .env("SIDECART_AGENT_TIMEOUT")
        .num_args(1)
        .help(format!(
            "Time to wait in milliseconds before an agent request is aborted. [default: {}]",
            Config::default(ConfigKey::AgentTimeout)
        ))
        .global(true);
}

fn arg_address() -> Arg {
    return Arg::new(ConfigKey::Address.to_string())
        .short('a')
        .long(ConfigKey::Address.to_string())
        .env("SIDECART_ADDRESS")
        .num_args(1)
        .help(format!(
            "Address the mock agent API server binds to. [default: {}]",
            Config::default(ConfigKey::Address)
        ))
        .global(true);
}

fn arg_history_dir() -> Arg {
    return Arg::new(ConfigKey::HistoryDir.to_string())
        .long(ConfigKey::HistoryDir.to_string())
        .env("SIDECART_HISTORY_DIR")
        .num_args(1)
        .help("Directory holding persisted chat history. Defaults to a directory in the user cache.")
        .global(true);
}

fn arg_clips_dir() -> Arg {
    return Arg::new(ConfigKey::ClipsDir.to_string())
        .long(ConfigKey::ClipsDir.to_string())
        .env("SIDECART_CLIPS_DIR")
        .num_args(1)
        .help("Directory holding saved voice clips. Defaults to a directory in the user cache.")
        .global(true);
}

fn arg_username() -> Arg {
    return Arg::new(ConfigKey::Username.to_string())
        .short('u')
        .long(ConfigKey::Username.to_string())
        .env("SIDECART_USERNAME")
        .num_args(1)
        .help("Your user name displayed next to your chat messages.")
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("sidecart")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about(
            "Start the interactive chat shell. This is the default when no subcommand is given.",
        ))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_history())
        .subcommand(Command::new("serve").about("Run the mock agent API server."))
        .arg(arg_backend())
        .arg(arg_agent_url())
        .arg(arg_agent_timeout())
        .arg(arg_address())
        .arg(arg_history_dir())
        .arg(arg_clips_dir())
        .arg(arg_username())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("SIDECART_CONFIG_FILE")
                .num_args(1)
                .help(format!(
                    "Path to configuration file [default: {}]",
                    Config::default(ConfigKey::ConfigFile)
                ))
                .global(true),
        );
}

pub async fn parse() -> Result<Option<RunMode>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        Some(("history", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let store = HistoryStore::new(path::PathBuf::from(Config::get(ConfigKey::HistoryDir)));

            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    println!("{}", store.store_dir.to_string_lossy());
                }
                Some(("list", _)) => {
                    print_history_list(&store).await;
                }
                Some(("clear", _)) => {
                    store.clear().await;
                    println!("Chat history cleared");
                }
                _ => {
                    subcommand_history().print_long_help()?;
                }
            }
            return Ok(None);
        }
        Some(("serve", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(RunMode::Serve));
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return Ok(Some(RunMode::Chat));
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
            return Ok(Some(RunMode::Chat));
        }
    }
}
