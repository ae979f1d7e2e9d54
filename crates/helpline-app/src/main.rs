//! Helpline application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Load the response catalog and the classifier dataset
//! 3. Open the conversation store and build the dialogue engine
//! 4. Serve the HTTP API, answer a single message, or replay the demo script

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use helpline_api::state::AppState;
use helpline_core::config::{default_config_path, HelplineConfig};
use helpline_core::error::HelplineError;
use helpline_dialogue::{DialogueEngine, PatternClassifier, ReplyPolicy, ResponseCatalog};
use helpline_storage::{ConversationStore, JsonFileStore, MemoryStore};

/// Messages replayed by `helpline demo`.
const DEMO_MESSAGES: [&str; 3] = [
    "My internet is very slow today",
    "It's not connecting at all now",
    "Also, I can't check my balance",
];

#[derive(Debug, Parser)]
#[command(name = "helpline", version, about = "Intent-routed support chatbot")]
struct Cli {
    /// Config file (defaults to $HELPLINE_CONFIG or ~/.helpline/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep conversation state in memory only.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Port on 127.0.0.1 (overrides general.port).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer one message and print the reply.
    Ask {
        #[arg(long, default_value = "user1")]
        user: String,
        /// Confidence threshold for this turn only.
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Replay a short scripted conversation.
    Demo {
        #[arg(long, default_value = "user123")]
        user: String,
    },
    /// Write the default configuration to the config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Write defaults to `path`, refusing to clobber an existing file unless `force`.
fn write_default_config(path: &Path, force: bool) -> Result<(), HelplineError> {
    if path.exists() && !force {
        return Err(HelplineError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    HelplineConfig::default().save(path)
}

/// Wire catalog, classifier, store and policy into an engine.
fn build_engine(config: &HelplineConfig, ephemeral: bool) -> Result<DialogueEngine, HelplineError> {
    let catalog = ResponseCatalog::load(&config.catalog_path())?;
    let classifier =
        PatternClassifier::load(&config.dataset_path(), config.classifier.min_token_len)?;

    let store: Box<dyn ConversationStore> = if ephemeral {
        tracing::info!("Conversation state kept in memory only");
        Box::new(MemoryStore::new())
    } else {
        let path = config.store_path();
        tracing::info!(path = %path.display(), "Conversation state file");
        Box::new(JsonFileStore::new(path))
    };

    let engine = DialogueEngine::new(
        Box::new(classifier),
        catalog,
        store,
        ReplyPolicy::from(&config.dialogue),
        DialogueEngine::rng_from_seed(config.dialogue.rng_seed),
    )?;

    for label in engine.uncovered_labels() {
        tracing::warn!(label = %label, "Classifier label has no catalog entry");
    }

    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_file = cli.config.clone().unwrap_or_else(default_config_path);
    let level =
        HelplineConfig::peek_log_level(&config_file).unwrap_or_else(|| "info".to_string());
    init_tracing(&level);

    tracing::info!("Starting Helpline v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Init { force } = cli.command {
        write_default_config(&config_file, force)?;
        println!("Wrote {}", config_file.display());
        return Ok(());
    }

    let config = HelplineConfig::load_or_default(&config_file);
    let mut engine = build_engine(&config, cli.ephemeral)?;

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.general.port);
            helpline_api::start_server(AppState::new(engine, port)).await?;
        }
        Command::Ask {
            user,
            threshold,
            message,
        } => {
            let text = message.join(" ");
            let threshold = threshold.unwrap_or(config.dialogue.confidence_threshold);
            let reply = engine.reply_with_threshold(&user, &text, threshold)?;
            println!("{}", reply);
        }
        Command::Demo { user } => {
            for message in DEMO_MESSAGES {
                let reply = engine.reply(&user, message)?;
                println!("User: {}", message);
                println!("Bot: {}", reply);
                println!("{}", "-".repeat(50));
            }
        }
        Command::Init { .. } => {}
    }

    Ok(())
}
