use anyhow::Result;
use clap::{Parser, Subcommand};
use openai_widgets::config::{Overrides, Settings};
use openai_widgets::plugin::{HostContext, Plugin, PluginManifest};
use openai_widgets::session::RollbackPolicy;
use openai_widgets::transport::ReqwestTransport;
use openai_widgets::ui::{status_view, TerminalUI};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openai-widgets")]
#[command(about = "OpenAI status monitor and chat client", version)]
struct Cli {
    /// API key (overrides OPENAI_API_KEY)
    #[arg(short, long)]
    key: Option<String>,

    /// Model to chat with (overrides OPENAI_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum tokens per reply (overrides OPENAI_MAX_TOKENS)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature, 0 to 2 (overrides OPENAI_TEMPERATURE)
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Greeting shown at the top of the chat (overrides OPENAI_GREETING)
    #[arg(short, long)]
    greeting: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat {
        /// Refuse to send until the key has been validated
        #[arg(long, default_value_t = false)]
        require_validation: bool,
        /// Drop the unanswered user turn when a send fails
        #[arg(long, default_value_t = false)]
        revert_on_failure: bool,
    },
    /// Check API reachability and key validity
    Status {
        /// Keep checking on the refresh interval
        #[arg(short, long, default_value_t = false)]
        watch: bool,
        /// Refresh interval in seconds (overrides OPENAI_STATUS_REFRESH_SECS)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// List selectable chat models
    Models,
    /// Print the plugin manifest as JSON
    Manifest,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let command = cli.command.unwrap_or(Commands::Chat {
        require_validation: false,
        revert_on_failure: false,
    });
    let refresh_secs = match &command {
        Commands::Status { interval, .. } => *interval,
        _ => None,
    };
    let settings = Settings::from_env()?.with_overrides(Overrides {
        api_key: cli.key,
        model: cli.model,
        max_tokens: cli.max_tokens,
        temperature: cli.temperature,
        greeting: cli.greeting,
        refresh_secs,
    })?;

    let transport = Arc::new(ReqwestTransport::new());
    let mut host = HostContext::new(transport, settings);

    match command {
        Commands::Chat {
            require_validation,
            revert_on_failure,
        } => {
            host.require_validated_key = require_validation;
            if revert_on_failure {
                host.rollback = RollbackPolicy::RevertTranscript;
            }
            let mut ui = TerminalUI::new(Plugin::init(host))?;
            ui.run().await?;
        }
        Commands::Status { watch, .. } => {
            let plugin = Plugin::init(host);
            if watch {
                plugin
                    .status
                    .watch(plugin.refresh_interval, |snapshot| {
                        println!("{}", status_view::render(snapshot));
                        true
                    })
                    .await;
            } else {
                if plugin.status.check().await.is_none() {
                    anyhow::bail!("no API key: set OPENAI_API_KEY or pass --key");
                }
                println!("{}", status_view::render(&plugin.status.snapshot()));
            }
        }
        Commands::Models => {
            let plugin = Plugin::init(host);
            plugin.chat.validate_key().await;
            let snapshot = plugin.chat.snapshot();
            if let Some(error) = &snapshot.error {
                eprintln!("Using built-in model list: {}", error);
            }
            for option in &snapshot.model_options {
                println!("{:<24} {}", option.value, option.label);
            }
        }
        Commands::Manifest => {
            println!("{}", serde_json::to_string_pretty(&PluginManifest::new())?);
        }
    }

    Ok(())
}
