mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    ferry_gateway::state::build_http_client,
    ferry_ragflow::{KnowledgeBase, RagflowClient},
};

#[derive(Parser)]
#[command(name = "ferry", about = "Ferry: Feishu bot answering from a RAGFlow knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides the default search of ./ and ~/.config/ferry/).
    #[arg(long, global = true, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    // Gateway arguments (used when no subcommand is provided, or with `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Ask the knowledge base one question and print the result as JSON.
    Ask {
        /// The question to send.
        question: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn ask(config: ferry_config::FerryConfig, question: &str) -> anyhow::Result<()> {
    let http = build_http_client(&config.http)?;
    let result = RagflowClient::new(config.ragflow, http)
        .query(question)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let explicit = cli.config.as_deref();

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => {
            info!(version = env!("CARGO_PKG_VERSION"), "ferry starting");

            let mut config = ferry_config::load(explicit)?;

            // CLI args override config values
            if let Some(bind) = cli.bind {
                config.server.bind = bind;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }

            ferry_gateway::server::start_gateway(config).await
        },
        Some(Commands::Ask { question }) => ask(ferry_config::load(explicit)?, &question).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, explicit),
    }
}
