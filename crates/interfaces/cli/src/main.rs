mod interactive;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use threadbot_config::{AppConfig, Credentials};
use threadbot_core::ToolKind;
use threadbot_llm::OpenAiClient;
use threadbot_runtime::Session;
use threadbot_tools::ToolRegistry;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(
    name = "threadbot",
    version,
    about = "A chat assistant that asks before it uses a tool"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive chat session (default).
    Chat,
    /// Check configuration and credentials.
    Doctor,
    /// List the available tools.
    Tools,
    /// Write a configuration file with default values.
    ConfigInit {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let mut session = build_session(&config)?;
            session.new_thread();
            let export_dir = PathBuf::from(&config.export.dir);
            interactive::run_line_session(&mut session, &export_dir).await?;
        }
        Commands::Doctor => run_doctor(&config, &cli.config),
        Commands::Tools => {
            let registry = ToolRegistry::builtin(&config.tools)?;
            println!("── available tools ───────────────────────────────────");
            for spec in registry.list_specs() {
                let key = if spec.requires_api_key { "  (API key)" } else { "" };
                println!("  {:<12} {}{key}", spec.kind, spec.description);
                for param in &spec.params {
                    println!("      {}: {}", param.name, param.description);
                }
            }
        }
        Commands::ConfigInit { force } => {
            if cli.config.exists() && !force {
                println!(
                    "{} already exists; pass --force to overwrite",
                    cli.config.display()
                );
                return Ok(());
            }
            AppConfig::default().save_to(&cli.config)?;
            println!("wrote {}", cli.config.display());
        }
    }

    Ok(())
}

fn build_session(config: &AppConfig) -> Result<Session> {
    let api_key = config.require_llm_key()?;
    let model = OpenAiClient::new(
        &config.llm.base_url,
        api_key,
        &config.llm.model,
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    let registry = ToolRegistry::builtin(&config.tools)?;
    tracing::info!(model = model.model(), "chat session ready");
    Ok(Session::new(Arc::new(model), registry, config.credentials()))
}

fn run_doctor(config: &AppConfig, path: &Path) {
    let credentials = config.credentials();
    println!("threadbot doctor");
    println!(
        "- config file: {} ({})",
        path.display(),
        if path.exists() { "found" } else { "missing, using defaults" }
    );
    println!("- model: {}", config.llm.model);
    println!("- llm endpoint: {}", config.llm.base_url);
    println!(
        "- llm key: {}",
        if credentials.llm_api_key.is_some() { "set" } else { "missing" }
    );
    for kind in ToolKind::ALL {
        println!("- {kind} tool: {}", credential_status(&credentials, kind));
    }
    println!("- export dir: {}", config.export.dir);
    println!("- log level: {}", config.telemetry.log_level);
}

fn credential_status(credentials: &Credentials, kind: ToolKind) -> String {
    match (credentials.for_tool(kind), Credentials::source_hint(kind)) {
        (Some(_), _) => "key set".to_string(),
        (None, Some((env, field))) => format!("key missing (set {env} or {field})"),
        (None, None) => "no key needed".to_string(),
    }
}
