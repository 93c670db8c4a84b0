use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{MentorConfig, ProviderConfig};
use console::ConsoleTransport;
use mentor_core::providers::{LlmProvider, ModelRouter, OpenAiCompatProvider};
use mentor_core::{
    ChatTransport, CredentialSource, EnvCredentials, MessageKind, Orchestrator, OutgoingMessage,
    ProviderInvocation, StaticCredentials, TurnOutcome, TurnReply, require_api_key,
};
use mentor_core::orchestrator::ERROR_PREFIX;

#[derive(Parser)]
#[command(name = "mentor")]
#[command(version)]
#[command(about = "Career mentor chat with triage, career and job agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable info logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation (default)
    Chat,

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,
    },

    /// List registered agents and their trigger phrases
    Agents,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before anything reads the environment
    dotenv::dotenv().ok();

    // Set up logging
    let filter = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&cli.config).await,
        Commands::Ask { message } => cmd_ask(&cli.config, &message).await,
        Commands::Agents => cmd_agents(&cli.config).await,
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Mentor initialized at {}", config_dir.display());
    println!(
        "Set GEMINI_API_KEY in your environment or a .env file, then edit {} to adjust agents.",
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = MentorConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_agents(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = MentorConfig::load(config_path)?;
    let registry = cfg.build_registry()?;

    for agent in registry.iter() {
        let marker = if agent.name == registry.entry_agent_name() {
            " (entry)"
        } else {
            ""
        };
        println!("{}{}", agent.name, marker);
        if agent.triggers.is_empty() {
            println!("  triggers: none");
        } else {
            println!("  triggers: {}", agent.triggers.join(", "));
        }
        if !agent.capabilities.is_empty() {
            let tools: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
            println!("  capabilities: {}", tools.join(", "));
        }
    }
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let cfg = MentorConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&cfg)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    orchestrator.start_conversation(&session_id).await;
    let reply = orchestrator.handle_turn(&session_id, message).await;
    orchestrator.end_conversation(&session_id).await;

    println!("{}", ask_output(reply)?);
    Ok(())
}

/// Reply text of a one-shot turn; a failed turn becomes the command's error
fn ask_output(reply: TurnReply) -> Result<String> {
    match reply.outcome {
        TurnOutcome::Failed => {
            let detail = reply
                .content
                .strip_prefix(ERROR_PREFIX)
                .unwrap_or(&reply.content);
            Err(anyhow!("{}", detail))
        }
        TurnOutcome::Responded | TurnOutcome::Transferred { .. } => Ok(reply.content),
    }
}

async fn cmd_chat(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = MentorConfig::load(config_path)?;
    let orchestrator = build_orchestrator(&cfg)?;
    let transport = ConsoleTransport::stdout();
    let author = orchestrator.config().author.clone();

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            cancel_on_signal.cancel();
        }
    });

    let session_id = uuid::Uuid::new_v4().to_string();
    let greeting = orchestrator.start_conversation(&session_id).await;
    transport
        .send(OutgoingMessage::new(greeting, author, MessageKind::Response))
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };

        // EOF
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = tokio::select! {
            _ = cancel.cancelled() => break,
            reply = orchestrator.deliver_turn(&transport, &session_id, text) => reply?,
        };
        debug!("Turn finished: {:?}", reply.outcome);
    }

    orchestrator.end_conversation(&session_id).await;
    println!();
    println!("Goodbye.");
    Ok(())
}

/// Wire the routing core from config. Every failure here happens before the
/// first message is accepted.
fn build_orchestrator(cfg: &MentorConfig) -> Result<Orchestrator> {
    let api_key = require_api_key(credential_source(&cfg.provider).as_ref())?;
    let primary = build_provider(&cfg.provider, api_key)?;

    let mut providers: Vec<Box<dyn LlmProvider>> = vec![primary];
    for fallback in &cfg.fallback_providers {
        let key = fallback.api_key.trim();
        if key.is_empty() || key.contains("${") {
            warn!("Skipping fallback provider '{}': API key is not set", fallback.name);
            continue;
        }
        providers.push(build_provider(fallback, key.to_string())?);
    }
    let router = if providers.len() == 1 {
        ModelRouter::single(providers.remove(0))
    } else {
        ModelRouter::with_failover(providers)?
    };
    let invocation = ProviderInvocation::new(router);
    info!("Model provider ready (model: {})", invocation.model());

    let registry = Arc::new(cfg.build_registry()?);
    Ok(Orchestrator::new(registry, Arc::new(invocation)).with_config(cfg.orchestrator_config()))
}

/// Key from the config file once expanded, else the `GEMINI_API_KEY` variable
fn credential_source(provider: &ProviderConfig) -> Box<dyn CredentialSource> {
    let key = provider.api_key.trim();
    if key.is_empty() || key.contains("${") {
        Box::new(EnvCredentials::default())
    } else {
        Box::new(StaticCredentials::new(
            format!("api_key of provider '{}'", provider.name),
            key,
        ))
    }
}

fn build_provider(provider: &ProviderConfig, api_key: String) -> Result<Box<dyn LlmProvider>> {
    let client = OpenAiCompatProvider::new(
        provider.name.clone(),
        api_key,
        provider.model.clone(),
        provider.base_url.clone(),
        provider.max_tokens,
    )?;
    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_key: &str) -> ProviderConfig {
        let mut provider = toml::from_str::<MentorConfig>("[provider]\n").unwrap().provider;
        provider.api_key = api_key.to_string();
        provider
    }

    #[test]
    fn test_cli_defaults_to_chat() {
        let cli = Cli::parse_from(["mentor"]);
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::parse_from(["mentor", "--debug", "ask", "find career"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Some(Commands::Ask { message }) if message == "find career"));
    }

    #[test]
    fn test_ask_output_failed_turn_is_error() {
        let failed = TurnReply {
            content: "Error: status 429 quota exceeded".to_string(),
            outcome: TurnOutcome::Failed,
        };
        let err = ask_output(failed).unwrap_err();
        assert_eq!(err.to_string(), "status 429 quota exceeded");
    }

    #[test]
    fn test_ask_output_passes_replies_through() {
        let answered = TurnReply {
            content: "Try data engineering.".to_string(),
            outcome: TurnOutcome::Responded,
        };
        assert_eq!(ask_output(answered).unwrap(), "Try data engineering.");

        let moved = TurnReply {
            content: "Handing off to Job Agent".to_string(),
            outcome: TurnOutcome::Transferred {
                from: "Triage Agent".to_string(),
                to: "Job Agent".to_string(),
            },
        };
        assert!(ask_output(moved).is_ok());
    }

    #[test]
    fn test_credential_source_prefers_config_key() {
        let source = credential_source(&provider("AIzaSyConfiguredKey"));
        assert_eq!(require_api_key(source.as_ref()).unwrap(), "AIzaSyConfiguredKey");
        assert!(source.describe().contains("gemini"));
    }

    #[test]
    fn test_credential_source_unexpanded_falls_back_to_env() {
        let source = credential_source(&provider("${NOT_ALLOWED}"));
        assert!(source.describe().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_build_orchestrator_with_key() {
        let mut cfg: MentorConfig = toml::from_str("[provider]\n").unwrap();
        cfg.provider.api_key = "AIzaSyConfiguredKey".to_string();
        let orchestrator = build_orchestrator(&cfg).unwrap();
        assert_eq!(orchestrator.registry().len(), 3);
        assert_eq!(orchestrator.registry().entry_agent_name(), "Triage Agent");
    }

    #[test]
    fn test_build_orchestrator_rejects_duplicate_agents() {
        let toml = r#"
            [provider]
            api_key = "AIzaSyConfiguredKey"
            [[agents]]
            name = "Job Agent"
            [[agents]]
            name = "Job Agent"
        "#;
        let cfg: MentorConfig = toml::from_str(toml).unwrap();
        let err = build_orchestrator(&cfg).err().expect("expected duplicate-agent error");
        assert!(err.to_string().contains("already registered"));
    }
}
