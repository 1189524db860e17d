// crates/entity-gate-cli/src/main.rs
// ============================================================================
// Module: Entity Gate CLI Entry Point
// Description: Command dispatcher for serving and configuration checks.
// Purpose: Wire config, providers, cache, and server into one process.
// Dependencies: clap, entity-gate-config, entity-gate-mcp, entity-gate-providers, tokio
// ============================================================================

//! ## Overview
//! The CLI assembles a running Entity Gate process: it loads and validates
//! configuration (TOML file plus `ENTITY_GATE_*` environment overrides),
//! constructs the HTTP providers, performs the fail-fast initial cache load,
//! spawns the background refresh task, and serves until interrupted.
//!
//! Audit events are written to stderr as JSON lines so deployments get an
//! operational log without further wiring.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use entity_gate_config::ConfigError;
use entity_gate_config::EntityGateConfig;
use entity_gate_core::AuthError;
use entity_gate_core::EntityFetcher;
use entity_gate_core::FetchError;
use entity_gate_core::IdentityVerifier;
use entity_gate_mcp::CacheService;
use entity_gate_mcp::EntitlementResolver;
use entity_gate_mcp::GateAuditEvent;
use entity_gate_mcp::GateAuditSink;
use entity_gate_mcp::GateServer;
use entity_gate_mcp::NoopMetrics;
use entity_gate_mcp::ServerError;
use entity_gate_mcp::ServerState;
use entity_gate_mcp::ToolAuthz;
use entity_gate_mcp::ToolRouter;
use entity_gate_mcp::auth::RejectAllVerifier;
use entity_gate_providers::HttpEntityFetcher;
use entity_gate_providers::HttpFetcherConfig;
use entity_gate_providers::HttpIdentityVerifier;
use entity_gate_providers::HttpVerifierConfig;
use thiserror::Error;
use tokio::sync::watch;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted size of a config file.
const MAX_CONFIG_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "entity-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Entity Gate server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the serve command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load, overlay, and validate configuration without serving.
    Validate {
        /// Path to a TOML config file; defaults apply when omitted.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure modes of CLI execution.
#[derive(Debug, Error)]
enum CliError {
    /// Config file could not be read.
    #[error("config read failed: {0}")]
    ConfigRead(String),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Identity provider construction failed.
    #[error("identity provider setup failed: {0}")]
    Identity(AuthError),
    /// Initial cache load failed.
    #[error("initial cache load failed: {0}")]
    InitialLoad(#[from] FetchError),
    /// Server startup or serving failed.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// Async runtime construction failed.
    #[error("runtime setup failed: {0}")]
    Runtime(std::io::Error),
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink writing one JSON line per event to stderr.
struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "stderr is the CLI audit destination")]
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            eprintln!("{line}");
        }
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[allow(clippy::print_stderr, reason = "fatal errors are reported on stderr")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("entity-gate: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Serve(command) => run_serve(&command),
        Commands::Config {
            command: ConfigCommand::Validate {
                config,
            },
        } => run_config_validate(config.as_deref()),
    }
}

// ============================================================================
// SECTION: Config Loading
// ============================================================================

/// Loads, overlays, and validates configuration.
fn load_config(path: Option<&Path>) -> Result<EntityGateConfig, CliError> {
    let mut config = match path {
        Some(path) => {
            let metadata =
                fs::metadata(path).map_err(|err| CliError::ConfigRead(err.to_string()))?;
            if metadata.len() > MAX_CONFIG_BYTES {
                return Err(CliError::ConfigRead("config file too large".to_string()));
            }
            let text =
                fs::read_to_string(path).map_err(|err| CliError::ConfigRead(err.to_string()))?;
            EntityGateConfig::from_toml_str(&text)?
        }
        None => EntityGateConfig::default(),
    };
    let overrides = std::env::vars().collect::<BTreeMap<String, String>>();
    config.apply_overrides(&overrides)?;
    config.validate()?;
    Ok(config)
}

/// Validates configuration and reports the outcome.
#[allow(clippy::print_stdout, reason = "validation verdict is the command output")]
fn run_config_validate(path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(path)?;
    println!(
        "configuration valid (downstream: {}, identity: {})",
        if config.downstream.is_some() { "configured" } else { "absent" },
        if config.identity.is_some() { "configured" } else { "absent" },
    );
    Ok(())
}

// ============================================================================
// SECTION: Serve
// ============================================================================

/// Runs the serve command on a fresh multi-thread runtime.
fn run_serve(command: &ServeCommand) -> Result<(), CliError> {
    let config = load_config(command.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(serve(config))
}

/// Assembles and runs the server until interrupted.
async fn serve(config: EntityGateConfig) -> Result<(), CliError> {
    let audit: Arc<dyn GateAuditSink> = Arc::new(StderrAuditSink);

    let fetcher = config
        .downstream
        .as_ref()
        .map(|downstream| {
            HttpEntityFetcher::new(&HttpFetcherConfig {
                base_url: downstream.base_url.clone(),
                timeout_ms: downstream.timeout_ms,
                max_response_bytes: downstream.max_response_bytes,
                user_agent: downstream.user_agent.clone(),
            })
            .map(|fetcher| Arc::new(fetcher) as Arc<dyn EntityFetcher>)
        })
        .transpose()?;
    let verifier: Arc<dyn IdentityVerifier> = match &config.identity {
        Some(identity) => Arc::new(
            HttpIdentityVerifier::new(&HttpVerifierConfig {
                userinfo_url: identity.userinfo_url.clone(),
                timeout_ms: identity.timeout_ms,
            })
            .map_err(CliError::Identity)?,
        ),
        None => Arc::new(RejectAllVerifier),
    };

    // Fail-fast eager load: a broken downstream stops startup here.
    let cache = Arc::new(
        CacheService::initialize(fetcher, config.cache.ttl_seconds, Arc::clone(&audit)).await?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_task = cache.spawn_refresh_task(shutdown_rx.clone());

    let resolver = Arc::new(EntitlementResolver::new(verifier, Arc::clone(&audit)));
    let router = ToolRouter::new(
        Arc::clone(&cache),
        resolver,
        ToolAuthz::from_config(&config.tools),
        Arc::clone(&audit),
    );
    let state = Arc::new(ServerState::new(router, Arc::clone(&cache), Arc::new(NoopMetrics)));
    let bind_addr = config
        .server
        .bind_addr
        .parse::<SocketAddr>()
        .map_err(|err| ConfigError::Invalid(format!("server.bind_addr: {err}")))?;

    let interrupt_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let served = GateServer::new(state, bind_addr).serve(shutdown_rx).await;
    let _ = shutdown_tx.send(true);
    let _ = refresh_task.await;
    served.map_err(CliError::from)
}
