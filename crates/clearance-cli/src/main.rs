// crates/clearance-cli/src/main.rs
// ============================================================================
// Module: Portal Clearance CLI Entry Point
// Description: Command dispatcher for serving, seeding, and diagnostics.
// Purpose: Provide the operator surface for the clearance service.
// Dependencies: clap, clearance-config, clearance-server, tokio
// ============================================================================

//! ## Overview
//! `portal-clearance` loads `clearance.toml` the same way for every command.
//! Blocking work (store access, server setup) runs on Tokio's blocking pool.
//! Output goes through explicit stdout/stderr writers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clearance_cli::serve_policy::BindOutcome;
use clearance_cli::serve_policy::enforce_local_only;
use clearance_cli::serve_policy::resolve_allow_non_loopback;
use clearance_config::ClearanceConfig;
use clearance_config::DirectoryBackend;
use clearance_config::config_toml_example;
use clearance_core::TokenShape;
use clearance_server::ClearanceServer;
use clearance_server::ClearanceService;
use clearance_server::DirectoryHandle;
use clearance_server::ResourceCatalog;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "portal-clearance", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the portal HTTP server.
    Serve(ServeCommand),
    /// Write the standard groups and demo subjects into the directory.
    Seed(SeedCommand),
    /// Print the clearance computed for a subject token.
    Check(CheckCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to clearance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Allow binding to non-loopback addresses.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

/// Arguments for `seed`.
#[derive(Args, Debug)]
struct SeedCommand {
    /// Optional config file path (defaults to clearance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Also write the demo catalog to `[catalog] path`.
    #[arg(long, action = ArgAction::SetTrue)]
    catalog: bool,
    /// Overwrite an existing catalog file.
    #[arg(long, action = ArgAction::SetTrue)]
    force: bool,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Subject token (username or subject id); omit for an anonymous check.
    #[arg(value_name = "TOKEN")]
    token: Option<String>,
    /// Optional config file path (defaults to clearance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
    /// Print a complete example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to clearance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Seed(command) => command_seed(command).await,
        Commands::Check(command) => command_check(command).await,
        Commands::Config { command } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    let allow_non_loopback = resolve_allow_non_loopback(command.allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    let outcome = enforce_local_only(&config, allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    if outcome.network_exposed {
        warn_network_exposure(&outcome)?;
    }

    let server = tokio::task::spawn_blocking(move || ClearanceServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!(
        "portal-clearance listening on http://{} ({} directory)",
        server.bind_addr(),
        server.directory().backend().as_str()
    ))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Warns that caller-asserted identities are reachable from the network.
fn warn_network_exposure(outcome: &BindOutcome) -> CliResult<()> {
    write_stderr_line(&format!(
        "WARNING: binding {} exposes the portal beyond loopback; subject tokens are not \
         authenticated",
        outcome.bind_addr
    ))?;
    if !outcome.audit_enabled {
        write_stderr_line("WARNING: audit logging is disabled")?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Seed Command
// ============================================================================

/// Executes the `seed` command.
async fn command_seed(command: SeedCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    if config.directory.backend == DirectoryBackend::Memory {
        return Err(CliError::new(
            "seed requires a sqlite or json directory; the memory directory is always seeded",
        ));
    }
    let catalog_target = if command.catalog {
        let path = config
            .catalog
            .path
            .clone()
            .ok_or_else(|| CliError::new("--catalog requires [catalog] path in the config"))?;
        if path.exists() && !command.force {
            return Err(CliError::new(format!(
                "catalog {} already exists; pass --force to overwrite",
                path.display()
            )));
        }
        Some(path)
    } else {
        None
    };

    let backend = config.directory.backend;
    let directory = config.directory.clone();
    let summary = tokio::task::spawn_blocking(move || {
        DirectoryHandle::open(&directory).and_then(|handle| handle.seed_demo())
    })
    .await
    .map_err(|err| CliError::new(format!("seed join failed: {err}")))?
    .map_err(|err| CliError::new(format!("seed failed: {err}")))?;
    write_stdout_line(&format!(
        "seeded {} classification groups and {} subjects into the {} directory",
        summary.groups,
        summary.subjects,
        backend.as_str()
    ))?;

    if let Some(path) = catalog_target {
        ResourceCatalog::demo()
            .write_atomic(&path)
            .map_err(|err| CliError::new(format!("catalog write failed: {err}")))?;
        write_stdout_line(&format!("wrote demo catalog to {}", path.display()))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Check Command
// ============================================================================

/// Executes the `check` command.
async fn command_check(command: CheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    let token = command.token;
    let report = tokio::task::spawn_blocking(move || {
        let handle = DirectoryHandle::open(&config.directory)
            .map_err(|err| CliError::new(format!("directory open failed: {err}")))?;
        let service = ClearanceService::new(handle.subjects(), handle.groups());
        let context = service
            .evaluate(token.as_deref())
            .map_err(|err| CliError::new(format!("clearance check failed: {err}")))?;
        let shape = token.as_deref().map(str::trim).filter(|token| !token.is_empty()).map(
            |token| match TokenShape::classify(token) {
                TokenShape::OpaqueId => "opaque_id",
                TokenShape::Username => "username",
            },
        );
        let subject = context.subject().map(|subject| {
            json!({
                "id": subject.subject_id,
                "username": subject.username,
                "displayName": subject.display_name,
                "role": subject.role_tag,
                "groups": subject.group_memberships,
            })
        });
        Ok::<_, CliError>(json!({
            "tokenShape": shape,
            "subject": subject,
            "securityLevel": context.current_level(),
        }))
    })
    .await
    .map_err(|err| CliError::new(format!("check join failed: {err}")))??;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => {
            let config = load_config(command.config)?;
            write_stdout_line(&format!(
                "config ok: bind {}, {} directory",
                config.server.bind.trim(),
                config.directory.backend.as_str()
            ))?;
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration with the standard resolution rules.
fn load_config(path: Option<PathBuf>) -> CliResult<ClearanceConfig> {
    ClearanceConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error("stdout", &err))
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| output_error("stdout", &err))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| output_error("stderr", &err))
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write to {stream}: {error}"))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
