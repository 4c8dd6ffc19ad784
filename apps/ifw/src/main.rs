//! ifw - Installer and maintenance tool for component repositories
//!
//! This is the main CLI application that drives installs, updates and
//! removals through the ops crate.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use ifw_config::Config;
use ifw_events::{EventReceiver, EventSender};
use ifw_ops::{OperationResult, OpsContextBuilder, OpsCtx};
use ifw_types::{ColorChoice, OutputFormat, RunStatus};
use std::path::Path;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit code of a run that stopped on Ctrl-C
const EXIT_CANCELED: i32 = 130;

#[tokio::main]
async fn main() {
    // Parse command line arguments first; they locate the config file
    let mut cli = Cli::parse();

    // Load configuration with proper precedence:
    // file (or defaults), then environment, then CLI flags
    let config = match load_config(&cli.global).await {
        Ok(config) => config,
        Err(e) => {
            if !cli.global.json {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    };

    // Configured output format; an explicit --color still wins for plain
    match config.general.default_output {
        OutputFormat::Json => cli.global.json = true,
        OutputFormat::Plain if cli.global.color.is_none() => {
            cli.global.color = Some(ColorChoice::Never);
        }
        OutputFormat::Plain | OutputFormat::Tty => {}
    }
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug, &config.log_dir());

    match run(cli, config).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic, returning the process exit code
async fn run(cli: Cli, config: Config) -> Result<i32, CliError> {
    info!("Starting ifw v{}", env!("CARGO_PKG_VERSION"));

    // Create event channel
    let (event_sender, event_receiver) = ifw_events::channel();

    // First Ctrl-C asks the run to stop after its in-flight operation
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ops_ctx = build_ops_context(&cli.global, event_sender, config.clone(), cancel)?;

    let color = cli.global.color.unwrap_or(config.general.color);
    let renderer = OutputRenderer::new(cli.global.json, color);

    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(
        cli.command.name(),
        colors_enabled,
        cli.global.debug,
        cli.global.json,
    );

    let stub = cli.global.stub.clone();
    let result = execute_command_with_events(
        cli.command,
        ops_ctx,
        stub.as_deref(),
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    let code = exit_code(&result);
    if code == 0 {
        info!("Command completed successfully");
    } else {
        warn!(exit_code = code, "Command did not complete");
    }
    Ok(code)
}

fn exit_code(result: &OperationResult) -> i32 {
    match result {
        OperationResult::Run(report) => match report.status {
            RunStatus::Finished => 0,
            RunStatus::Canceled => EXIT_CANCELED,
            RunStatus::Failed => 1,
        },
        other if other.is_success() => 0,
        _ => 1,
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, canceling after the current operation");
            cancel.cancel();
        }
    });
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ops_ctx: OpsCtx,
    stub: Option<&Path>,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ops_ctx, stub));

    // Handle events concurrently with command execution
    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: OpsCtx,
    stub: Option<&Path>,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::Install { components } => {
            let report = ifw_ops::install(&ctx, &components).await?;
            Ok(OperationResult::Run(report))
        }

        Commands::Update { components } => {
            let report = ifw_ops::update(&ctx, &components).await?;
            Ok(OperationResult::Run(report))
        }

        Commands::Uninstall { components } => {
            let report = ifw_ops::uninstall(&ctx, &components).await?;
            Ok(OperationResult::Run(report))
        }

        Commands::List { installed } => {
            let components = ifw_ops::list_components(&ctx, installed).await?;
            Ok(OperationResult::ComponentList(components))
        }

        Commands::Inspect { path } => {
            let report = ifw_ops::inspect(&path).await?;
            Ok(OperationResult::Inspect(report))
        }

        Commands::CreateInstaller {
            repository,
            output,
            components,
        } => {
            let stub = match stub {
                Some(stub) => stub.to_path_buf(),
                None => std::env::current_exe()?,
            };
            if stub == output {
                return Err(CliError::InvalidArguments(
                    "--output must differ from the stub executable".to_string(),
                ));
            }
            let report =
                ifw_ops::create_installer(&ctx, &repository, &stub, &output, &components).await?;
            Ok(OperationResult::OfflineInstaller(report))
        }

        Commands::Recover => {
            let info = ifw_ops::recover(&ctx).await?;
            Ok(OperationResult::Recovery(info))
        }
    }
}

/// Load the config file and apply environment and CLI overrides
async fn load_config(global: &GlobalArgs) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(&global.config).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, global);
    Ok(config)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if let Some(policy) = global.fetch_policy {
        config.metadata.fetch_policy = policy;
    }
    if let Some(target) = &global.target_dir {
        config.paths.target_dir = Some(target.clone());
    }
    if global.allow_elevation {
        config.installer.allow_elevation = true;
    }
}

/// Build operations context with all required components
fn build_ops_context(
    global: &GlobalArgs,
    event_sender: EventSender,
    config: Config,
    cancel: CancellationToken,
) -> Result<OpsCtx, CliError> {
    let mut builder = OpsContextBuilder::new()
        .with_event_sender(event_sender)
        .with_config(config)
        .with_cancel(cancel);

    if !global.sources.is_empty() {
        builder = builder.with_sources(global.sources.clone());
    }
    if let Some(stub) = &global.stub {
        builder = builder.with_stub(stub.clone());
    }
    if let Some(embedded) = &global.embedded {
        builder = builder.with_embedded(embedded.clone());
    }

    Ok(builder.build()?)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "ifw-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,ifw=debug,ifw_install=debug"),
                        ),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // JSON mode: suppress console logging to avoid contaminating output
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,ifw=warn,ifw_install=warn")
                }),
            )
            .init();
    }
}
