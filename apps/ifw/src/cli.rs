//! Command line interface definition

use clap::{Parser, Subcommand};
use ifw_config::FetchPolicy;
use ifw_types::ColorChoice;
use std::path::PathBuf;

/// ifw - Installer and maintenance tool for component repositories
#[derive(Parser)]
#[command(name = "ifw")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Installer and maintenance tool for component repositories")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Installation directory
    #[arg(long, short = 't', global = true, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Repository URL or directory (repeatable; replaces configured sources)
    #[arg(long = "source", global = true, value_name = "URL")]
    pub sources: Vec<String>,

    /// Whether one failing repository fails the run (any, all)
    #[arg(long, global = true, value_name = "POLICY")]
    pub fetch_policy: Option<FetchPolicy>,

    /// Executable the maintenance tool is built from
    #[arg(long, global = true, value_name = "PATH")]
    pub stub: Option<PathBuf>,

    /// Installer binary whose embedded repository is used
    #[arg(long, global = true, value_name = "PATH")]
    pub embedded: Option<PathBuf>,

    /// Permit operations that need elevated rights
    #[arg(long, global = true)]
    pub allow_elevation: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Install components and their dependencies
    #[command(alias = "i")]
    Install {
        /// Component names
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Replace installed components with newer versions
    #[command(alias = "up")]
    Update {
        /// Specific components to update (empty = all installed)
        components: Vec<String>,
    },

    /// Uninstall components and everything that depends on them
    #[command(alias = "rm")]
    Uninstall {
        /// Component names (empty = everything)
        components: Vec<String>,
    },

    /// List installed and available components
    #[command(alias = "ls")]
    List {
        /// Do not contact repositories
        #[arg(long)]
        installed: bool,
    },

    /// Show the appended data of an installer or maintenance tool
    Inspect {
        /// Installer or maintenance tool
        path: PathBuf,
    },

    /// Build an offline installer that embeds a repository
    CreateInstaller {
        /// Repository directory containing Updates.xml
        #[arg(long, short = 'r', value_name = "DIR")]
        repository: PathBuf,

        /// Output file
        #[arg(long, short = 'o', value_name = "PATH")]
        output: PathBuf,

        /// Components to embed (empty = all)
        components: Vec<String>,
    },

    /// Undo a run that was interrupted
    Recover,
}

impl Commands {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Update { .. } => "update",
            Commands::Uninstall { .. } => "uninstall",
            Commands::List { .. } => "list",
            Commands::Inspect { .. } => "inspect",
            Commands::CreateInstaller { .. } => "create-installer",
            Commands::Recover => "recover",
        }
    }
}
