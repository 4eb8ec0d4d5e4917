use crate::init_config::CmdConfig;
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod init_config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// config file to use instead of ~/.config/agentdoc/config.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

/// Chain the document is written for.
#[derive(clap::Args, Clone, Debug)]
pub struct ChainArgs {
    /// Chain id of the identity registry; defaults to the config's [chain]
    #[arg(long, value_name = "ID")]
    chain_id: Option<u64>,
    /// Identity registry contract address
    #[arg(long, value_name = "ADDRESS", requires = "chain_id")]
    registry: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    /// First configured backend that accepts the upload, Arweave before IPFS
    Auto,
    Arweave,
    Ipfs,
}

#[derive(Subcommand)]
enum Commands {
    /// Modify the agentdoc config
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    /// Print the canonical storage document for a record
    Format {
        /// JSON file holding the agent's metadata record
        record: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Print the annotations a tagging backend would attach to a record
    Annotations {
        /// JSON file holding the agent's metadata record
        record: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Upload a record's document and print its storage URI
    Upload {
        /// JSON file holding the agent's metadata record
        record: PathBuf,
        #[arg(short, long, value_enum, default_value_t = BackendChoice::Auto)]
        backend: BackendChoice,
        #[command(flatten)]
        chain: ChainArgs,
        /// Store in a process-local backend instead of the network
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Load and print the document behind a storage URI
    Load {
        /// ipfs://, ar:// or http(s):// URI
        uri: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let config_file = match cli.config {
        Some(path) => path,
        None => ProjectDirs::from("", "", "agentdoc")
            .context("failed to determine config directory path")?
            .config_dir()
            .join("config.toml"),
    };

    cmd::run_command(config_file, cli.cmd).await
}
