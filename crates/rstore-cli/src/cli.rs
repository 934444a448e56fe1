use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rstore",
    about = "rstore: per-user remote storage over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the storage server
    Serve(ServeArgs),
    /// Print the ETag the server would assign to a file
    Etag(EtagArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the listen address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Store documents below this directory instead of in memory
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct EtagArgs {
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
