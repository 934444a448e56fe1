use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use rstore_server::{AuthMode, RstoreServer, ServerConfig, StorageConfig};

use crate::cli::{Cli, Command, ConfigArgs, EtagArgs, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Etag(args) => cmd_etag(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

/// Apply command-line overrides on top of the file configuration.
fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(root) = &args.root {
        config.storage = StorageConfig::Filesystem { root: root.clone() };
    }
    config.validate()?;
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    let storage = match &config.storage {
        StorageConfig::Memory => "memory".to_string(),
        StorageConfig::Filesystem { root } => root.display().to_string(),
    };
    println!(
        "{} rstore on {} (storage: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        storage.cyan()
    );
    if config.auth.mode == AuthMode::AllowAll {
        println!("  {} auth mode is allow-all; do not expose this server", "!".yellow().bold());
    }

    let server = RstoreServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_etag(args: EtagArgs) -> anyhow::Result<()> {
    if args.files.is_empty() {
        anyhow::bail!("no files given");
    }
    for path in &args.files {
        let content =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let etag = rstore_etag::compute_object_etag(&content);
        println!("{}  {}", etag.to_string().yellow(), path.display());
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
