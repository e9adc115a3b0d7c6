use anyhow::Result;
use clap::Parser;

use streamcache_node::cli::{Cli, Commands};
use streamcache_node::commands;
use streamcache_node::config::loader::load_config;
use streamcache_node::observability;
use streamcache_node::output::print_error;

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            std::process::exit(2);
        }
    };

    observability::init_tracing(&config.logging);
    tracing::info!(
        path = cli.config.as_deref().unwrap_or("streamcache.toml"),
        stream = %config.redis.stream,
        "Configuration loaded"
    );

    if let Err(e) = run(&cli, &config).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, config: &streamcache_node::AppConfig) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => {
            observability::init_metrics(&config.metrics)?;
            commands::replica::run(config, args).await?;
        }
        Commands::Save(args) => commands::orders::save(config, args).await?,
        Commands::Update(args) => commands::orders::update(config, args).await?,
        Commands::Delete(args) => commands::orders::delete(config, args).await?,
        Commands::Get(args) => commands::orders::get(config, args).await?,
        Commands::Dump(args) => commands::orders::dump(config, args).await?,
    }
    Ok(())
}
