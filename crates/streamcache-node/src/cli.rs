use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "streamcache-node")]
#[command(about = "Replicated order cache over a Redis stream")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to streamcache.toml)
    #[arg(short, long, global = true, env = "STREAMCACHE_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a cache replica until interrupted
    Run(RunArgs),
    /// Publish a new order
    Save(SaveArgs),
    /// Publish a full replacement of an existing order
    Update(UpdateArgs),
    /// Publish the deletion of an order
    Delete(DeleteArgs),
    /// Replay the log and read one order
    Get(GetArgs),
    /// Replay the log and print every cached order
    Dump(DumpArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Seconds between stats log lines
    #[arg(long, default_value_t = 30)]
    pub stats_interval: u64,
}

#[derive(clap::Args)]
pub struct SaveArgs {
    /// Order name
    #[arg(long)]
    pub name: String,
    /// Order cost
    #[arg(long, allow_negative_numbers = true)]
    pub cost: i64,
    /// Mark the order as delivered
    #[arg(long)]
    pub delivered: bool,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Order ID
    #[arg(long)]
    pub id: String,
    /// Order name
    #[arg(long)]
    pub name: String,
    /// Order cost
    #[arg(long, allow_negative_numbers = true)]
    pub cost: i64,
    /// Mark the order as delivered
    #[arg(long)]
    pub delivered: bool,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Order ID
    #[arg(long)]
    pub id: String,
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Order ID
    #[arg(long)]
    pub id: String,
    /// Seconds to wait for the replay to finish
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

#[derive(clap::Args)]
pub struct DumpArgs {
    /// Seconds to wait for the replay to finish
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}
