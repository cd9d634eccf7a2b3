//! `seeder` binary.
//!
//! Fills two stores with the same synthetic forum hierarchy, counts their rows and benchmarks the
//! strategies for reading the hierarchy back.

use clap::{Args, Parser, Subcommand};
use seed_config::load_config;
use seed_config::shared::SeederConfig;
use seed_telemetry::tracing::init_tracing;

use crate::core::{ShapeOverrides, compare_read_strategies, count_rows, seed_stores};

mod core;
mod stores;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generates the hierarchy and inserts it into both stores.
    Seed(SeedArgs),
    /// Prints the number of rows at each level of both stores.
    Count,
    /// Times every read strategy against both stores.
    Compare {
        /// Number of times each strategy is run per store.
        #[arg(long, default_value = "10")]
        iterations: u32,
    },
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// Overrides `seed.shape.container_count`.
    #[arg(long)]
    containers: Option<u64>,

    /// Overrides `seed.shape.groups_per_container`.
    #[arg(long)]
    groups_per_container: Option<u64>,

    /// Overrides `seed.shape.items_per_group`.
    #[arg(long)]
    items_per_group: Option<u64>,

    /// Cancels the run after this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Reports progress through logs instead of progress bars.
    #[arg(long)]
    no_progress_bars: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config::<SeederConfig>()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli, config))
}

async fn async_main(cli: Cli, config: SeederConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Seed(args) => {
            let overrides = ShapeOverrides {
                container_count: args.containers,
                groups_per_container: args.groups_per_container,
                items_per_group: args.items_per_group,
                deadline_ms: args.deadline_ms,
            };
            seed_stores(config, overrides, !args.no_progress_bars).await
        }
        Command::Count => count_rows(config).await,
        Command::Compare { iterations } => compare_read_strategies(config, iterations).await,
    }
}
