//! Command-line front end for the block-hash reconciliation engine.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{AdapterKind, LoadedConfig, RoleConfig};
use recon_adapters::{ClickHouseAdapter, PostgresAdapter};
use recon_core::{intervals::derive_intervals, planner, Block, StoreAdapter};
use recon_dialects::{ClickHouseDialect, Dialect, PostgresDialect};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "recon", about = "Hierarchical block-hash table reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pass and report block-level differences
    Reconcile {
        /// Path to the reconciliation config YAML file
        config: PathBuf,

        /// Write the full block list as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load and validate a config file without connecting to any store
    ValidateConfig {
        config: PathBuf,
    },

    /// Print the SQL a block-hash and range-probe query would render to,
    /// for both sides, without executing anything
    Plan {
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile { config, output } => reconcile(&config, output.as_deref()).await,
        Commands::ValidateConfig { config } => validate_config(&config),
        Commands::Plan { config } => plan(&config),
    }
}

fn dialect_for(kind: AdapterKind) -> Box<dyn Dialect> {
    match kind {
        AdapterKind::Postgres => Box::new(PostgresDialect),
        AdapterKind::Clickhouse => Box::new(ClickHouseDialect),
    }
}

async fn build_adapter(role: &RoleConfig) -> Result<Arc<dyn StoreAdapter>> {
    match role.kind {
        AdapterKind::Postgres => {
            let unique_key = role.adapter.meta.unique_key.clone();
            let adapter = PostgresAdapter::connect(&role.dsn, 5, unique_key).await.context("connecting to postgres")?;
            Ok(Arc::new(adapter))
        }
        AdapterKind::Clickhouse => {
            let (url, database, user, password) = clickhouse_parts(&role.dsn)?;
            Ok(Arc::new(ClickHouseAdapter::new(&url, &database, &user, &password)))
        }
    }
}

fn clickhouse_parts(dsn: &str) -> Result<(String, String, String, String)> {
    let parsed = url::Url::parse(dsn).context("invalid clickhouse dsn")?;
    let scheme = if parsed.scheme() == "https" { "https" } else { "http" };
    let host = parsed.host_str().context("clickhouse dsn missing host")?;
    let port = parsed.port().unwrap_or(8123);
    let url = format!("{scheme}://{host}:{port}");
    let user = parsed.username().to_string();
    let password = parsed.password().unwrap_or("").to_string();
    let database = parsed.path().trim_start_matches('/').to_string();
    Ok((url, database, user, password))
}

async fn reconcile(config_path: &PathBuf, output: Option<&std::path::Path>) -> Result<()> {
    let loaded = config::load(config_path)?;
    info!("config loaded, connecting to state adapters");

    let sourcestate = build_adapter(&loaded.source_state).await?;
    let sinkstate = build_adapter(&loaded.sink_state).await?;

    let intervals = derive_intervals(
        loaded.recon.initial_partition_interval,
        loaded.recon.max_block_size,
        loaded.recon.interval_reduction_factor,
    )
    ?;
    info!(ladder = ?intervals, "derived interval ladder");

    let cancel = CancellationToken::new();
    let limits = recon_core::driver::DriverLimits { max_parallel: loaded.max_parallel };

    let (blocks, statuses) = recon_core::driver::build_blocks(
        sourcestate,
        sinkstate,
        Arc::new(loaded.source.adapter),
        Arc::new(loaded.sink.adapter),
        Arc::new(loaded.recon),
        Arc::new(intervals),
        cancel,
        limits,
    )
    .await
    ?;

    print_summary(&blocks, &statuses);

    if let Some(path) = output {
        write_blocks_json(path, &blocks, &statuses)?;
        println!("Wrote {} blocks to {:?}", blocks.len(), path);
    }

    Ok(())
}

fn print_summary(blocks: &[Block], statuses: &[recon_core::Status]) {
    use recon_core::Status::*;
    let (mut identical, mut modified, mut added, mut deleted) = (0u64, 0u64, 0u64, 0u64);
    for (block, status) in blocks.iter().zip(statuses) {
        match status {
            Identical => identical += block.num_rows,
            Modified => modified += block.num_rows,
            AddedSource => added += block.num_rows,
            DeletedSink => deleted += block.num_rows,
        }
    }
    println!("\n=== Reconciliation Summary ===");
    println!("Blocks:          {}", blocks.len());
    println!("Identical rows:  {identical}");
    println!("Modified rows:   {modified}");
    println!("Added (source):  {added}");
    println!("Deleted (sink):  {deleted}");
}

fn write_blocks_json(path: &std::path::Path, blocks: &[Block], statuses: &[recon_core::Status]) -> Result<()> {
    #[derive(serde::Serialize)]
    struct Entry {
        start: String,
        end: String,
        level: usize,
        num_rows: u64,
        status: char,
    }
    let entries: Vec<Entry> = blocks
        .iter()
        .zip(statuses)
        .map(|(b, s)| Entry {
            start: format!("{:?}", b.start),
            end: format!("{:?}", b.end),
            level: b.level,
            num_rows: b.num_rows,
            status: s.code(),
        })
        .collect();
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn validate_config(config_path: &PathBuf) -> Result<()> {
    let loaded = config::load(config_path)?;
    let intervals = derive_intervals(
        loaded.recon.initial_partition_interval,
        loaded.recon.max_block_size,
        loaded.recon.interval_reduction_factor,
    )
    ?;
    println!("Config is valid.");
    println!("Interval ladder: {intervals:?}");
    println!("Max parallelism: {}", loaded.max_parallel);
    Ok(())
}

fn plan(config_path: &PathBuf) -> Result<()> {
    let loaded = config::load(config_path)?;
    let intervals = derive_intervals(
        loaded.recon.initial_partition_interval,
        loaded.recon.max_block_size,
        loaded.recon.interval_reduction_factor,
    )
    ?;

    for (label, adapter_config, meta, kind) in [
        ("source", &loaded.source.adapter, &loaded.recon.source_state_meta, loaded.source_state.kind),
        ("sink", &loaded.sink.adapter, &loaded.recon.sink_state_meta, loaded.sink_state.kind),
    ] {
        let dialect = dialect_for(kind);
        let range_query = planner::plan_range_query(adapter_config, meta);
        let (sql, params) = dialect.render(&range_query)?;
        println!("\n-- {label} range probe --\n{sql}\n-- params: {params:?}");

        let block_query = planner::plan_block_hash_query(
            loaded.recon.start.as_ref().map(|b| b.resolve()).unwrap_or(recon_core::PartitionValue::Int(0)),
            loaded.recon.end.as_ref().map(|b| b.resolve()).unwrap_or(recon_core::PartitionValue::Int(0)),
            1,
            &intervals,
            adapter_config,
            meta,
            &loaded.recon,
        )
        ?;
        let (sql, params) = dialect.render(&block_query)?;
        println!("\n-- {label} level-1 block hash --\n{sql}\n-- params: {params:?}");
    }

    Ok(())
}
