//! Command-line interface for Spanstore.
//!
//! The binary drives synthetic concurrent ingestion against one store,
//! reports store statistics while it runs and prints sample query results
//! at the end.

use crate::core::config::ConfigBuilder;
use crate::core::{Config, Query, Result, StoreError, TraceId};
use crate::storage::{InMemoryStore, ReadStore, SpanGenerator, SpanStore, StoreStats};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Bounded in-memory span store under synthetic load
#[derive(Parser, Debug)]
#[command(name = "spanstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/spanstore/config.yaml)
    #[arg(short, long, env = "SPANSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Distinct traces per mutable block
    #[arg(long, env = "SPANSTORE_BLOCK_CAPACITY")]
    pub block_capacity: Option<usize>,

    /// Immutable blocks retained before eviction
    #[arg(long, env = "SPANSTORE_MAX_BLOCKS")]
    pub max_blocks: Option<usize>,

    /// Number of synthetic traces to ingest
    #[arg(long, env = "SPANSTORE_TRACES")]
    pub traces: Option<usize>,

    /// Concurrent writer tasks
    #[arg(long, env = "SPANSTORE_WRITERS")]
    pub writers: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, env = "SPANSTORE_DEBUG")]
    pub debug: bool,

    /// Print final statistics as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments and environment variables (highest priority)
    /// 2. Config file
    /// 3. Defaults (lowest priority)
    ///
    /// Returns the file the configuration was read from, if any.
    pub async fn load_config(&self) -> Result<(Config, Option<PathBuf>)> {
        let builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("spanstore").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/spanstore/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return Ok((self.build_config_from_args(builder)?, None));
            }
        };

        let content = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            StoreError::config(format!("Failed to read config file {:?}: {}", config_path, e))
        })?;
        let builder = builder.from_yaml(&content)?;

        Ok((self.build_config_from_args(builder)?, Some(config_path)))
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(capacity) = self.block_capacity {
            builder = builder.block_capacity(capacity);
        }
        if let Some(blocks) = self.max_blocks {
            builder = builder.max_immutable_blocks(blocks);
        }
        if let Some(traces) = self.traces {
            builder = builder.traces(traces);
        }
        if let Some(writers) = self.writers {
            builder = builder.writers(writers);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level = std::env::var("SPANSTORE_LOG_LEVEL")
            .unwrap_or_else(|_| config.logging.level.as_str().to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = if config.logging.structured {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
        } else {
            tracing_subscriber::fmt::layer().with_target(false).compact()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| StoreError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the Spanstore binary.
pub async fn execute(cli: Cli) -> Result<()> {
    let (config, source) = cli.load_config().await?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Block capacity: {}", config.storage.block_capacity);
        println!("  Max immutable blocks: {}", config.storage.max_immutable_blocks);
        println!("  Retained traces (max): {}", config.storage.retained_traces());
        println!("  Writers: {}", config.load.writers);
        return Ok(());
    }

    cli.init_logging(&config)?;
    match &source {
        Some(path) => tracing::info!("Loaded configuration from: {:?}", path),
        None => tracing::debug!("No config file found, using defaults"),
    }

    let store = Arc::new(InMemoryStore::from_config(&config)?);
    let stats = run_load(Arc::clone(&store), &config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(store.as_ref(), &stats, &config)?;
    }

    Ok(())
}

/// Drive `config.load.traces` synthetic traces into the store from
/// `config.load.writers` blocking tasks, logging statistics on an interval.
/// Ctrl-C stops the writers early.
pub async fn run_load(store: Arc<InMemoryStore>, config: &Config) -> Result<StoreStats> {
    let load = config.load.clone();
    let next_trace = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let base_us = chrono::Utc::now().timestamp_micros();

    tracing::info!(
        traces = load.traces,
        writers = load.writers,
        spans_per_trace = load.spans_per_trace,
        "Starting synthetic ingestion"
    );

    let mut writers = Vec::with_capacity(load.writers);
    for _ in 0..load.writers {
        let store = Arc::clone(&store);
        let next_trace = Arc::clone(&next_trace);
        let stop = Arc::clone(&stop);
        let load = load.clone();
        writers.push(tokio::task::spawn_blocking(move || -> Result<usize> {
            let generator = SpanGenerator::new();
            let mut appended = 0;
            while !stop.load(Ordering::Relaxed) {
                let n = next_trace.fetch_add(1, Ordering::Relaxed);
                if n >= load.traces {
                    break;
                }
                let offset = i64::try_from(n).unwrap_or(i64::MAX);
                let trace_id = TraceId(offset.saturating_add(1));
                let start_us = base_us.saturating_add(offset.saturating_mul(1_000));
                for span in generator.generate_trace(trace_id, load.spans_per_trace, start_us)? {
                    store.append(span)?;
                    appended += 1;
                }
            }
            Ok(appended)
        }));
    }

    let done = tokio::spawn(async move {
        let mut total = 0;
        for writer in writers {
            total += writer
                .await
                .map_err(|e| StoreError::storage(format!("Writer task failed: {}", e)))??;
        }
        Ok::<usize, StoreError>(total)
    });
    tokio::pin!(done);

    let mut interval = tokio::time::interval(load.report_interval);
    interval.tick().await;

    let total = loop {
        tokio::select! {
            result = &mut done => {
                break result.map_err(|e| StoreError::storage(format!("Ingestion task failed: {}", e)))??;
            }
            _ = interval.tick() => {
                log_stats(&store.stats());
            }
            _ = tokio::signal::ctrl_c(), if !stop.load(Ordering::Relaxed) => {
                tracing::info!("Received shutdown signal, stopping writers...");
                stop.store(true, Ordering::Relaxed);
            }
        }
    };

    let stats = store.stats();
    tracing::info!(spans = total, "Synthetic ingestion finished");
    log_stats(&stats);
    Ok(stats)
}

fn log_stats(stats: &StoreStats) {
    tracing::info!(
        spans = stats.spans_appended,
        rotations = stats.rotations,
        evictions = stats.evictions,
        immutable_blocks = stats.immutable_blocks,
        retained_traces = stats.retained_traces,
        fill = format_args!("{:.1}%", stats.fill_ratio() * 100.0),
        "Store statistics"
    );
}

fn print_summary(store: &InMemoryStore, stats: &StoreStats, config: &Config) -> Result<()> {
    println!("Spans appended: {}", stats.spans_appended);
    println!(
        "Blocks: {} immutable (max {}), {} traces in mutable block",
        stats.immutable_blocks, stats.max_immutable_blocks, stats.mutable_traces
    );
    println!("Rotations: {}, evictions: {}", stats.rotations, stats.evictions);

    let services = store.services()?;
    println!("Services ({}):", services.len());
    for service in &services {
        let names = store.span_names(service)?;
        println!("  {} [{}]", service, names.join(", "));
    }

    let traces = store.traces(&Query::with_limit(config.load.query_limit))?;
    println!("Most recent {} traces:", traces.len());
    for trace in traces.iter().rev() {
        let root = trace.root_span().map_or("?", |span| span.name.as_str());
        println!(
            "  {} {} spans={} services={}",
            trace.trace_id,
            root,
            trace.span_count(),
            trace.service_names().join(",")
        );
    }

    if let Some(latest) = traces.last() {
        let full = store.trace(latest.trace_id)?;
        println!("Trace {} resolved with {} spans", full.trace_id, full.span_count());
    }

    Ok(())
}
