use anyhow::{Context, Result};
use clap::Parser;
use search_bench::client::HttpClientFactory;
use search_bench::config::{BenchConfig, FailurePolicy, FileConfig, delimiter_byte, parse_header_kv};
use search_bench::dataset::DatasetSet;
use search_bench::dimension::Dimension;
use search_bench::gate::{self, GateMode};
use search_bench::logging;
use search_bench::phase::Phase;
use search_bench::roles::controller::{BenchmarkRun, write_summary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "search-bench")]
#[command(about = "Column scan vs index vs full-text search benchmark harness")]
struct Cli {
    /// Run ID for tagging outputs (random when empty)
    #[arg(long, default_value = "")]
    run_id: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Optional YAML config; flags and environment override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Health-check endpoint
    #[arg(long, env = "PING_URL")]
    ping_url: Option<String>,

    /// Data installation endpoint
    #[arg(long, env = "INSTALL_URL")]
    install_url: Option<String>,

    /// Column/index scan query endpoint
    #[arg(long, env = "SCAN_GET_RESTAURANTS_URL")]
    scan_url: Option<String>,

    /// Full-text search query endpoint
    #[arg(long, env = "ATLAS_SEARCH_GET_RESTAURANTS_URL")]
    search_url: Option<String>,

    /// Output directory for result sinks and the run summary
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Directory holding the default dataset files
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    #[arg(long)]
    ids_csv: Option<PathBuf>,
    #[arg(long)]
    names_csv: Option<PathBuf>,
    #[arg(long)]
    cities_csv: Option<PathBuf>,
    #[arg(long)]
    states_csv: Option<PathBuf>,
    #[arg(long)]
    countries_csv: Option<PathBuf>,

    /// Dataset field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Row cap for the id, name and city datasets
    #[arg(long)]
    prefix_limit: Option<usize>,

    /// documentCount sent with each install directive
    #[arg(long)]
    document_count: Option<u64>,

    /// How to confirm each benchmark phase
    #[arg(long, value_enum)]
    gate: Option<GateMode>,

    /// abort: stop on the first failed request; continue: count and report
    #[arg(long, value_enum)]
    failure_policy: Option<FailurePolicy>,

    /// Timeout per request (ms)
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Benchmark phases to run (scan,index,search)
    #[arg(long, value_delimiter = ',')]
    phases: Vec<Phase>,

    /// Dimensions to query (restaurant-id,owner-name,city,state,country)
    #[arg(long, value_delimiter = ',')]
    dimensions: Vec<Dimension>,

    /// Extra request header as Key=Value (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<BenchConfig> {
        let mut cfg = BenchConfig::default();
        if let Some(path) = &self.config {
            cfg.apply_file(FileConfig::from_path(path)?)?;
        }

        cfg.run_id = if self.run_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.run_id
        };
        if let Some(v) = self.ping_url { cfg.endpoints.ping_url = v; }
        if let Some(v) = self.install_url { cfg.endpoints.install_url = v; }
        if let Some(v) = self.scan_url { cfg.endpoints.scan_url = v; }
        if let Some(v) = self.search_url { cfg.endpoints.search_url = v; }
        if let Some(v) = self.out_dir { cfg.out_dir = v; }
        if let Some(v) = self.csv_dir { cfg.csv_dir = v; }
        for (dimension, path) in [
            (Dimension::RestaurantId, self.ids_csv),
            (Dimension::OwnerName, self.names_csv),
            (Dimension::City, self.cities_csv),
            (Dimension::State, self.states_csv),
            (Dimension::Country, self.countries_csv),
        ] {
            if let Some(p) = path {
                cfg.dataset_paths.insert(dimension, p);
            }
        }
        if let Some(c) = self.delimiter { cfg.delimiter = delimiter_byte(c)?; }
        if let Some(v) = self.prefix_limit { cfg.prefix_limit = v; }
        if let Some(v) = self.document_count { cfg.document_count = v; }
        if let Some(v) = self.gate { cfg.gate = v; }
        if let Some(v) = self.failure_policy { cfg.failure_policy = v; }
        if let Some(v) = self.request_timeout_ms { cfg.request_timeout_ms = v; }
        if !self.phases.is_empty() { cfg.phases = self.phases; }
        if !self.dimensions.is_empty() { cfg.dimensions = self.dimensions; }
        cfg.headers.extend(parse_header_kv(&self.headers));

        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    logging::init(&cli.log_level)?;

    let config = cli.into_config().context("invalid configuration")?;
    info!(
        run_id = %config.run_id,
        policy = ?config.failure_policy,
        "search-bench starting"
    );

    let datasets = DatasetSet::load(&config.dataset_sources(), config.delimiter)
        .context("loading datasets")?;
    let out_dir = config.out_dir.clone();
    let gate = gate::from_mode(config.gate);

    let run = BenchmarkRun::new(config, datasets, gate, Arc::new(HttpClientFactory));
    let report = run.run().await?;

    let summary = write_summary(&report, &out_dir).await?;
    info!(
        "Run {} complete in {:.2?}; summary at {}",
        report.run_id,
        report.elapsed,
        summary.display()
    );
    Ok(())
}
