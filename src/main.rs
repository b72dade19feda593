use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use datalake_fetch::app::fetch_use_case::{FetchOptions, FetchUseCase};
use datalake_fetch::app::ports::DataLakePort;
use datalake_fetch::config::{DataLakeConfig, FetchSettings};
use datalake_fetch::domain::partition::partitions_for;
use datalake_fetch::domain::report::{FetchOutcome, FetchReport};
use datalake_fetch::infra::azure_datalake::AzureDataLake;
use datalake_fetch::infra::csv_export::export_table;
use datalake_fetch::infra::local_lake::LocalDataLake;
use datalake_fetch::observability::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "datalake_fetch")]
#[command(about = "Fetch ship sensor time series from the data lake")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $DATALAKE_FETCH_CONFIG, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the Prometheus metrics snapshot when done
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// Ship identifier (top-level folder of the container)
    #[arg(long)]
    ship: String,
    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,
    /// Last day, exclusive (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge and filter all partitions covering a date range
    Fetch {
        #[command(flatten)]
        range: RangeArgs,
        /// Directory for the exported CSV (overrides the settings file)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip writing the CSV export
        #[arg(long)]
        no_export: bool,
        /// Read from a local directory laid out like the lake instead of Azure
        #[arg(long)]
        local_root: Option<PathBuf>,
        /// Print the fetch report as JSON
        #[arg(long)]
        report_json: bool,
        /// Exit non-zero when any partition was skipped
        #[arg(long)]
        strict: bool,
    },
    /// List the partition paths a fetch would read
    Partitions {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print a read-only signed URL for one blob of the data container
    SignUrl {
        /// Blob path inside the container, e.g. ship_a/2024/05/data.csv
        blob: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _guard = init_logging();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => FetchSettings::load_from(path),
        None => FetchSettings::load(),
    }
    .context("failed to load settings")?;

    if cli.print_metrics {
        datalake_fetch::metrics::init_metrics();
    }

    let failed = match cli.command {
        Commands::Fetch {
            range,
            output_dir,
            no_export,
            local_root,
            report_json,
            strict,
        } => {
            let lake: Box<dyn DataLakePort> = match local_root {
                Some(root) => {
                    info!("Reading from local directory {}", root.display());
                    Box::new(LocalDataLake::new(root))
                }
                None => Box::new(azure(&settings)?),
            };
            let use_case = FetchUseCase::new(lake, FetchOptions::from(&settings));

            let outcome = use_case
                .fetch_range(&range.ship, range.start, range.end)
                .await
                .with_context(|| format!("fetch for {} failed", range.ship))?;
            print_summary(&range, &outcome);

            if report_json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            }
            if !no_export {
                let dir = output_dir.unwrap_or_else(|| settings.output_dir.clone());
                let path = export_table(&outcome.table, &dir, &settings.export_prefix)
                    .context("failed to write CSV export")?;
                println!("   Output file: {}", path.display());
            }

            let failed = strict_failure(strict, &outcome.report);
            if failed {
                error!("Strict mode: some partitions were skipped");
            }
            failed
        }
        Commands::Partitions { range } => {
            if range.end < range.start {
                anyhow::bail!("start {} is after end {}", range.start, range.end);
            }
            for partition in partitions_for(&range.ship, range.start, range.end) {
                println!("{}", partition.path());
            }
            false
        }
        Commands::SignUrl { blob } => {
            let lake = azure(&settings)?;
            println!("{}", lake.signed_url(blob.trim_start_matches('/'))?);
            false
        }
    };

    if cli.print_metrics {
        match datalake_fetch::metrics::render() {
            Some(text) => print!("{}", text),
            None => error!("Metrics recorder is not installed"),
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// `--strict` turns a skipped partition into a failed run.
fn strict_failure(strict: bool, report: &FetchReport) -> bool {
    strict && !report.is_complete()
}

fn azure(settings: &FetchSettings) -> Result<AzureDataLake<datalake_fetch::infra::http_client::ReqwestHttp>> {
    let config = DataLakeConfig::from_env()
        .context("data lake credentials are not configured")?
        .with_endpoint_suffix(settings.endpoint_suffix.clone());
    let lake = AzureDataLake::connect(config, settings.sas_ttl()?)?;
    Ok(lake)
}

fn print_summary(range: &RangeArgs, outcome: &FetchOutcome) {
    let report = &outcome.report;
    println!("\nFetch results for {} [{}, {}):", range.ship, range.start, range.end);
    println!("   Rows: {}", outcome.table.len());
    if let (Some(first), Some(last)) = (outcome.table.first_ts(), outcome.table.last_ts()) {
        println!("   Span: {} .. {}", first, last);
    }
    println!("   Columns: {}", outcome.table.columns().join(", "));
    println!(
        "   Partitions: {} fetched, {} skipped",
        report.fetched_count(),
        report.partitions.len() - report.fetched_count()
    );
    println!("   Files: {}", report.files().count());
    println!(
        "   Dropped: {} empty, {} duplicate, {} unparsed ts, {} out of range",
        report.empty_rows_dropped,
        report.duplicates_removed,
        report.unparsed_timestamps,
        report.out_of_range
    );

    if !report.is_complete() {
        println!("\nSkipped partitions:");
        for (partition, reason) in report.skipped() {
            println!("   - {}: {}", partition, reason);
        }
    }
}
