//! pairsync: move video/image pairs and their results between local disk and
//! blob storage.
//!
//! Settings come from PAIRSYNC_* variables (and `.env`); flags override them.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pairsync_cli::{init_tracing, ConfigOverrides};
use pairsync_core::TransferConfig;
use pairsync_storage::create_blob_store;
use pairsync_transfer::{
    check_results, download_batch, list_available_batches, upload_batch, CompletenessSummary,
    DownloadRequest, FsListing, PlanFilters, UploadRequest,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pairsync", about = "Resumable batch transfers to and from blob storage")]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Also write logs to this file (e.g. download.log)
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the video/image pairs of a batch
    Download {
        /// Batch ID (e.g. 001)
        #[arg(long)]
        batch: String,
        /// Output directory; files land in <output>/batch_<id>_data
        #[arg(long, default_value = "downloads")]
        output: PathBuf,
        /// Maximum number of pairs
        #[arg(long)]
        limit: Option<NonZeroUsize>,
        /// Video ID to resume from (inclusive)
        #[arg(long)]
        start_from: Option<String>,
        /// Mapping file to use instead of <batch-configs>/batch_<id>/video_image_mapping.json
        #[arg(long, value_name = "FILE")]
        mapping: Option<PathBuf>,
    },
    /// Upload result directories for a batch
    Upload {
        /// Batch ID for the upload destination
        #[arg(long)]
        batch: String,
        /// Local results directory
        #[arg(long)]
        results: PathBuf,
        /// Maximum number of result directories
        #[arg(long)]
        limit: Option<NonZeroUsize>,
        /// Result directory ID to resume from (inclusive)
        #[arg(long)]
        start_from: Option<String>,
        /// Upload only directories with every required file
        #[arg(long)]
        complete_only: bool,
    },
    /// Check result directories for completeness without uploading
    Check {
        /// Local results directory
        #[arg(long)]
        results: PathBuf,
    },
    /// List batch configurations that have a mapping file
    ListBatches,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let mut config = TransferConfig::from_env().context("Load configuration")?;
    cli.overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Download {
            batch,
            output,
            limit,
            start_from,
            mapping,
        } => {
            let store = create_blob_store(&config)
                .await
                .context("Create blob store")?;
            let request = DownloadRequest {
                batch_id: batch,
                output_root: output,
                filters: PlanFilters::new(limit, start_from),
                mapping_path: mapping,
            };
            let report = download_batch(&config, store, &request)
                .await
                .with_context(|| format!("Download batch {}", request.batch_id))?;
            print_json(&report)?;
        }
        Commands::Upload {
            batch,
            results,
            limit,
            start_from,
            complete_only,
        } => {
            let store = create_blob_store(&config)
                .await
                .context("Create blob store")?;
            let request = UploadRequest {
                batch_id: batch,
                results_root: results,
                filters: PlanFilters::new(limit, start_from),
                complete_only,
            };
            let report = upload_batch(&config, store, Arc::new(FsListing), &request)
                .await
                .with_context(|| format!("Upload batch {}", request.batch_id))?;
            print_json(&report)?;
        }
        Commands::Check { results } => {
            let records = check_results(&config, Arc::new(FsListing), &results)
                .await
                .with_context(|| format!("Scan {}", results.display()))?;
            let summary = CompletenessSummary::of(&records);
            tracing::info!(
                complete = summary.complete,
                incomplete = summary.incomplete,
                "Completeness check finished"
            );
            print_json(&records)?;
        }
        Commands::ListBatches => {
            let batches = list_available_batches(&config.batch_configs_dir)
                .context("List batch configurations")?;
            tracing::info!(count = batches.len(), "Available batches");
            print_json(&batches)?;
        }
    }

    Ok(())
}
