mod cli;

use clap::Parser;
use cli::Cli;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::{self, Write};
use std::time::Instant;
use taxofilter::error::Result;
use taxofilter::filter::{NameCheck, TaxonFilter};
use taxofilter::report::{
    build_report_path, load_names, read_names, summarize, write_report, write_report_file,
    write_stats,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(level)
        .try_init()
        .expect("Failed to initialize logger");

    info!("Starting taxofilter...");
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };
    if !config.external_validation {
        info!("Offline mode: names are checked structurally only.");
    }

    let names = match cli.input_path() {
        Some(path) => {
            info!("Input file: {:?}", path);
            load_names(path)?
        }
        None => {
            info!("Reading names from stdin...");
            read_names(io::stdin().lock())?
        }
    };
    if names.is_empty() {
        info!("No names to check. Exiting.");
        return Ok(());
    }

    if cli.concurrency == 0 {
        warn!("--concurrency 0 is not allowed; checking one name at a time.");
    }

    let start_time = Instant::now();
    let filter = TaxonFilter::new(config)?;

    let pb = ProgressBar::new(names.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("Failed to set progress bar style")
            .progress_chars("##-"),
    );

    let progress = &pb;
    let screening = &filter;
    let checks: Vec<NameCheck> = stream::iter(names.iter())
        .map(move |raw| async move {
            let check = screening.check(raw).await;
            progress.set_message(raw.clone());
            progress.inc(1);
            check
        })
        .buffered(cli.concurrency.max(1))
        .collect()
        .await;
    pb.finish_with_message("Name screening complete.");

    let checked_at = chrono::Utc::now().date_naive();
    let report_path = cli
        .output_file
        .clone()
        .or_else(|| cli.input_path().map(|p| build_report_path(p)));
    match &report_path {
        Some(path) => {
            write_report_file(&checks, checked_at, path)?;
            info!("Report written to {:?}", path);
        }
        None => write_report(&checks, checked_at, io::stdout().lock())?,
    }

    let summary = summarize(&checks);
    let duration = start_time.elapsed();
    // stdout carries the report when no path was given
    let mut out: Box<dyn Write> = if report_path.is_some() {
        Box::new(io::stdout().lock())
    } else {
        Box::new(io::stderr().lock())
    };
    writeln!(out, "\n--- Summary Report ---")?;
    writeln!(out, "Names read: {}", summary.total)?;
    writeln!(out, "Valid: {}", summary.valid)?;
    writeln!(out, "Rejected: {}", summary.rejected)?;
    writeln!(out, "Valid names mapped to another accepted name: {}", summary.renamed)?;
    if let Some(path) = &report_path {
        writeln!(out, "Per-name report saved to: {}", path.display())?;
    }
    writeln!(out, "\n--- Validation cache ---")?;
    write_stats(&filter.validation_stats(), &mut out)?;
    writeln!(out)?;
    writeln!(out, "Execution time: {:.2?}", duration)?;

    Ok(())
}
