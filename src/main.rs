//! Main entry point for the rangetrack CLI application.
//!
//! Runs one tracker against a sample on disk or a live shared-memory region
//! and prints the ranges it reports.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rangetrack::cli::{Command, ShmArgs, ZipArgs};
use rangetrack::{Cli, LocalFileReader, Range, ReadAt, ShmRangeTracker, ZipRangeTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Zip(args) => run_zip(args, &cli).await,
        Command::Shm(args) => run_shm(args, &cli).await,
    }
}

/// Locate the embedded payload of a sample file.
///
/// Only the first four bytes and the scan window at the end of the file
/// are read. A sample without a payload is not an error.
async fn run_zip(args: &ZipArgs, cli: &Cli) -> Result<()> {
    let reader = LocalFileReader::new(&args.file)?;
    let layout = args.layout();
    let tracker = ZipRangeTracker::new(layout);

    if !cli.is_quiet() {
        println!("File length: {:#x} bytes", reader.size());
    }

    match tracker.scan_reader(&reader, layout.validate_zip).await? {
        Some(range) => {
            if cli.is_quiet() {
                println!("{:x}-{:x}", range.from, range.to);
            } else {
                println!(
                    "Target file range: {:x}-{:x} ({} bytes)",
                    range.from,
                    range.to,
                    range.len()
                );
            }
        }
        None => {
            if !cli.is_quiet() {
                println!("No embedded payload found");
            }
        }
    }

    Ok(())
}

/// Poll a shared-memory region and print the ranges whenever they change.
async fn run_shm(args: &ShmArgs, cli: &Cli) -> Result<()> {
    let tracker = match &args.dir {
        Some(dir) => ShmRangeTracker::open_in(dir, &args.name, args.size)?,
        None => ShmRangeTracker::open(&args.name, args.size)?,
    };

    if !cli.is_quiet() {
        eprintln!(
            "Watching {} ({} bytes, up to {} ranges)",
            args.name,
            args.size,
            tracker.max_ranges()
        );
    }

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval.max(1)));
    let mut ranges = Vec::new();
    let mut last: Option<Vec<Range>> = None;
    let mut polls = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        tracker.read_ranges(&mut ranges);
        if last.as_ref() != Some(&ranges) {
            print_ranges(&ranges, cli.is_quiet());
            last = Some(ranges.clone());
        }

        polls += 1;
        if args.polls != 0 && polls >= args.polls {
            break;
        }
    }

    Ok(())
}

fn print_ranges(ranges: &[Range], quiet: bool) {
    if !quiet {
        println!("{} range(s)", ranges.len());
    }
    for range in ranges {
        println!("{:x}-{:x}", range.from, range.to);
    }
}
