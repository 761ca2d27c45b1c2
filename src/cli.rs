use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::tracker::{DEFAULT_SCAN_WINDOW, DEFAULT_TARGET_FILE_START, ZipLayout};

#[derive(Parser, Debug)]
#[command(name = "rangetrack")]
#[command(version)]
#[command(about = "Locate interesting byte ranges in fuzzing samples", long_about = None)]
#[command(after_help = "Examples:\n  \
  rangetrack zip sample.zip                 print the embedded payload range\n  \
  rangetrack zip -n --target-offset 0x200 x  scan without the ZIP header check\n  \
  rangetrack shm /fuzz_ranges --size 4096   watch ranges written by a producer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode, only print ranges
    #[arg(short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Locate the payload embedded in a ZIP container
    Zip(ZipArgs),
    /// Poll ranges written to a shared memory region
    Shm(ShmArgs),
}

#[derive(Args, Debug)]
pub struct ZipArgs {
    /// Sample file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Skip the local file header check at offset 0
    #[arg(short = 'n', long = "no-validate")]
    pub no_validate: bool,

    /// Offset where the payload starts, before the file name length is added
    #[arg(long, value_name = "OFFSET", value_parser = parse_offset, default_value_t = DEFAULT_TARGET_FILE_START)]
    pub target_offset: u64,

    /// Number of trailing bytes to search
    #[arg(long, value_name = "BYTES", value_parser = parse_size, default_value_t = DEFAULT_SCAN_WINDOW)]
    pub window: usize,
}

impl ZipArgs {
    pub fn layout(&self) -> ZipLayout {
        ZipLayout {
            target_file_start: self.target_offset,
            scan_window: self.window,
            validate_zip: !self.no_validate,
        }
    }
}

#[derive(Args, Debug)]
pub struct ShmArgs {
    /// Region name, e.g. /fuzz_ranges
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Region size in bytes
    #[arg(short = 's', long, value_name = "BYTES", value_parser = parse_size)]
    pub size: usize,

    /// Directory holding the region (default: /dev/shm)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(short = 'i', long, value_name = "MS", default_value_t = 1000)]
    pub interval: u64,

    /// Number of polls, 0 to poll until interrupted
    #[arg(short = 'p', long, value_name = "N", default_value_t = 0)]
    pub polls: u64,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Default log filter for the verbosity level.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal offset.
pub fn parse_offset(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{s}': {e}"))
}

fn parse_size(s: &str) -> Result<usize, String> {
    let value = parse_offset(s)?;
    usize::try_from(value).map_err(|_| format!("size '{s}' is too large"))
}
