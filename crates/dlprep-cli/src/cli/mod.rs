//! CLI for the dlprep manifest builder.

use anyhow::Result;
use clap::Parser;
use dlprep_core::config;
use dlprep_core::layout;
use dlprep_core::manifest::{scan, ScanRequest};
use std::path::PathBuf;

/// Prepare per-partition download lists for a parallel fetch job.
#[derive(Debug, Parser)]
#[command(name = "dlprep")]
#[command(
    about = "dlprep: build hard-link/download manifests from a checksum list",
    long_about = None
)]
pub struct Cli {
    /// Checksum list file, one checksum per line, sorted.
    pub checksums: PathBuf,

    /// Destination image tree root (holds existing files, receives hard links).
    pub dest_root: PathBuf,

    /// Existing directory that receives the per-partition download lists.
    pub lists_dir: PathBuf,

    /// Do not assume sorted input: hold one list handle open per partition.
    #[arg(long)]
    pub unsorted: bool,

    /// Override the configured file extension for derived paths.
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Override the alternate source root (default: ../<DEST_ROOT>).
    #[arg(long, value_name = "DIR")]
    pub alt_root: Option<PathBuf>,
}

pub fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    if cli.unsorted {
        cfg.hold_open_handles = true;
    }
    if let Some(ext) = cli.extension {
        cfg.extension = ext;
    }
    let alt_root = cli
        .alt_root
        .unwrap_or_else(|| layout::alternate_root(&cli.dest_root));

    let req = ScanRequest {
        checksums: cli.checksums,
        dest_root: cli.dest_root,
        alt_root,
        lists_dir: cli.lists_dir,
    };
    let report = scan(&req, &cfg)?;
    println!("{report}");
    Ok(())
}
