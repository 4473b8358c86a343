//! Error taxonomy for the manifest pass.
//!
//! Configuration errors (missing input file, missing lists directory) are
//! checked eagerly before any work is done. Filesystem errors during the
//! pass surface verbatim through anyhow and abort the run; partial output
//! is retained because a re-run is idempotent.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    /// Required checksum list file is absent.
    #[error("checksum file '{}' does not exist", .0.display())]
    MissingInput(PathBuf),

    /// Required lists output directory is absent.
    #[error("lists dir '{}' does not exist", .0.display())]
    MissingListsDir(PathBuf),

    /// Input token too short to carve the two partition keys from.
    /// Silently truncating would mis-partition, so the run aborts instead.
    #[error("line {line}: checksum '{token}' is too short to partition (need 6 characters)")]
    ShortChecksum { line: u64, token: String },
}
