//! Path layout rules for the image tree and the partition lists.
//!
//! All functions here are pure path math; the roots are passed in by the
//! caller, so nothing in this module depends on the working directory.

use std::path::{Path, PathBuf};

use crate::error::PrepError;

/// Minimum token length: 3 chars for the partition key plus 3 for the sub key.
pub const MIN_CHECKSUM_LEN: usize = 6;

/// Checks that `checksum` is long enough to carve both keys from.
/// `line` is the 1-based input line number, reported in the error.
pub fn validate(checksum: &str, line: u64) -> Result<(), PrepError> {
    if checksum.len() < MIN_CHECKSUM_LEN
        || !checksum.is_char_boundary(3)
        || !checksum.is_char_boundary(MIN_CHECKSUM_LEN)
    {
        return Err(PrepError::ShortChecksum {
            line,
            token: checksum.to_string(),
        });
    }
    Ok(())
}

/// Partition key: first 3 characters. Names both the top-level subdirectory
/// of the image tree and the download list file.
pub fn partition_key(checksum: &str) -> &str {
    &checksum[..3]
}

/// Sub-partition key: characters 3..6, the second directory level.
pub fn sub_key(checksum: &str) -> &str {
    &checksum[3..MIN_CHECKSUM_LEN]
}

/// Canonical relative location of a file in any image tree:
/// `dir/subdir/<checksum>.<ext>`.
pub fn relative_path(checksum: &str, ext: &str) -> PathBuf {
    let mut name = String::with_capacity(checksum.len() + 1 + ext.len());
    name.push_str(checksum);
    name.push('.');
    name.push_str(ext);
    Path::new(partition_key(checksum))
        .join(sub_key(checksum))
        .join(name)
}

/// Default alternate source root: one directory level up, same relative
/// subpath. Lets a run reuse files from a previously downloaded superset
/// tree sitting next to the working directory.
pub fn alternate_root(dest_root: &Path) -> PathBuf {
    Path::new("..").join(dest_root)
}
