//! Counters accumulated over one scan.

use std::fmt;

/// Result record of a scan: one counter per decision branch plus the line
/// total. Returned by the pass rather than kept as ambient state so the
/// core stays testable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Destination file already existed; nothing done.
    pub skipped: u64,
    /// Hard link created from the alternate source tree.
    pub linked: u64,
    /// Relative path appended to a partition download list.
    pub appended: u64,
    /// Checksums processed.
    pub total: u64,
}

impl ScanReport {
    /// Every processed checksum must land in exactly one branch.
    pub fn is_balanced(&self) -> bool {
        self.skipped + self.linked + self.appended == self.total
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped: {}, linked: {}, appended: {}, total: {}",
            self.skipped, self.linked, self.appended, self.total
        )
    }
}
