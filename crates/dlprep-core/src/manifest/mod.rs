//! The manifest pass: scan a checksum list, decide skip/link/append per
//! entry, and write the per-partition download lists.

mod lists;
mod report;
mod scan;

pub use lists::{HandleMode, ListSet};
pub use report::ScanReport;
pub use scan::{scan, ScanRequest};
