//! Single pass over the checksum list.
//!
//! Per checksum, in input order: already present in the destination tree →
//! skip; present in the alternate source tree → hard link into place; else
//! append the relative path to the partition's download list. Mid-run
//! filesystem errors abort the run and keep partial output; re-running is
//! idempotent, so the whole run is the retry unit.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::debug;

use super::lists::{HandleMode, ListSet};
use super::report::ScanReport;
use crate::config::DlprepConfig;
use crate::error::PrepError;
use crate::layout;

/// Paths for one scan run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Checksum list file, one token per line, expected sorted.
    pub checksums: PathBuf,
    /// Destination image tree root; receives hard links, holds existing files.
    /// Assumed to exist, not validated.
    pub dest_root: PathBuf,
    /// Alternate source tree root, typically a previously downloaded superset
    /// (see [`layout::alternate_root`] for the conventional derivation).
    pub alt_root: PathBuf,
    /// Existing directory that receives the per-partition download lists.
    pub lists_dir: PathBuf,
}

/// Runs the manifest pass and returns the branch counters.
pub fn scan(req: &ScanRequest, cfg: &DlprepConfig) -> Result<ScanReport> {
    if !req.checksums.is_file() {
        return Err(PrepError::MissingInput(req.checksums.clone()).into());
    }
    if !req.lists_dir.is_dir() {
        return Err(PrepError::MissingListsDir(req.lists_dir.clone()).into());
    }

    let mode = if cfg.hold_open_handles {
        HandleMode::Held
    } else {
        HandleMode::Sorted
    };
    let mut lists = ListSet::new(&req.lists_dir, mode);
    let mut report = ScanReport::default();
    let log_every = cfg.log_every.max(1);

    let file = File::open(&req.checksums)
        .with_context(|| format!("open {}", req.checksums.display()))?;
    let reader = BufReader::new(file);

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read {}", req.checksums.display()))?;
        let checksum = line.trim_end();
        if checksum.is_empty() {
            continue;
        }

        if report.total % log_every == 0 {
            debug!(
                skipped = report.skipped,
                linked = report.linked,
                appended = report.appended,
                total = report.total,
                "scan progress"
            );
        }
        report.total += 1;

        layout::validate(checksum, idx as u64 + 1)?;
        let dir = layout::partition_key(checksum);
        let rel = layout::relative_path(checksum, &cfg.extension);
        lists.advance(dir);

        let dst = req.dest_root.join(&rel);
        if dst.is_file() {
            debug!(path = %dst.display(), "skipping existing");
            report.skipped += 1;
            continue;
        }

        let src = req.alt_root.join(&rel);
        if src.is_file() {
            debug!(src = %src.display(), dst = %dst.display(), "hard-linking");
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create dir {}", parent.display()))?;
            }
            fs::hard_link(&src, &dst)
                .with_context(|| format!("link {} -> {}", src.display(), dst.display()))?;
            report.linked += 1;
            continue;
        }

        debug!(path = %rel.display(), "appending to list");
        lists.append(dir, &rel)?;
        report.appended += 1;
    }

    // Closes any still-open list handle before the report goes out.
    drop(lists);
    debug!(?report, "scan finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        req: ScanRequest,
    }

    fn fixture(checksums: &[&str]) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let checksums_path = root.path().join("hashes.txt");
        let mut f = File::create(&checksums_path).unwrap();
        for c in checksums {
            writeln!(f, "{c}").unwrap();
        }
        let dest_root = root.path().join("images");
        let alt_root = root.path().join("superset");
        let lists_dir = root.path().join("file_lists");
        fs::create_dir_all(&dest_root).unwrap();
        fs::create_dir_all(&alt_root).unwrap();
        fs::create_dir_all(&lists_dir).unwrap();
        Fixture {
            _root: root,
            req: ScanRequest {
                checksums: checksums_path,
                dest_root,
                alt_root,
                lists_dir,
            },
        }
    }

    fn place(root: &Path, checksum: &str, content: &str) {
        let rel = layout::relative_path(checksum, "jpg");
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn list_content(fix: &Fixture, key: &str) -> String {
        fs::read_to_string(fix.req.lists_dir.join(key)).unwrap()
    }

    #[test]
    fn all_missing_appends_per_partition() {
        let fix = fixture(&["abc123", "abc456", "xyz789"]);
        let report = scan(&fix.req, &DlprepConfig::default()).unwrap();

        assert_eq!(report.skipped, 0);
        assert_eq!(report.linked, 0);
        assert_eq!(report.appended, 3);
        assert_eq!(report.total, 3);
        assert!(report.is_balanced());

        assert_eq!(
            list_content(&fix, "abc"),
            "abc/123/abc123.jpg\nabc/456/abc456.jpg\n"
        );
        assert_eq!(list_content(&fix, "xyz"), "xyz/789/xyz789.jpg\n");
    }

    #[test]
    fn existing_destination_is_skipped() {
        let fix = fixture(&["abc123", "abc456", "xyz789"]);
        place(&fix.req.dest_root, "abc123", "already here");

        let report = scan(&fix.req, &DlprepConfig::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.appended, 2);
        assert_eq!(report.total, 3);
        assert!(report.is_balanced());

        assert_eq!(list_content(&fix, "abc"), "abc/456/abc456.jpg\n");
    }

    #[test]
    fn alternate_source_is_hard_linked() {
        let fix = fixture(&["abc123"]);
        place(&fix.req.alt_root, "abc123", "superset copy");

        let report = scan(&fix.req, &DlprepConfig::default()).unwrap();
        assert_eq!(report.linked, 1);
        assert_eq!(report.appended, 0);
        assert_eq!(report.total, 1);

        let dst = fix.req.dest_root.join("abc/123/abc123.jpg");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "superset copy");
        // No list file for a fully linked partition.
        assert!(!fix.req.lists_dir.join("abc").exists());
    }

    #[cfg(unix)]
    #[test]
    fn hard_link_shares_inode_with_source() {
        use std::os::unix::fs::MetadataExt;

        let fix = fixture(&["abc123"]);
        place(&fix.req.alt_root, "abc123", "x");
        scan(&fix.req, &DlprepConfig::default()).unwrap();

        let src = fix.req.alt_root.join("abc/123/abc123.jpg");
        let dst = fix.req.dest_root.join("abc/123/abc123.jpg");
        assert_eq!(
            fs::metadata(&src).unwrap().ino(),
            fs::metadata(&dst).unwrap().ino()
        );
    }

    #[test]
    fn second_run_skips_linked_and_relists_appended() {
        let fix = fixture(&["abc123", "abc456", "xyz789"]);
        place(&fix.req.alt_root, "abc123", "superset copy");
        let cfg = DlprepConfig::default();

        let first = scan(&fix.req, &cfg).unwrap();
        assert_eq!(first.linked, 1);
        assert_eq!(first.appended, 2);

        let second = scan(&fix.req, &cfg).unwrap();
        // The linked file now exists; list-only checksums stay eligible
        // because no file was created for them.
        assert_eq!(second.skipped, 1);
        assert_eq!(second.linked, 0);
        assert_eq!(second.appended, 2);
        assert_eq!(second.total, 3);

        // Lists are append-mode, so the second run extends them.
        assert_eq!(
            list_content(&fix, "abc"),
            "abc/456/abc456.jpg\nabc/456/abc456.jpg\n"
        );
    }

    #[test]
    fn destination_beats_alternate_source() {
        let fix = fixture(&["abc123"]);
        place(&fix.req.dest_root, "abc123", "local");
        place(&fix.req.alt_root, "abc123", "superset");

        let report = scan(&fix.req, &DlprepConfig::default()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.linked, 0);
        assert_eq!(
            fs::read_to_string(fix.req.dest_root.join("abc/123/abc123.jpg")).unwrap(),
            "local"
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let fix = fixture(&["abc123", "", "xyz789", ""]);
        let report = scan(&fix.req, &DlprepConfig::default()).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.appended, 2);
        assert!(report.is_balanced());
    }

    #[test]
    fn short_checksum_aborts() {
        let fix = fixture(&["abc123", "xy"]);
        let err = scan(&fix.req, &DlprepConfig::default()).unwrap_err();
        let prep = err.downcast_ref::<PrepError>().expect("PrepError");
        match prep {
            PrepError::ShortChecksum { line, token } => {
                assert_eq!(*line, 2);
                assert_eq!(token, "xy");
            }
            other => panic!("expected ShortChecksum, got {other:?}"),
        }
        // The valid first line was already appended before the abort.
        assert_eq!(list_content(&fix, "abc"), "abc/123/abc123.jpg\n");
    }

    #[test]
    fn missing_input_file_is_fatal() {
        let fix = fixture(&[]);
        let mut req = fix.req.clone();
        req.checksums = req.checksums.with_file_name("nope.txt");
        let err = scan(&req, &DlprepConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::MissingInput(_))
        ));
    }

    #[test]
    fn missing_lists_dir_is_fatal() {
        let fix = fixture(&["abc123"]);
        let mut req = fix.req.clone();
        req.lists_dir = req.lists_dir.with_file_name("nope");
        let err = scan(&req, &DlprepConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::MissingListsDir(_))
        ));
    }

    #[test]
    fn held_mode_matches_sorted_lists_on_unsorted_input() {
        let fix = fixture(&["abc123", "xyz789", "abc456"]);
        let cfg = DlprepConfig {
            hold_open_handles: true,
            ..DlprepConfig::default()
        };
        let report = scan(&fix.req, &cfg).unwrap();
        assert_eq!(report.appended, 3);
        assert_eq!(
            list_content(&fix, "abc"),
            "abc/123/abc123.jpg\nabc/456/abc456.jpg\n"
        );
        assert_eq!(list_content(&fix, "xyz"), "xyz/789/xyz789.jpg\n");
    }

    #[test]
    fn configured_extension_flows_into_paths() {
        let fix = fixture(&["abc123"]);
        let cfg = DlprepConfig {
            extension: "png".to_string(),
            ..DlprepConfig::default()
        };
        scan(&fix.req, &cfg).unwrap();
        assert_eq!(list_content(&fix, "abc"), "abc/123/abc123.png\n");
    }
}
