//! Per-partition download list files.
//!
//! A `ListSet` owns the open handles for the lists directory. Files are
//! opened lazily in create+append mode, so re-running over the same lists
//! directory extends the existing lists instead of clobbering them.

use anyhow::{Context, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Strategy for holding list handles across the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    /// At most one open handle, closed whenever the partition key changes.
    /// Optimal for sorted input; unsorted input stays correct (append mode)
    /// but reopens the same list repeatedly.
    Sorted,
    /// One handle per distinct partition key, opened at most once per run
    /// and held until the set is dropped. No sort-order assumption; bounded
    /// by the 4096 possible keys.
    Held,
}

/// Append-only writers for the per-partition download lists.
pub struct ListSet {
    dir: PathBuf,
    mode: HandleMode,
    current: Option<(String, File)>,
    held: HashMap<String, File>,
}

fn open_list(dir: &Path, key: &str) -> Result<File> {
    let path = dir.join(key);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open list file {}", path.display()))
}

impl ListSet {
    pub fn new(dir: &Path, mode: HandleMode) -> Self {
        Self {
            dir: dir.to_path_buf(),
            mode,
            current: None,
            held: HashMap::new(),
        }
    }

    /// Notes the partition key of the current input line. In sorted mode a
    /// key change closes the open handle; the next append reopens lazily.
    /// This runs for every line, including ones that end up skipped or
    /// linked, so the handle never outlives its partition's run of lines.
    pub fn advance(&mut self, key: &str) {
        if self.mode != HandleMode::Sorted {
            return;
        }
        if let Some((open_key, _)) = &self.current {
            if open_key != key {
                // Dropping the handle closes the file.
                self.current = None;
            }
        }
    }

    /// Appends one relative path (plus newline) to the list named by `key`.
    pub fn append(&mut self, key: &str, rel: &Path) -> Result<()> {
        let line = format!("{}\n", rel.display());
        let file = match self.mode {
            HandleMode::Sorted => {
                let reopen = match &self.current {
                    Some((open_key, _)) => open_key != key,
                    None => true,
                };
                if reopen {
                    let file = open_list(&self.dir, key)?;
                    self.current = Some((key.to_string(), file));
                }
                match &mut self.current {
                    Some((_, file)) => file,
                    // Unreachable: just assigned above.
                    None => anyhow::bail!("no open list handle for '{key}'"),
                }
            }
            HandleMode::Held => match self.held.entry(key.to_string()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(v) => v.insert(open_list(&self.dir, key)?),
            },
        };
        file.write_all(line.as_bytes())
            .with_context(|| format!("append to list '{key}'"))?;
        Ok(())
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        match self.mode {
            HandleMode::Sorted => usize::from(self.current.is_some()),
            HandleMode::Held => self.held.len(),
        }
    }
}
