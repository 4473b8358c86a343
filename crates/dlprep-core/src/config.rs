use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_log_every() -> u64 {
    10
}

fn default_extension() -> String {
    "jpg".to_string()
}

/// Global configuration loaded from `~/.config/dlprep/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlprepConfig {
    /// Emit a running-counters debug trace every N input lines.
    #[serde(default = "default_log_every")]
    pub log_every: u64,
    /// File extension (no leading dot) appended to derived image paths.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Hold one list handle open per partition instead of assuming sorted
    /// input. Bounded by the 4096 possible partition keys.
    #[serde(default)]
    pub hold_open_handles: bool,
}

impl Default for DlprepConfig {
    fn default() -> Self {
        Self {
            log_every: default_log_every(),
            extension: default_extension(),
            hold_open_handles: false,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlprep")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlprepConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlprepConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DlprepConfig = toml::from_str(&data)?;
    Ok(cfg)
}
