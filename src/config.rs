use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for photo-enex.
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs the keys it wants to change.
///
/// # Loading
///
/// ```rust,no_run
/// use photo_enex::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.default_path = "Camera Roll.enex".into();
/// config.workers = 4;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the export goes when `--output` is not given.
    pub output: OutputConfig,
    /// Attributes stamped on the `<en-export>` root.
    pub export: ExportConfig,
    /// Directory walking behaviour.
    pub scan: ScanConfig,
    /// Worker threads for reading and encoding. `0` uses every core.
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_path: String,
}

/// Application identity written into the export header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub application: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Follow symlinks while walking directories.
    pub follow_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            export: ExportConfig::default(),
            scan: ScanConfig::default(),
            workers: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { default_path: "Photos.enex".to_string() }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            application: "Evernote/Windows".to_string(),
            version: "4.x".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { follow_links: true }
    }
}

impl Config {
    /// Resolve the config file path - same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Number of worker threads to use, resolving `0` to the core count.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
