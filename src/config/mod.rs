//! Configuration management for the mod loader
//!
//! Handles configuration loading from TOML or JSON files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "mod_loader=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

/// Mod loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directory scanned (one level) for mod packages
    #[serde(default = "default_mods_dir")]
    pub mods_dir: PathBuf,

    /// Descriptor file name inside archives and raw mod directories
    #[serde(default = "default_descriptor_name")]
    pub descriptor_name: String,

    /// File extensions treated as archive bundles
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// File extensions treated as native modules
    #[serde(default = "default_native_extensions")]
    pub native_extensions: Vec<String>,

    /// File extensions treated as container assets
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// Accept descriptor-less development directories, named after the directory
    #[serde(default = "default_true")]
    pub allow_raw_mods: bool,

    /// Stop the cycle at the first stage that recorded problems
    #[serde(default)]
    pub abort_on_problems: bool,

    /// Identifiers discovered but never registered
    #[serde(default)]
    pub disabled_mods: Vec<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_true() -> bool {
    true
}

fn default_mods_dir() -> PathBuf {
    PathBuf::from("mods")
}

fn default_descriptor_name() -> String {
    "mod.toml".to_string()
}

fn default_archive_extensions() -> Vec<String> {
    vec!["zip".to_string(), "smod".to_string()]
}

fn default_native_extensions() -> Vec<String> {
    vec!["dll".to_string(), "so".to_string(), "dylib".to_string()]
}

fn default_asset_extensions() -> Vec<String> {
    vec!["pak".to_string()]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mods_dir: default_mods_dir(),
            descriptor_name: default_descriptor_name(),
            archive_extensions: default_archive_extensions(),
            native_extensions: default_native_extensions(),
            asset_extensions: default_asset_extensions(),
            allow_raw_mods: true,
            abort_on_problems: false,
            disabled_mods: Vec::new(),
            logging: None,
        }
    }
}

impl LoaderConfig {
    /// Configuration with defaults for `mods_dir`
    pub fn for_dir<P: AsRef<Path>>(mods_dir: P) -> Self {
        Self {
            mods_dir: mods_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a file, picking the format by extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
