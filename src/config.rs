//! Configuration for storage paths and scan defaults.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SCAN_DB_PATH, RESULTS_PATH, RECONBRIDGE_HOME)
//! 2. Config file (.reconbridge/config.yaml)
//! 3. Defaults (~/.reconbridge)
//!
//! Config file discovery:
//! - Searches current directory and parents for .reconbridge/config.yaml
//! - Paths in config file are relative to the project root (the parent of .reconbridge/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::ArtifactPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_DB_PATH: &str = "SCAN_DB_PATH";
pub const ENV_RESULTS_PATH: &str = "RESULTS_PATH";
pub const ENV_HOME: &str = "RECONBRIDGE_HOME";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scans: Option<ScansConfig>,
    #[serde(default)]
    pub artifacts: Option<ArtifactsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Audit database file (relative to project root)
    pub database: Option<String>,
    /// Artifact directory (relative to project root)
    pub results: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScansConfig {
    pub basic_timeout_seconds: Option<u64>,
    pub advanced_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub policy: Option<ArtifactPolicy>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Base directory for defaults
    pub home: PathBuf,
    /// Audit database file
    pub db_path: PathBuf,
    /// Artifact directory
    pub results_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Per-tool timeouts
    pub scans: ScanSettings,
    /// Artifact persistence
    pub artifacts: ArtifactSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub basic_timeout_seconds: u64,
    pub advanced_timeout_seconds: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            basic_timeout_seconds: 600,     // 10 min
            advanced_timeout_seconds: 1800, // 30 min
        }
    }
}

impl ScanSettings {
    pub fn basic_timeout(&self) -> Duration {
        Duration::from_secs(self.basic_timeout_seconds)
    }

    pub fn advanced_timeout(&self) -> Duration {
        Duration::from_secs(self.advanced_timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSettings {
    pub policy: ArtifactPolicy,
}

impl ResolvedConfig {
    /// Defaults rooted at `home`
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            db_path: home.join("scans.db"),
            results_dir: home.join("results"),
            home,
            config_file: None,
            scans: ScanSettings::default(),
            artifacts: ArtifactSettings::default(),
        }
    }

    /// Replace the storage paths (CLI overrides)
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, results_dir: Option<PathBuf>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(results_dir) = results_dir {
            self.results_dir = results_dir;
        }
        self
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".reconbridge").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Resolve configuration from an environment lookup, an optional config file
/// and a default home directory
fn resolve<F>(env: F, config_file: Option<PathBuf>, default_home: PathBuf) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let home = env(ENV_HOME).map(PathBuf::from).unwrap_or(default_home);
    let mut resolved = ResolvedConfig::with_home(home);

    if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // Base directory is the parent of .reconbridge/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent() // .reconbridge/
            .and_then(|p| p.parent()) // project root
            .unwrap_or(Path::new("."));

        if let Some(ref db) = config.paths.database {
            resolved.db_path = resolve_path(base_dir, db);
        }
        if let Some(ref results) = config.paths.results {
            resolved.results_dir = resolve_path(base_dir, results);
        }

        if let Some(scans) = config.scans {
            let defaults = ScanSettings::default();
            resolved.scans = ScanSettings {
                basic_timeout_seconds: scans
                    .basic_timeout_seconds
                    .unwrap_or(defaults.basic_timeout_seconds),
                advanced_timeout_seconds: scans
                    .advanced_timeout_seconds
                    .unwrap_or(defaults.advanced_timeout_seconds),
            };
        }

        if let Some(policy) = config.artifacts.and_then(|a| a.policy) {
            resolved.artifacts.policy = policy;
        }
    }

    // Environment always wins over the config file
    if let Some(db) = env(ENV_DB_PATH) {
        resolved.db_path = PathBuf::from(db);
    }
    if let Some(results) = env(ENV_RESULTS_PATH) {
        resolved.results_dir = PathBuf::from(results);
    }

    resolved.config_file = config_file;
    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".reconbridge");

    resolve(
        |key| std::env::var(key).ok().filter(|v| !v.is_empty()),
        find_config_file(),
        default_home,
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
