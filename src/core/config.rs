//! # Configuration
//!
//! Browser settings, layered lowest to highest:
//! built-in defaults, `~/.arbor/config.toml`, `ARBOR_*` env vars, CLI flags.
//!
//! The first run writes a fully commented template so every knob is visible.

use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::address::ensure_http_url;

// ============================================================================
// File Layout (every field optional)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ArborConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub browsing: BrowsingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub home_url: Option<String>,
    pub log_level: Option<String>,
    pub tree_width: Option<u16>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BrowsingConfig {
    pub muted_by_default: Option<bool>,
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOME_URL: &str = "https://www.wikipedia.org/";
pub const DEFAULT_TREE_WIDTH: u16 = 34;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_USER_AGENT: &str = concat!("arbor/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Effective Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub home_url: String,
    /// URL the first root opens instead of home, from the command line.
    pub start_url: Option<String>,
    pub log_level: LevelFilter,
    pub tree_width: u16,
    pub muted_by_default: bool,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_string(),
            start_url: None,
            log_level: LevelFilter::Info,
            tree_width: DEFAULT_TREE_WIDTH,
            muted_by_default: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Values taken from command-line flags. `None` = not specified.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub home_url: Option<&'a str>,
    pub start_url: Option<&'a str>,
    pub log_level: Option<&'a str>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.arbor/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".arbor").join("config.toml"))
}

/// Reads `~/.arbor/config.toml`, writing the template when it is absent.
/// A malformed file is an error rather than silently ignored.
pub fn load_config() -> Result<ArborConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("No home directory; browsing with built-in settings");
        return Ok(ArborConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<ArborConfig, ConfigError> {
    if !path.exists() {
        info!("Writing config template to {}", path.display());
        write_template(path);
        return Ok(ArborConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ArborConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Read settings from {}", path.display());
    debug!("{config:?}");
    Ok(config)
}

fn write_template(path: &Path) {
    let template = r#"# Arbor settings. Uncomment a line to change it.
# Environment variables and command-line flags win over this file.

# [general]
# home_url = "https://www.wikipedia.org/"   # Or set ARBOR_HOME_URL env var
# log_level = "info"                        # "off", "error", "warn", "info", "debug", "trace"
# tree_width = 34                           # Columns used by the tab tree pane

# [browsing]
# muted_by_default = true                   # Mute audio when a page becomes ready
# user_agent = "arbor/0.1.0"                # Or set ARBOR_USER_AGENT env var
# request_timeout_secs = 20
"#;

    if let Some(dir) = path.parent()
        && let Err(e) = fs::create_dir_all(dir)
    {
        warn!("Cannot create {}: {e}", dir.display());
        return;
    }
    if let Err(e) = fs::write(path, template) {
        warn!("Cannot write config template: {e}");
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Collapses every settings layer into concrete values.
pub fn resolve(config: &ArborConfig, cli: CliOverrides<'_>) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env(
    config: &ArborConfig,
    cli: CliOverrides<'_>,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Home URL: CLI → env → config → default. Unusable values fall through.
    let home_url = cli
        .home_url
        .map(str::to_string)
        .or_else(|| env("ARBOR_HOME_URL"))
        .or_else(|| config.general.home_url.clone())
        .and_then(|raw| ensure_http_url(&raw))
        .unwrap_or_else(|| DEFAULT_HOME_URL.to_string());

    let start_url = cli.start_url.and_then(ensure_http_url);

    // Log level: CLI → env → config → default
    let log_level = cli
        .log_level
        .map(str::to_string)
        .or_else(|| env("ARBOR_LOG_LEVEL"))
        .or_else(|| config.general.log_level.clone())
        .and_then(|raw| match raw.parse::<LevelFilter>() {
            Ok(level) => Some(level),
            Err(_) => {
                warn!("Ignoring unknown log level {raw:?}");
                None
            }
        })
        .unwrap_or(LevelFilter::Info);

    // User agent: env → config → default
    let user_agent = env("ARBOR_USER_AGENT")
        .or_else(|| config.browsing.user_agent.clone())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    ResolvedConfig {
        home_url,
        start_url,
        log_level,
        tree_width: config
            .general
            .tree_width
            .unwrap_or(DEFAULT_TREE_WIDTH)
            .max(12),
        muted_by_default: config.browsing.muted_by_default.unwrap_or(true),
        user_agent,
        request_timeout: Duration::from_secs(
            config
                .browsing
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ),
    }
}
