//! TOML Configuration File Support
//!
//! Daemon settings live in `~/.config/ai-balloon/overlay.toml`. The balloon's
//! own key space is separate (see [`crate::descript`]).
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the daemon through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [display]
//! tick_ms = 10
//! scale = 100
//!
//! [session]
//! sender = "Ai_builtin"
//! connect_timeout_ms = 5000
//!
//! [fonts]
//! default_family = "IPAGothic"
//! families = ["IPAGothic", "Noto Sans CJK JP"]
//! cell_width = 8
//! line_height = 16
//!
//! [balloon]
//! directory = "/usr/share/ai-balloon/default"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatcher::MIN_SCALE;

/// Sender name announced on the session channel
pub const DEFAULT_SENDER: &str = "Ai_builtin";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Display section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Dispatcher tick interval in milliseconds
    pub tick_ms: Option<u64>,

    /// Initial scale in percent
    pub scale: Option<u32>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// `Sender` header value
    pub sender: Option<String>,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Fonts section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsToml {
    /// Family behind the `default` font reference
    pub default_family: Option<String>,

    /// Families reported as installed
    pub families: Option<Vec<String>>,

    /// Cell width of the monospace service in pixels
    pub cell_width: Option<i32>,

    /// Line height of the monospace service in pixels
    pub line_height: Option<i32>,
}

/// Balloon section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalloonToml {
    /// Directory used when no `Initialize` request names one
    pub directory: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayToml {
    /// Display configuration section
    pub display: DisplayToml,

    /// Session configuration section
    pub session: SessionToml,

    /// Fonts configuration section
    pub fonts: FontsToml,

    /// Balloon configuration section
    pub balloon: BalloonToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved daemon configuration
#[derive(Clone, Debug)]
pub struct OverlayConfig {
    /// Dispatcher tick interval
    pub tick: Duration,

    /// Initial scale in percent
    pub scale: u32,

    /// `Sender` header value
    pub sender: String,

    /// Session connect timeout
    pub connect_timeout: Duration,

    /// Family behind the `default` font reference
    pub default_family: Option<String>,

    /// Families reported as installed
    pub families: Vec<String>,

    /// Monospace cell width in pixels
    pub cell_width: i32,

    /// Monospace line height in pixels
    pub line_height: i32,

    /// Fallback balloon directory
    pub balloon_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            scale: 100,
            sender: DEFAULT_SENDER.to_string(),
            connect_timeout: Duration::from_millis(5000),
            default_family: None,
            families: vec!["monospace".to_string()],
            cell_width: 8,
            line_height: 16,
            balloon_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl OverlayConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make the overlay unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::ValidationError(
                "display.tick_ms must be greater than 0".to_string(),
            ));
        }
        if self.scale < MIN_SCALE {
            return Err(ConfigError::ValidationError(format!(
                "display.scale must be at least {MIN_SCALE}, got {}",
                self.scale
            )));
        }
        if self.cell_width <= 0 || self.line_height <= 0 {
            return Err(ConfigError::ValidationError(
                "fonts.cell_width and fonts.line_height must be positive".to_string(),
            ));
        }
        if self.sender.is_empty() {
            return Err(ConfigError::ValidationError(
                "session.sender must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/ai-balloon/overlay.toml` or
/// `~/.config/ai-balloon/overlay.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ai-balloon").join("overlay.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<OverlayConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the merged result fails [`OverlayConfig::validate`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<OverlayConfig, ConfigError> {
    let mut config = OverlayConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: OverlayToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut OverlayConfig, toml: &OverlayToml) {
    // Display
    if let Some(ms) = toml.display.tick_ms {
        config.tick = Duration::from_millis(ms);
    }
    if let Some(scale) = toml.display.scale {
        config.scale = scale;
    }

    // Session
    if let Some(ref sender) = toml.session.sender {
        config.sender = sender.clone();
    }
    if let Some(ms) = toml.session.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }

    // Fonts
    if toml.fonts.default_family.is_some() {
        config.default_family = toml.fonts.default_family.clone();
    }
    if let Some(ref families) = toml.fonts.families {
        if !families.is_empty() {
            config.families = families.clone();
        }
    }
    if let Some(w) = toml.fonts.cell_width {
        config.cell_width = w;
    }
    if let Some(h) = toml.fonts.line_height {
        config.line_height = h;
    }

    // Balloon
    if toml.balloon.directory.is_some() {
        config.balloon_dir = toml.balloon.directory.clone();
    }
}

fn apply_env_config(config: &mut OverlayConfig) {
    if let Ok(tick) = std::env::var("AI_BALLOON_TICK_MS") {
        if let Ok(ms) = tick.parse::<u64>() {
            config.tick = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(scale) = std::env::var("AI_BALLOON_SCALE") {
        if let Ok(s) = scale.parse::<u32>() {
            config.scale = s;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(sender) = std::env::var("AI_BALLOON_SENDER") {
        if !sender.is_empty() {
            config.sender = sender;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(timeout) = std::env::var("AI_BALLOON_CONNECT_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.connect_timeout = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(dir) = std::env::var("AI_BALLOON_DIR") {
        if !dir.is_empty() {
            config.balloon_dir = Some(PathBuf::from(dir));
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Tick interval override (milliseconds)
    pub tick_ms: Option<u64>,

    /// Scale override (percent)
    pub scale: Option<u32>,

    /// Sender override
    pub sender: Option<String>,

    /// Balloon directory override
    pub balloon_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tick interval override
    #[must_use]
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = Some(ms);
        self
    }

    /// Set scale override
    #[must_use]
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set sender override
    #[must_use]
    pub fn with_sender(mut self, sender: String) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Set balloon directory override
    #[must_use]
    pub fn with_balloon_dir(mut self, dir: PathBuf) -> Self {
        self.balloon_dir = Some(dir);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut OverlayConfig) {
        if self.tick_ms.is_some()
            || self.scale.is_some()
            || self.sender.is_some()
            || self.balloon_dir.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ms) = self.tick_ms {
            config.tick = Duration::from_millis(ms);
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(ref sender) = self.sender {
            config.sender = sender.clone();
        }
        if let Some(ref dir) = self.balloon_dir {
            config.balloon_dir = Some(dir.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
