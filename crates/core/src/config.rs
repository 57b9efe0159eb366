use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Configuration for the skills subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SkillsConfig {
    /// Whether skills are enabled
    pub enabled: bool,

    /// Custom skills directory (defaults to ~/.stratus/skills)
    pub skills_dir: Option<PathBuf>,

    /// Maximum number of skills whose full documentation is injected when
    /// the user explicitly asks for everything
    pub full_docs_cap: usize,

    /// Maximum number of trigger-matched skills whose instructions are
    /// injected on a single turn
    pub match_cap: usize,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self { enabled: true, skills_dir: None, full_docs_cap: 10, match_cap: 3 }
    }
}

/// Logging configuration, `[logging]` section of stratus.toml.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for stderr output (like RUST_LOG directives)
    pub level: String,

    /// Output format for stderr: "pretty", "json", "compact"
    pub format: String,

    /// File logging settings
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "pretty".to_string(), file: FileLoggingConfig::default() }
    }
}

/// File logging settings, `[logging.file]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Enable JSON file logging to ~/.stratus/logs/
    pub enabled: bool,
}

/// Root configuration structure for stratus.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Skills subsystem configuration
    pub skills: SkillsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| crate::Error::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        use crate::Error;

        if self.skills.full_docs_cap == 0 {
            return Err(Error::Config("skills.full_docs_cap must be at least 1".to_string()));
        }

        if self.skills.match_cap == 0 {
            return Err(Error::Config("skills.match_cap must be at least 1".to_string()));
        }

        if crate::logging::LogFormat::parse_str(&self.logging.format).is_none() {
            return Err(Error::Config(format!(
                "invalid logging.format: {} (must be pretty, json, or compact)",
                self.logging.format
            )));
        }

        Ok(())
    }
}
