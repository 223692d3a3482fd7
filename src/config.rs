// ABOUTME: Configuration loading for jedi-bridge.
// ABOUTME: Reads ~/.jedi-bridge/config.toml with defaults; CLI flags override at the app layer.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub python: PythonConfig,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: PythonConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Python interpreter and jedi lookup configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Interpreter used to run the completion helper.
    pub binary: String,
    /// Directories the helper appends to sys.path before retrying a failed
    /// jedi import. A vendored copy of jedi can live here.
    pub fallback_jedi_paths: Vec<String>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            binary: "python3".to_string(),
            fallback_jedi_paths: Vec::new(),
        }
    }
}

/// Session behavior toggles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Write a JSONL transcript of every protocol exchange.
    pub transcript: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { transcript: false }
    }
}

impl Config {
    /// Load config from ~/.jedi-bridge/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jedi-bridge")
            .join("config.toml")
    }

    /// Directory where session transcripts are written.
    pub fn sessions_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jedi-bridge")
            .join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.python.binary, "python3");
        assert!(config.python.fallback_jedi_paths.is_empty());
        assert!(!config.session.transcript);
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
[python]
binary = "/usr/bin/python3.12"
fallback_jedi_paths = ["/opt/jedi-bridge/external"]

[session]
transcript = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.python.binary, "/usr/bin/python3.12");
        assert_eq!(
            config.python.fallback_jedi_paths,
            vec!["/opt/jedi-bridge/external".to_string()]
        );
        assert!(config.session.transcript);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml_str = r#"
[session]
transcript = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.python.binary, "python3");
        assert!(config.python.fallback_jedi_paths.is_empty());
        assert!(config.session.transcript);
    }
}
