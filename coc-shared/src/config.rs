//! Application configuration: defaults + YAML file + CLI-flag overrides.
//!
//! Discovery order:
//! 1. CLI flags (applied by callers on top of the loaded `AppConfig`).
//! 2. `~/.coc/config.yaml`.
//! 3. Legacy `~/.coc.yaml` — read once and copied to the new path so future
//!    loads hit (2) directly.
//! 4. Built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Auto,
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServeConfig {
    pub port: u16,
    pub host: String,
    pub data_dir: String,
    pub theme: Theme,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            host: "localhost".to_string(),
            data_dir: "~/.coc".to_string(),
            theme: Theme::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub model: Option<String>,
    pub parallel: Option<u32>,
    pub output: OutputFormat,
    pub approve_permissions: bool,
    pub timeout: Option<u32>,
    pub persist: bool,
    pub serve: ServeConfig,
}

const CONFIG_DIR: &str = ".coc";
const CONFIG_FILENAME: &str = "config.yaml";
const LEGACY_CONFIG_FILENAME: &str = ".coc.yaml";

/// Load config from `~/.coc/config.yaml`, migrating the legacy
/// `~/.coc.yaml` by copy on first use. Falls back to defaults on any
/// error, logging a warning rather than failing startup.
pub fn load_app_config() -> AppConfig {
    let Some(home) = home_dir() else {
        tracing::warn!("HOME not set, using default configuration");
        return AppConfig::default();
    };

    let current = home.join(CONFIG_DIR).join(CONFIG_FILENAME);
    if current.is_file() {
        return read_config(&current).unwrap_or_default();
    }

    let legacy = home.join(LEGACY_CONFIG_FILENAME);
    if legacy.is_file() {
        tracing::warn!(
            from = %legacy.display(),
            to = %current.display(),
            "migrating legacy config file"
        );
        if let Some(parent) = current.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::copy(&legacy, &current) {
            tracing::warn!(error = %e, "failed to migrate legacy config, reading it in place");
            return read_config(&legacy).unwrap_or_default();
        }
        return read_config(&current).unwrap_or_default();
    }

    AppConfig::default()
}

fn read_config(path: &Path) -> Option<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                None
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
            None
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.parallel, None);
        assert_eq!(config.output, OutputFormat::Table);
        assert!(!config.approve_permissions);
        assert!(!config.persist);
        assert_eq!(config.serve.port, 4000);
        assert_eq!(config.serve.host, "localhost");
        assert_eq!(config.serve.data_dir, "~/.coc");
        assert_eq!(config.serve.theme, Theme::Auto);
    }

    #[test]
    fn parses_partial_yaml_with_defaults_filled_in() {
        let yaml = "model: gpt-5\nserve:\n  port: 5050\ndataDir: ~/.coc\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model.as_deref(), Some("gpt-5"));
        assert_eq!(config.serve.port, 5050);
        assert_eq!(config.serve.host, "localhost");
    }

    #[test]
    fn expand_tilde_resolves_home() {
        std::env::set_var("HOME", "/home/tester");
        let expanded = expand_tilde("~/.coc");
        assert_eq!(expanded, PathBuf::from("/home/tester/.coc"));
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths_alone() {
        let expanded = expand_tilde("/var/lib/coc");
        assert_eq!(expanded, PathBuf::from("/var/lib/coc"));
    }
}
