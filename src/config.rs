use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api;
use crate::notify;

const DEFAULT_ENV_PREFIX: &str = "FANPAGE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    api::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("fanpage-tui/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_toast_duration", with = "humantime_serde")]
    pub toast_duration: Duration,
    #[serde(default = "default_subject_name")]
    pub subject_name: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            toast_duration: default_toast_duration(),
            subject_name: default_subject_name(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_toast_duration() -> Duration {
    notify::DEFAULT_TOAST_DURATION
}

fn default_subject_name() -> String {
    "Wang Han".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = apply_env(cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.server.base_url.is_empty() {
        base.server.base_url = other.server.base_url;
    }
    if !other.server.user_agent.is_empty() {
        base.server.user_agent = other.server.user_agent;
    }
    if !other.server.timeout.is_zero() {
        base.server.timeout = other.server.timeout;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }
    if !other.ui.toast_duration.is_zero() {
        base.ui.toast_duration = other.ui.toast_duration;
    }
    if !other.ui.subject_name.is_empty() {
        base.ui.subject_name = other.ui.subject_name;
    }

    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }
    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }

    base
}

fn apply_env(mut cfg: Config, prefix: &str) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "server.base_url" => cfg.server.base_url = value,
        "server.user_agent" => cfg.server.user_agent = value,
        "server.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.server.timeout = duration;
            }
        }
        "ui.theme" => cfg.ui.theme = value,
        "ui.toast_duration" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.toast_duration = duration;
            }
        }
        "ui.subject_name" => cfg.ui.subject_name = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fanpage-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated(prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/fanpage-tui.yaml")),
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated("FANPAGE_TEST_DEFAULTS")).unwrap();
        assert_eq!(cfg.ui.theme, "default");
        assert_eq!(cfg.server.base_url, api::DEFAULT_BASE_URL);
        assert_eq!(cfg.ui.toast_duration, Duration::from_secs(3));
        assert!(cfg.log.file.is_none());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "server:\n  base_url: http://fans.example:8080\n  timeout: 5s\nui:\n  toast_duration: 1500ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("FANPAGE_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.server.base_url, "http://fans.example:8080");
        assert_eq!(cfg.server.timeout, Duration::from_secs(5));
        assert_eq!(cfg.ui.toast_duration, Duration::from_millis(1500));
        assert_eq!(cfg.server.user_agent, default_user_agent());
        assert_eq!(cfg.ui.subject_name, "Wang Han");
    }

    #[test]
    fn env_overrides() {
        env::set_var("FANPAGE_TEST_ENV_UI__THEME", "dracula");
        env::set_var("FANPAGE_TEST_ENV_SERVER__TIMEOUT", "7s");
        env::set_var("FANPAGE_TEST_ENV_LOG__FILE", "/tmp/fanpage.log");
        let cfg = load(isolated("FANPAGE_TEST_ENV")).unwrap();
        assert_eq!(cfg.ui.theme, "dracula");
        assert_eq!(cfg.server.timeout, Duration::from_secs(7));
        assert_eq!(cfg.log.file, Some(PathBuf::from("/tmp/fanpage.log")));
        env::remove_var("FANPAGE_TEST_ENV_UI__THEME");
        env::remove_var("FANPAGE_TEST_ENV_SERVER__TIMEOUT");
        env::remove_var("FANPAGE_TEST_ENV_LOG__FILE");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server: [not, a, map]\n").unwrap();
        let err = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("FANPAGE_TEST_BAD".into()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
