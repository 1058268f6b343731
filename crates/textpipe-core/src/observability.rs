//! Process-wide `tracing` subscriber setup.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "textpipe.logs.jsonl";

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub enabled: bool,
    /// Filter directive; `None` falls back to `RUST_LOG`, then `info`.
    pub level: Option<String>,
    /// When set, events are written as JSON lines to this file.
    pub json_log_path: Option<PathBuf>,
}

impl ObservabilitySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("TEXTPIPE_OBSERVABILITY_ENABLED")
            .map(|v| parse_bool(&v).unwrap_or(true))
            .unwrap_or(true);
        Self {
            enabled,
            level: lookup("TEXTPIPE_LOG_LEVEL").filter(|v| !v.trim().is_empty()),
            json_log_path: lookup("TEXTPIPE_JSON_LOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
        {
            return filter;
        }
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Installs the global subscriber once per process, configured from the environment.
///
/// - `TEXTPIPE_OBSERVABILITY_ENABLED`: set to `false` to install nothing.
/// - `TEXTPIPE_LOG_LEVEL`: filter directive (`info`, `textpipe_core=debug`, ...).
/// - `TEXTPIPE_JSON_LOG_PATH`: JSONL output file. Without it, logs go to stderr
///   in compact form so stdout stays free for results.
pub fn init_observability() {
    init_with(ObservabilitySettings::from_env());
}

/// Same as [`init_observability`] with explicit settings.
pub fn init_with(settings: ObservabilitySettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let env_filter = settings.env_filter();
        match &settings.json_log_path {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let _ = std::fs::create_dir_all(dir);
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_LOG_FILE);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = ObservabilitySettings::from_lookup(|_| None);
        assert!(settings.enabled);
        assert_eq!(settings.level, None);
        assert_eq!(settings.json_log_path, None);
    }

    #[test]
    fn reads_flag_level_and_path() {
        let settings = ObservabilitySettings::from_lookup(|key| match key {
            "TEXTPIPE_OBSERVABILITY_ENABLED" => Some("off".into()),
            "TEXTPIPE_LOG_LEVEL" => Some("debug".into()),
            "TEXTPIPE_JSON_LOG_PATH" => Some("logs/run.jsonl".into()),
            _ => None,
        });
        assert!(!settings.enabled);
        assert_eq!(settings.level.as_deref(), Some("debug"));
        assert_eq!(settings.json_log_path, Some(PathBuf::from("logs/run.jsonl")));
    }

    #[test]
    fn unknown_flag_value_keeps_logging_on() {
        assert_eq!(parse_bool("maybe"), None);
        let settings = ObservabilitySettings::from_lookup(|key| {
            (key == "TEXTPIPE_OBSERVABILITY_ENABLED").then(|| "maybe".to_string())
        });
        assert!(settings.enabled);
    }
}
