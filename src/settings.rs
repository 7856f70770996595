use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    actions::{ActionConfig, HandlerKind},
    gesture::{ConfigError, DetectorConfig, DetectorSettings, MediaAction},
};

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("../config/gesture.toml");

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Whole config file as written. Every section and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub detector: DetectorSettings,
    pub runtime: RuntimeSettings,
    pub source: SourceSettings,
    pub actions: ActionSettings,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    pub poll_interval_ms: u64,
    pub auto_reconnect: bool,
    pub reconnect_interval_ms: u64,
    pub status_log_json: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_reconnect: true,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            status_log_json: None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    pub path: Option<PathBuf>,
    pub offset: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionSettings {
    pub handler: HandlerKind,
    pub commands: BTreeMap<String, Vec<String>>,
}

impl Default for ActionSettings {
    fn default() -> Self {
        let argv = |args: &[&str]| -> Vec<String> {
            args.iter().map(|arg| (*arg).to_owned()).collect()
        };
        Self {
            handler: HandlerKind::Log,
            commands: BTreeMap::from([
                ("play_pause".to_owned(), argv(&["playerctl", "play-pause"])),
                ("next_track".to_owned(), argv(&["playerctl", "next"])),
                ("prev_track".to_owned(), argv(&["playerctl", "previous"])),
            ]),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuntimeConfig {
    pub poll_interval_ms: u64,
    pub auto_reconnect: bool,
    pub reconnect_interval_ms: u64,
    pub status_log_json: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            auto_reconnect: true,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            status_log_json: None,
        }
    }
}

/// Everything the program needs, validated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub runtime: RuntimeConfig,
    pub source: SourceSettings,
    pub actions: ActionConfig,
}

pub fn parse_settings_str(raw: &str) -> Result<Settings, ConfigError> {
    toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
}

pub fn parse_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings_str(&raw)
}

pub fn validate_settings(settings: &Settings) -> Result<AppConfig, ConfigError> {
    let detector = DetectorConfig::from_settings(&settings.detector)?;

    let runtime = &settings.runtime;
    if runtime.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "runtime.poll_interval_ms must be > 0".into(),
        ));
    }
    if runtime.reconnect_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "runtime.reconnect_interval_ms must be > 0".into(),
        ));
    }
    if runtime.poll_interval_ms >= detector.detection_threshold_ms {
        log::warn!(
            "runtime.poll_interval_ms={} is not below detector.detection_threshold; short clicks will be missed",
            runtime.poll_interval_ms
        );
    }

    let mut commands = BTreeMap::new();
    for (raw_action, argv) in &settings.actions.commands {
        let action = raw_action.parse::<MediaAction>().map_err(|err| {
            ConfigError::Validation(format!("actions.commands: {err}"))
        })?;
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "actions.commands.{action} must name a program"
            )));
        }
        commands.insert(action, argv.clone());
    }

    Ok(AppConfig {
        detector,
        runtime: RuntimeConfig {
            poll_interval_ms: runtime.poll_interval_ms,
            auto_reconnect: runtime.auto_reconnect,
            reconnect_interval_ms: runtime.reconnect_interval_ms,
            status_log_json: runtime.status_log_json.clone(),
        },
        source: settings.source.clone(),
        actions: ActionConfig {
            handler: settings.actions.handler,
            commands,
        },
    })
}

pub fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    validate_settings(&parse_settings_file(path)?)
}

/// Config file when given, otherwise the built-in defaults.
pub fn load_app_config_or_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_app_config(path),
        None => validate_settings(&parse_settings_str(DEFAULT_SETTINGS_TOML)?),
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.3}s", ms as f64 / 1_000.0)
}

/// Stable text listing of a compiled config, one `key = value` per line.
pub fn render_app_config(config: &AppConfig) -> String {
    let detector = &config.detector;
    let mut out = String::new();

    let _ = writeln!(out, "[detector]");
    let _ = writeln!(out, "click_timeout = {}", seconds(detector.click_timeout_ms));
    let _ = writeln!(out, "debounce_delay = {}", seconds(detector.debounce_delay_ms));
    let _ = writeln!(
        out,
        "detection_threshold = {}",
        seconds(detector.detection_threshold_ms)
    );
    let _ = writeln!(out, "hold_threshold = {}", seconds(detector.hold_threshold_ms));
    let _ = writeln!(
        out,
        "click_duration_ceiling = {}",
        seconds(detector.click_duration_ceiling_ms)
    );
    let _ = writeln!(out, "click_window = {}", detector.click_window.as_str());
    let _ = writeln!(out, "hold_action = {}", detector.hold_action);
    let _ = writeln!(
        out,
        "hold_progress = from {} every {}%",
        seconds(detector.hold_progress_start_ms),
        detector.hold_progress_step_percent
    );
    for (clicks, action) in detector.click_patterns.iter() {
        let _ = writeln!(out, "click_patterns.{clicks} = {action}");
    }

    let runtime = &config.runtime;
    let _ = writeln!(out, "[runtime]");
    let _ = writeln!(out, "poll_interval_ms = {}", runtime.poll_interval_ms);
    let _ = writeln!(out, "auto_reconnect = {}", runtime.auto_reconnect);
    let _ = writeln!(out, "reconnect_interval_ms = {}", runtime.reconnect_interval_ms);
    if let Some(path) = &runtime.status_log_json {
        let _ = writeln!(out, "status_log_json = {}", path.display());
    }

    let _ = writeln!(out, "[source]");
    match &config.source.path {
        Some(path) => {
            let _ = writeln!(out, "path = {}", path.display());
        }
        None => {
            let _ = writeln!(out, "path = (unset)");
        }
    }
    let _ = writeln!(out, "offset = {}", config.source.offset);

    let _ = writeln!(out, "[actions]");
    let _ = writeln!(out, "handler = {}", config.actions.handler.as_str());
    for (action, argv) in &config.actions.commands {
        let _ = writeln!(out, "commands.{action} = {}", argv.join(" "));
    }
    out
}
