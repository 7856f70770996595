use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::{patterns::ClickPatternTable, types::MediaAction};

pub const DEFAULT_CLICK_TIMEOUT_S: f64 = 0.8;
pub const DEFAULT_DEBOUNCE_DELAY_S: f64 = 0.15;
pub const DEFAULT_DETECTION_THRESHOLD_S: f64 = 0.1;
pub const DEFAULT_HOLD_THRESHOLD_S: f64 = 3.0;
pub const DEFAULT_CLICK_DURATION_CEILING_S: f64 = 1.0;
pub const DEFAULT_HOLD_PROGRESS_START_S: f64 = 1.0;
pub const DEFAULT_HOLD_PROGRESS_STEP_PERCENT: u8 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// How the click window is measured.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickWindow {
    /// Every accepted click re-arms the window from its release.
    #[default]
    ResetPerClick,
    /// The window is anchored at the first click of the sequence.
    FromFirstClick,
}

impl ClickWindow {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResetPerClick => "reset_per_click",
            Self::FromFirstClick => "from_first_click",
        }
    }
}

/// `[detector]` section as written in the config file. Durations are seconds.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorSettings {
    pub click_timeout: f64,
    pub debounce_delay: f64,
    pub detection_threshold: f64,
    pub hold_threshold: f64,
    pub click_duration_ceiling: f64,
    pub click_window: ClickWindow,
    pub hold_action: MediaAction,
    pub hold_progress_start: f64,
    pub hold_progress_step_percent: u8,
    pub click_patterns: BTreeMap<String, MediaAction>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            click_timeout: DEFAULT_CLICK_TIMEOUT_S,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY_S,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD_S,
            hold_threshold: DEFAULT_HOLD_THRESHOLD_S,
            click_duration_ceiling: DEFAULT_CLICK_DURATION_CEILING_S,
            click_window: ClickWindow::ResetPerClick,
            hold_action: MediaAction::PlayPause,
            hold_progress_start: DEFAULT_HOLD_PROGRESS_START_S,
            hold_progress_step_percent: DEFAULT_HOLD_PROGRESS_STEP_PERCENT,
            click_patterns: BTreeMap::from([
                ("3".to_owned(), MediaAction::PrevTrack),
                ("4".to_owned(), MediaAction::NextTrack),
            ]),
        }
    }
}

/// Validated detector timing policy, in milliseconds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DetectorConfig {
    pub click_timeout_ms: u64,
    pub debounce_delay_ms: u64,
    pub detection_threshold_ms: u64,
    pub hold_threshold_ms: u64,
    pub click_duration_ceiling_ms: u64,
    pub click_window: ClickWindow,
    pub hold_action: MediaAction,
    pub hold_progress_start_ms: u64,
    pub hold_progress_step_percent: u8,
    pub click_patterns: ClickPatternTable,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            click_timeout_ms: 800,
            debounce_delay_ms: 150,
            detection_threshold_ms: 100,
            hold_threshold_ms: 3_000,
            click_duration_ceiling_ms: 1_000,
            click_window: ClickWindow::ResetPerClick,
            hold_action: MediaAction::PlayPause,
            hold_progress_start_ms: 1_000,
            hold_progress_step_percent: DEFAULT_HOLD_PROGRESS_STEP_PERCENT,
            click_patterns: [(3, MediaAction::PrevTrack), (4, MediaAction::NextTrack)]
                .into_iter()
                .collect(),
        }
    }
}

impl DetectorConfig {
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self, ConfigError> {
        if !(1..=100).contains(&settings.hold_progress_step_percent) {
            return Err(ConfigError::Validation(
                "detector.hold_progress_step_percent must be within 1..=100".into(),
            ));
        }

        let mut click_patterns = ClickPatternTable::new();
        for (raw_clicks, action) in &settings.click_patterns {
            let clicks = raw_clicks
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|clicks| *clicks > 0)
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "detector.click_patterns keys must be positive integers, got `{raw_clicks}`"
                    ))
                })?;
            if click_patterns.insert(clicks, *action).is_some() {
                return Err(ConfigError::Validation(format!(
                    "detector.click_patterns maps {clicks} clicks more than once"
                )));
            }
        }

        Ok(Self {
            click_timeout_ms: positive_ms("detector.click_timeout", settings.click_timeout)?,
            debounce_delay_ms: positive_ms("detector.debounce_delay", settings.debounce_delay)?,
            detection_threshold_ms: positive_ms(
                "detector.detection_threshold",
                settings.detection_threshold,
            )?,
            hold_threshold_ms: positive_ms("detector.hold_threshold", settings.hold_threshold)?,
            click_duration_ceiling_ms: positive_ms(
                "detector.click_duration_ceiling",
                settings.click_duration_ceiling,
            )?,
            click_window: settings.click_window,
            hold_action: settings.hold_action,
            hold_progress_start_ms: positive_ms(
                "detector.hold_progress_start",
                settings.hold_progress_start,
            )?,
            hold_progress_step_percent: settings.hold_progress_step_percent,
            click_patterns,
        })
    }
}

/// Seconds to whole milliseconds; anything that rounds below 1 ms is rejected.
fn positive_ms(field: &str, seconds: f64) -> Result<u64, ConfigError> {
    let ms = (seconds * 1_000.0).round();
    if !seconds.is_finite() || ms < 1.0 {
        return Err(ConfigError::Validation(format!("{field} must be > 0")));
    }
    if ms > u32::MAX as f64 {
        return Err(ConfigError::Validation(format!(
            "{field} must be below {} seconds",
            u32::MAX / 1_000
        )));
    }
    Ok(ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_compile_to_default_config() {
        let compiled = DetectorConfig::from_settings(&DetectorSettings::default())
            .expect("defaults should validate");
        assert_eq!(compiled, DetectorConfig::default());
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let cases: [(&str, fn(&mut DetectorSettings)); 5] = [
            ("detector.click_timeout must be > 0", |s| s.click_timeout = 0.0),
            ("detector.debounce_delay must be > 0", |s| {
                s.debounce_delay = -0.15
            }),
            ("detector.detection_threshold must be > 0", |s| {
                s.detection_threshold = f64::NAN
            }),
            ("detector.hold_threshold must be > 0", |s| {
                s.hold_threshold = 0.0004
            }),
            ("detector.hold_progress_start must be > 0", |s| {
                s.hold_progress_start = 0.0
            }),
        ];

        for (expected_msg, mutate) in cases {
            let mut settings = DetectorSettings::default();
            mutate(&mut settings);
            match DetectorConfig::from_settings(&settings) {
                Err(ConfigError::Validation(msg)) => assert!(
                    msg.contains(expected_msg),
                    "expected `{expected_msg}`, got `{msg}`"
                ),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn pattern_keys_must_be_positive_integers() {
        for key in ["0", "-3", "three", "2.5"] {
            let mut settings = DetectorSettings::default();
            settings
                .click_patterns
                .insert(key.to_owned(), MediaAction::PlayPause);
            let err = DetectorConfig::from_settings(&settings).expect_err("key should fail");
            assert!(
                err.to_string().contains("positive integers"),
                "unexpected error for `{key}`: {err}"
            );
        }
    }

    #[test]
    fn duplicate_pattern_counts_are_rejected() {
        let mut settings = DetectorSettings::default();
        settings
            .click_patterns
            .insert(" 3".to_owned(), MediaAction::PlayPause);
        let err = DetectorConfig::from_settings(&settings).expect_err("duplicate should fail");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn fractional_seconds_round_to_milliseconds() {
        let settings = DetectorSettings {
            debounce_delay: 0.1504,
            ..DetectorSettings::default()
        };
        let compiled = DetectorConfig::from_settings(&settings).expect("should validate");
        assert_eq!(compiled.debounce_delay_ms, 150);
    }
}
