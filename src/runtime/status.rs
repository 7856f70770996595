use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use serde_json::json;

use crate::gesture::{Gesture, GestureKind, RejectReason};

/// What the runtime reports to the status task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusEvent {
    Connected { t_ms: u64 },
    ConnectFailed { t_ms: u64, retry_at_ms: Option<u64> },
    Disconnected { t_ms: u64 },
    Dispatched { gesture: Gesture },
    DispatchFailed { gesture: Gesture },
    HoldProgress { t_ms: u64, percent: u8 },
    Discarded { t_ms: u64, clicks: u32, reason: RejectReason },
    Stopped { t_ms: u64 },
}

impl StatusEvent {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::Disconnected { .. } => "disconnected",
            Self::Dispatched { .. } => "dispatched",
            Self::DispatchFailed { .. } => "dispatch_failed",
            Self::HoldProgress { .. } => "hold_progress",
            Self::Discarded { .. } => "discarded",
            Self::Stopped { .. } => "stopped",
        }
    }

    pub const fn t_ms(&self) -> u64 {
        match self {
            Self::Dispatched { gesture } | Self::DispatchFailed { gesture } => gesture.t_ms,
            Self::Connected { t_ms }
            | Self::ConnectFailed { t_ms, .. }
            | Self::Disconnected { t_ms }
            | Self::HoldProgress { t_ms, .. }
            | Self::Discarded { t_ms, .. }
            | Self::Stopped { t_ms } => *t_ms,
        }
    }

    pub const fn level(&self) -> log::Level {
        match self {
            Self::Connected { .. } | Self::Dispatched { .. } => log::Level::Info,
            Self::ConnectFailed { .. }
            | Self::Disconnected { .. }
            | Self::DispatchFailed { .. }
            | Self::Stopped { .. } => log::Level::Warn,
            Self::HoldProgress { .. } | Self::Discarded { .. } => log::Level::Debug,
        }
    }
}

/// `Prev Track (3 clicks)` or `Play/Pause (3.0s hold)`.
pub fn gesture_label(gesture: &Gesture, hold_threshold_ms: u64) -> String {
    match gesture.kind {
        GestureKind::Clicks(count) => format!("{} ({count} clicks)", gesture.action.label()),
        GestureKind::Hold => format!(
            "{} ({:.1}s hold)",
            gesture.action.label(),
            hold_threshold_ms as f64 / 1_000.0
        ),
    }
}

/// Writes status events to the `log` facade and, when configured, appends
/// them as JSON lines to a file.
pub struct StatusLog {
    json_file: Option<File>,
    hold_threshold_ms: u64,
}

impl StatusLog {
    pub fn new(json_path: Option<&Path>, hold_threshold_ms: u64) -> std::io::Result<Self> {
        let json_file = match json_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Some(OpenOptions::new().create(true).append(true).open(path)?)
            }
            None => None,
        };
        Ok(Self {
            json_file,
            hold_threshold_ms,
        })
    }

    pub fn message(&self, event: &StatusEvent) -> String {
        match event {
            StatusEvent::Connected { .. } => "Connected".into(),
            StatusEvent::ConnectFailed {
                retry_at_ms: Some(retry_at_ms),
                t_ms,
            } => format!(
                "Connection failed, retrying in {}ms",
                retry_at_ms.saturating_sub(*t_ms)
            ),
            StatusEvent::ConnectFailed {
                retry_at_ms: None, ..
            } => "Connection failed".into(),
            StatusEvent::Disconnected { .. } => "Disconnected".into(),
            StatusEvent::Dispatched { gesture } => gesture_label(gesture, self.hold_threshold_ms),
            StatusEvent::DispatchFailed { gesture } => format!(
                "{} failed",
                gesture_label(gesture, self.hold_threshold_ms)
            ),
            StatusEvent::HoldProgress { percent, .. } => format!("Hold: {percent}%"),
            StatusEvent::Discarded { clicks, reason, .. } => {
                format!("{clicks} clicks discarded ({})", reason.as_str())
            }
            StatusEvent::Stopped { .. } => "Stopped".into(),
        }
    }

    pub fn record(&mut self, event: &StatusEvent) {
        let message = self.message(event);
        log::log!(event.level(), "status: {message} t_ms={}", event.t_ms());

        let Some(file) = &mut self.json_file else {
            return;
        };

        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let entry = json!({
            "ts_ms": ts_ms,
            "t_ms": event.t_ms(),
            "level": event.level().as_str().to_ascii_lowercase(),
            "event": event.kind(),
            "msg": message,
        });

        let _ = writeln!(file, "{}", entry);
        let _ = file.flush();
    }

    pub fn note_dropped(&mut self, dropped: u32) {
        log::warn!("status: {dropped} events dropped, queue full");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::MediaAction;

    #[test]
    fn labels_follow_gesture_kind() {
        let clicks = Gesture {
            kind: GestureKind::Clicks(3),
            action: MediaAction::PrevTrack,
            t_ms: 10,
        };
        let hold = Gesture {
            kind: GestureKind::Hold,
            action: MediaAction::PlayPause,
            t_ms: 20,
        };

        assert_eq!(gesture_label(&clicks, 3_000), "Prev Track (3 clicks)");
        assert_eq!(gesture_label(&hold, 3_000), "Play/Pause (3.0s hold)");
    }

    #[test]
    fn json_lines_carry_event_kind() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("logs").join("status.jsonl");
        let mut log = StatusLog::new(Some(&path), 3_000).expect("status log");

        log.record(&StatusEvent::Connected { t_ms: 0 });
        log.record(&StatusEvent::HoldProgress {
            t_ms: 1_500,
            percent: 50,
        });

        let raw = fs::read_to_string(&path).expect("status file");
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "connected");
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[1]["msg"], "Hold: 50%");
        assert_eq!(lines[1]["t_ms"], 1_500);
    }
}
