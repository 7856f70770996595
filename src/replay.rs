use std::{fs, path::Path};

use crate::gesture::{DetectorConfig, Gesture, GestureEngine, GestureKind};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("gesture sequence mismatch\nexpected: {}\nactual:   {}", .expected.join(", "), .actual.join(", "))]
    Mismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// One recorded poll. `None` marks a failed read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TraceSample {
    pub ms: u64,
    pub sample: Option<bool>,
}

/// Parses `<ms> <0|1|x>` lines. Blank lines and `#` comments are skipped;
/// timestamps must not go backwards.
pub fn parse_trace(raw: &str) -> Result<Vec<TraceSample>, ReplayError> {
    let mut out: Vec<TraceSample> = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = strip_comment(line);
        if trimmed.is_empty() {
            continue;
        }

        let parse_err = |message: String| ReplayError::Parse {
            line: line_no,
            message,
        };
        let mut parts = trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty());
        let (Some(ms_raw), Some(state_raw), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(parse_err(format!("expected `<ms> <0|1|x>`, got `{trimmed}`")));
        };

        let ms = ms_raw
            .parse::<u64>()
            .map_err(|_| parse_err(format!("invalid timestamp `{ms_raw}`")))?;
        let sample = match state_raw {
            "0" => Some(false),
            "1" => Some(true),
            "x" | "X" => None,
            other => return Err(parse_err(format!("invalid state `{other}`"))),
        };
        if let Some(prev) = out.last() {
            if ms < prev.ms {
                return Err(parse_err(format!(
                    "timestamp {ms} goes backwards (previous {})",
                    prev.ms
                )));
            }
        }
        out.push(TraceSample { ms, sample });
    }
    Ok(out)
}

pub fn parse_trace_file(path: &Path) -> Result<Vec<TraceSample>, ReplayError> {
    parse_trace(&read(path)?)
}

fn read(path: &Path) -> Result<String, ReplayError> {
    fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

/// Feeds a trace through a fresh engine. Gaps between recorded samples are
/// filled with ticks every `step_ms` at the last known level, and ticking
/// continues past the final sample long enough for any open hold or click
/// window to resolve.
pub fn replay(config: &DetectorConfig, samples: &[TraceSample], step_ms: u64) -> Vec<Gesture> {
    let step_ms = step_ms.max(1);
    let mut engine = GestureEngine::new(config.clone());
    let mut gestures = Vec::new();
    let mut feed = |engine: &mut GestureEngine, ms: u64, sample: Option<bool>| {
        gestures.extend(engine.poll(ms, sample).gestures());
    };

    for (idx, current) in samples.iter().enumerate() {
        feed(&mut engine, current.ms, current.sample);

        // A lost source produces nothing until the next recorded sample.
        let Some(level) = current.sample else {
            continue;
        };
        let fill_until = match samples.get(idx + 1) {
            Some(next) => next.ms,
            None => current
                .ms
                .saturating_add(config.hold_threshold_ms)
                .saturating_add(config.click_timeout_ms)
                .saturating_add(step_ms),
        };
        let mut ms = current.ms.saturating_add(step_ms);
        while ms < fill_until {
            feed(&mut engine, ms, Some(level));
            ms = ms.saturating_add(step_ms);
        }
    }

    // The trace may end mid-press; release so a pending sequence resolves.
    if let Some(last) = samples.last() {
        if last.sample == Some(true) {
            let release_ms = last
                .ms
                .saturating_add(config.hold_threshold_ms)
                .saturating_add(config.click_timeout_ms)
                .saturating_add(step_ms);
            feed(&mut engine, release_ms, Some(false));
            feed(
                &mut engine,
                release_ms.saturating_add(config.click_timeout_ms),
                Some(false),
            );
        }
    }

    gestures
}

/// `2000 prev_track clicks=3` or `3000 play_pause hold`.
pub fn format_gesture(gesture: &Gesture) -> String {
    match gesture.kind {
        GestureKind::Clicks(count) => {
            format!("{} {} clicks={count}", gesture.t_ms, gesture.action)
        }
        GestureKind::Hold => format!("{} {} hold", gesture.t_ms, gesture.action),
    }
}

/// Expectation files hold one `format_gesture` line per gesture; blank lines
/// and `#` comments are ignored.
pub fn parse_expectation(raw: &str) -> Vec<String> {
    raw.lines()
        .map(strip_comment)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

pub fn parse_expectation_file(path: &Path) -> Result<Vec<String>, ReplayError> {
    Ok(parse_expectation(&read(path)?))
}

pub fn compare_expectation(expected: &[String], gestures: &[Gesture]) -> Result<(), ReplayError> {
    let actual: Vec<String> = gestures.iter().map(format_gesture).collect();
    if actual == expected {
        Ok(())
    } else {
        Err(ReplayError::Mismatch {
            expected: expected.to_vec(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::MediaAction;

    #[test]
    fn trace_lines_accept_comments_and_commas() {
        let samples = parse_trace("# header\n0 1\n200,0 # release\n\n450 x\n").expect("trace");
        assert_eq!(
            samples,
            vec![
                TraceSample { ms: 0, sample: Some(true) },
                TraceSample { ms: 200, sample: Some(false) },
                TraceSample { ms: 450, sample: None },
            ]
        );
    }

    #[test]
    fn malformed_trace_lines_name_the_line() {
        for (raw, line, needle) in [
            ("0 1\n10 2\n", 2, "invalid state `2`"),
            ("abc 1\n", 1, "invalid timestamp"),
            ("0 1\n5 0 7\n", 2, "expected `<ms> <0|1|x>`"),
            ("100 1\n50 0\n", 2, "goes backwards"),
        ] {
            match parse_trace(raw) {
                Err(ReplayError::Parse { line: got, message }) => {
                    assert_eq!(got, line, "{raw:?}");
                    assert!(message.contains(needle), "`{message}` lacks `{needle}`");
                }
                other => panic!("expected parse error for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn edge_only_trace_is_filled_between_samples() {
        let samples = parse_trace("0 1\n200 0\n500 1\n700 0\n1000 1\n1200 0\n").expect("trace");
        let gestures = replay(&DetectorConfig::default(), &samples, 10);

        assert_eq!(
            gestures,
            vec![Gesture {
                kind: GestureKind::Clicks(3),
                action: MediaAction::PrevTrack,
                t_ms: 2_000,
            }]
        );
    }

    #[test]
    fn trace_ending_pressed_still_reports_hold() {
        let samples = parse_trace("0 1\n").expect("trace");
        let lines: Vec<String> = replay(&DetectorConfig::default(), &samples, 10)
            .iter()
            .map(format_gesture)
            .collect();
        assert_eq!(lines, vec!["3000 play_pause hold".to_owned()]);
    }

    #[test]
    fn mismatch_lists_both_sequences() {
        let expected = parse_expectation("# comment\n2000  prev_track clicks=3\n");
        let err = compare_expectation(&expected, &[]).expect_err("mismatch");
        let text = err.to_string();
        assert!(text.contains("expected: 2000 prev_track clicks=3"), "{text}");
        assert!(text.ends_with("actual:   "), "{text}");
    }
}
