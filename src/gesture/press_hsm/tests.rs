use super::super::types::MediaAction;
use super::*;

const POLL_MS: u64 = 10;

struct Script {
    engine: GestureEngine,
    now_ms: u64,
    gestures: std::vec::Vec<Gesture>,
    discarded: std::vec::Vec<(u32, RejectReason)>,
    progress: std::vec::Vec<u8>,
    reasons: std::vec::Vec<RejectReason>,
}

impl Script {
    fn new(config: DetectorConfig) -> Self {
        Self {
            engine: GestureEngine::new(config),
            now_ms: 0,
            gestures: std::vec::Vec::new(),
            discarded: std::vec::Vec::new(),
            progress: std::vec::Vec::new(),
            reasons: std::vec::Vec::new(),
        }
    }

    fn drain(&mut self, output: EngineOutput) {
        if output.trace.reject_reason != RejectReason::None {
            self.reasons.push(output.trace.reject_reason);
        }
        for action in output.actions {
            match action {
                EngineAction::Dispatch(gesture) => self.gestures.push(gesture),
                EngineAction::HoldProgress { percent } => self.progress.push(percent),
                EngineAction::SequenceDiscarded { clicks, reason } => {
                    self.discarded.push((clicks, reason))
                }
            }
        }
    }

    /// Polls `pressed` every `POLL_MS` for `duration_ms`, starting now.
    fn level(&mut self, pressed: bool, duration_ms: u64) -> &mut Self {
        let end_ms = self.now_ms + duration_ms;
        while self.now_ms < end_ms {
            let output = self.engine.tick(self.now_ms, pressed);
            self.drain(output);
            self.now_ms += POLL_MS;
        }
        self.now_ms = end_ms;
        self
    }

    fn press(&mut self, duration_ms: u64) -> &mut Self {
        self.level(true, duration_ms)
    }

    fn release(&mut self, duration_ms: u64) -> &mut Self {
        self.level(false, duration_ms)
    }

    /// One released sample at the current time, closing a silence interval.
    fn settle(&mut self) -> &mut Self {
        let output = self.engine.tick(self.now_ms, false);
        self.drain(output);
        self
    }

    fn clicks(&mut self, count: usize, press_ms: u64, gap_ms: u64) -> &mut Self {
        for idx in 0..count {
            if idx > 0 {
                self.release(gap_ms);
            }
            self.press(press_ms);
        }
        self
    }
}

#[test]
fn three_clicks_then_silence_dispatch_prev_track_once() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(3, 200, 300).release(800).settle();

    assert_eq!(
        script.gestures,
        std::vec![Gesture {
            kind: GestureKind::Clicks(3),
            action: MediaAction::PrevTrack,
            t_ms: 2_000,
        }]
    );
    assert_eq!(script.engine.state().pending_click_count, 0);
}

#[test]
fn four_clicks_dispatch_next_track() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(4, 200, 300).release(800).settle();

    let actions: std::vec::Vec<_> = script.gestures.iter().map(|g| g.action).collect();
    assert_eq!(actions, std::vec![MediaAction::NextTrack]);
}

#[test]
fn two_clicks_are_unmapped_and_dispatch_nothing() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(2, 200, 300).release(900).settle();

    assert!(script.gestures.is_empty());
    assert_eq!(
        script.discarded,
        std::vec![(2, RejectReason::UnmappedCount)]
    );
    assert!(script.engine.state().click_deadline_ms.is_none());
}

#[test]
fn extra_click_replaces_the_mapped_count() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(5, 200, 300).release(800).settle();

    assert!(script.gestures.is_empty());
    assert_eq!(
        script.discarded,
        std::vec![(5, RejectReason::UnmappedCount)]
    );
}

#[test]
fn long_hold_dispatches_hold_without_click() {
    let mut script = Script::new(DetectorConfig::default());
    script.press(3_500).release(1_000).settle();

    assert_eq!(
        script.gestures,
        std::vec![Gesture {
            kind: GestureKind::Hold,
            action: MediaAction::PlayPause,
            t_ms: 3_000,
        }]
    );
    assert!(script.discarded.is_empty());
    assert!(!script.engine.state().hold_fired);
}

#[test]
fn hold_after_clicks_preempts_the_pending_sequence() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(3, 200, 300).release(300).press(3_500).release(1_000).settle();

    assert_eq!(script.gestures.len(), 1);
    assert_eq!(script.gestures[0].kind, GestureKind::Hold);
    assert_eq!(script.discarded, std::vec![(3, RejectReason::HoldPreempted)]);
}

#[test]
fn click_release_after_window_expiry_extends_the_sequence() {
    let mut script = Script::new(DetectorConfig::default());
    // The window closes at 2000, while the fourth press is still down.
    script.clicks(3, 200, 300).release(700).press(300).release(1_000).settle();

    assert_eq!(
        script.gestures,
        std::vec![Gesture {
            kind: GestureKind::Clicks(4),
            action: MediaAction::NextTrack,
            t_ms: 3_000,
        }]
    );
    assert!(script.discarded.is_empty());
}

#[test]
fn noise_release_after_window_expiry_finalizes_at_release() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(3, 200, 300).release(750).press(60).release(1_000).settle();

    assert_eq!(
        script.gestures,
        std::vec![Gesture {
            kind: GestureKind::Clicks(3),
            action: MediaAction::PrevTrack,
            t_ms: 2_010,
        }]
    );
    assert!(script.reasons.contains(&RejectReason::Noise));
}

#[test]
fn hold_over_pending_clicks_fills_one_tick_buffer() {
    let mut engine = GestureEngine::default();
    let mut now_ms = 0;
    for _ in 0..2 {
        engine.tick(now_ms, true);
        engine.tick(now_ms + 200, false);
        now_ms += 500;
    }
    engine.tick(now_ms, true);

    let output = engine.tick(now_ms + 3_000, true);
    assert_eq!(output.actions.len(), super::super::types::ACTION_BUFFER_MAX);
    assert_eq!(
        output.actions[0],
        EngineAction::SequenceDiscarded {
            clicks: 2,
            reason: RejectReason::HoldPreempted,
        }
    );
    assert!(matches!(
        output.actions[1],
        EngineAction::Dispatch(Gesture {
            kind: GestureKind::Hold,
            ..
        })
    ));
}

#[test]
fn presses_below_detection_threshold_never_count() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(5, 50, 300).release(1_000).settle();

    assert!(script.gestures.is_empty());
    assert!(script.discarded.is_empty());
    assert!(script.reasons.contains(&RejectReason::Noise));
    assert_eq!(script.engine.state().pending_click_count, 0);
}

#[test]
fn chatter_within_debounce_delay_is_not_a_click() {
    let mut script = Script::new(DetectorConfig::default());
    script
        .press(200)
        .release(100)
        .press(200)
        .release(300)
        .clicks(2, 200, 300)
        .release(800)
        .settle();

    assert!(script.reasons.contains(&RejectReason::Debounced));
    assert_eq!(script.gestures.len(), 1);
    assert_eq!(script.gestures[0].kind, GestureKind::Clicks(3));
    assert_eq!(script.gestures[0].action, MediaAction::PrevTrack);
}

#[test]
fn long_press_below_hold_discards_pending_clicks() {
    let mut script = Script::new(DetectorConfig::default());
    script
        .clicks(2, 200, 300)
        .release(300)
        .press(1_500)
        .release(1_000)
        .settle();

    assert!(script.gestures.is_empty());
    assert_eq!(script.discarded, std::vec![(2, RejectReason::LongPress)]);
}

#[test]
fn hold_progress_reports_each_bucket_once() {
    let mut script = Script::new(DetectorConfig::default());
    script.press(3_500);

    assert_eq!(script.progress, std::vec![33, 40, 50, 60, 70, 80, 90]);
    assert_eq!(script.gestures.len(), 1);
}

#[test]
fn sparse_poll_past_hold_deadline_still_fires_hold() {
    let mut engine = GestureEngine::default();

    assert!(engine.tick(0, true).is_empty());
    let output = engine.tick(3_500, false);
    let gestures: std::vec::Vec<_> = output.gestures().collect();

    assert_eq!(gestures.len(), 1);
    assert_eq!(gestures[0].kind, GestureKind::Hold);
    assert_eq!(engine.state(), {
        let mut expected = GestureEngine::default();
        let _ = expected.tick(0, true);
        let _ = expected.tick(3_000, true);
        let _ = expected.tick(3_500, false);
        expected.state()
    });
    assert!(!engine.state().press_in_progress());
}

#[test]
fn source_lost_restores_fresh_state_without_dispatch() {
    let mut script = Script::new(DetectorConfig::default());
    script.clicks(2, 200, 300).release(300).press(500);

    let output = script.engine.source_lost(script.now_ms);
    assert!(output.gestures().next().is_none());
    assert_eq!(output.trace.reject_reason, RejectReason::SourceLost);
    assert_eq!(script.engine.state(), GestureEngine::default().state());

    // Behaves like a new engine afterwards, timestamps keep running.
    script.clicks(3, 200, 300).release(800).settle();
    assert_eq!(script.gestures.len(), 1);
    assert_eq!(script.gestures[0].action, MediaAction::PrevTrack);
}

#[test]
fn first_click_window_finalizes_from_sequence_start() {
    let config = DetectorConfig {
        click_window: ClickWindow::FromFirstClick,
        ..DetectorConfig::default()
    };
    let mut script = Script::new(config);
    script.clicks(3, 150, 200).release(100).settle();

    assert_eq!(
        script.gestures,
        std::vec![Gesture {
            kind: GestureKind::Clicks(3),
            action: MediaAction::PrevTrack,
            t_ms: 950,
        }]
    );
}

#[test]
fn poll_with_missing_sample_is_a_disconnect() {
    let mut engine = GestureEngine::default();
    let _ = engine.tick(0, true);
    let output = engine.poll(100, None);

    assert_eq!(output.trace.reject_reason, RejectReason::SourceLost);
    assert!(!engine.state().press_in_progress());
}
