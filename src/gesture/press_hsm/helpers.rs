use super::*;

impl PressHsm {
    pub(super) fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            last_raw_state: false,
            press_started_at_ms: None,
            last_release_at_ms: None,
            last_press_ms: 0,
            pending_clicks: 0,
            first_click_at_ms: None,
            hold_fired: false,
            hold_deadline_ms: None,
            click_deadline_ms: None,
            progress_bucket: None,
            tick_reason: RejectReason::None,
            last_trace: EngineTraceSample::default(),
        }
    }

    pub(super) fn snapshot(&self) -> DetectionState {
        let state_id = if self.hold_fired {
            EngineStateId::Holding
        } else if self.press_started_at_ms.is_some() {
            EngineStateId::Pressed
        } else {
            EngineStateId::Idle
        };
        DetectionState {
            state_id,
            last_raw_state: self.last_raw_state,
            press_started_at_ms: self.press_started_at_ms,
            last_release_at_ms: self.last_release_at_ms,
            pending_click_count: self.pending_clicks,
            first_click_at_ms: self.first_click_at_ms,
            hold_fired: self.hold_fired,
            hold_deadline_ms: self.hold_deadline_ms,
            click_deadline_ms: self.click_deadline_ms,
            progress_bucket: self.progress_bucket,
        }
    }

    pub(super) fn begin_tick(&mut self) {
        self.tick_reason = RejectReason::None;
    }

    pub(super) fn reject_with_reason(&mut self, reason: RejectReason) {
        self.tick_reason = reason;
    }

    pub(super) fn debounced(&self, now_ms: u64) -> bool {
        self.last_release_at_ms.is_some_and(|released| {
            now_ms.saturating_sub(released) < self.config.debounce_delay_ms
        })
    }

    pub(super) fn begin_press(&mut self, now_ms: u64) {
        self.press_started_at_ms = Some(now_ms);
        self.hold_fired = false;
        self.hold_deadline_ms = Some(now_ms.saturating_add(self.config.hold_threshold_ms));
        self.progress_bucket = None;
    }

    fn end_press(&mut self, now_ms: u64) -> u64 {
        let duration = self
            .press_started_at_ms
            .map_or(0, |started| now_ms.saturating_sub(started));
        self.press_started_at_ms = None;
        self.last_release_at_ms = Some(now_ms);
        self.hold_deadline_ms = None;
        self.hold_fired = false;
        self.progress_bucket = None;
        self.last_press_ms = duration;
        duration
    }

    pub(super) fn release_press(&mut self, context: &mut DispatchContext, now_ms: u64) {
        let duration = self.end_press(now_ms);

        if duration < self.config.detection_threshold_ms {
            self.reject_with_reason(RejectReason::Noise);
            // A window that expired during this press resolves now.
            self.expire_click_window(context, now_ms);
        } else if duration < self.config.click_duration_ceiling_ms {
            self.register_click(context, now_ms);
        } else {
            self.reject_with_reason(RejectReason::LongPress);
            self.discard_sequence(context, RejectReason::LongPress);
        }
    }

    pub(super) fn finish_held_press(&mut self, now_ms: u64) {
        self.end_press(now_ms);
    }

    pub(super) fn fire_hold(&mut self, context: &mut DispatchContext, now_ms: u64) {
        self.hold_deadline_ms = None;
        self.hold_fired = true;
        self.discard_sequence(context, RejectReason::HoldPreempted);
        context.push(EngineAction::Dispatch(Gesture {
            kind: GestureKind::Hold,
            action: self.config.hold_action,
            t_ms: now_ms,
        }));
    }

    fn register_click(&mut self, context: &mut DispatchContext, now_ms: u64) {
        self.pending_clicks = self.pending_clicks.saturating_add(1);
        if self.pending_clicks == 1 {
            self.first_click_at_ms = Some(now_ms);
        }

        match self.config.click_window {
            ClickWindow::ResetPerClick => {
                self.click_deadline_ms = Some(now_ms.saturating_add(self.config.click_timeout_ms));
            }
            ClickWindow::FromFirstClick => {
                let deadline = self
                    .first_click_at_ms
                    .unwrap_or(now_ms)
                    .saturating_add(self.config.click_timeout_ms);
                if now_ms >= deadline {
                    self.finalize_clicks(context, now_ms);
                } else {
                    self.click_deadline_ms = Some(deadline);
                }
            }
        }
    }

    pub(super) fn expire_click_window(&mut self, context: &mut DispatchContext, now_ms: u64) {
        if self
            .click_deadline_ms
            .is_some_and(|deadline| now_ms >= deadline)
        {
            self.finalize_clicks(context, now_ms);
        }
    }

    fn finalize_clicks(&mut self, context: &mut DispatchContext, now_ms: u64) {
        let clicks = self.pending_clicks;
        self.clear_sequence();
        if clicks == 0 {
            return;
        }

        match self.config.click_patterns.get(clicks) {
            Some(action) => context.push(EngineAction::Dispatch(Gesture {
                kind: GestureKind::Clicks(clicks),
                action,
                t_ms: now_ms,
            })),
            None => {
                self.reject_with_reason(RejectReason::UnmappedCount);
                context.push(EngineAction::SequenceDiscarded {
                    clicks,
                    reason: RejectReason::UnmappedCount,
                });
            }
        }
    }

    fn discard_sequence(&mut self, context: &mut DispatchContext, reason: RejectReason) {
        let clicks = self.pending_clicks;
        self.clear_sequence();
        if clicks > 0 {
            self.reject_with_reason(reason);
            context.push(EngineAction::SequenceDiscarded { clicks, reason });
        }
    }

    fn clear_sequence(&mut self) {
        self.pending_clicks = 0;
        self.first_click_at_ms = None;
        self.click_deadline_ms = None;
    }

    pub(super) fn report_progress(&mut self, context: &mut DispatchContext, now_ms: u64) {
        let Some(started) = self.press_started_at_ms else {
            return;
        };
        let held_ms = now_ms.saturating_sub(started);
        if held_ms < self.config.hold_progress_start_ms || held_ms >= self.config.hold_threshold_ms
        {
            return;
        }

        let percent = (held_ms.saturating_mul(100) / self.config.hold_threshold_ms).min(99) as u8;
        let bucket = percent / self.config.hold_progress_step_percent;
        if self.progress_bucket.is_some_and(|last| bucket <= last) {
            return;
        }
        self.progress_bucket = Some(bucket);
        context.push(EngineAction::HoldProgress { percent });
    }

    pub(super) fn reset(&mut self, context: &mut DispatchContext, now_ms: u64) {
        self.begin_tick();
        self.discard_sequence(context, RejectReason::SourceLost);
        self.last_raw_state = false;
        self.press_started_at_ms = None;
        self.last_release_at_ms = None;
        self.last_press_ms = 0;
        self.hold_fired = false;
        self.hold_deadline_ms = None;
        self.progress_bucket = None;
        self.reject_with_reason(RejectReason::SourceLost);
        self.update_trace(EngineStateId::Idle, now_ms);
    }

    pub(super) fn update_trace(&mut self, state_id: EngineStateId, now_ms: u64) {
        let press_ms = self
            .press_started_at_ms
            .map_or(self.last_press_ms, |started| now_ms.saturating_sub(started));
        self.last_trace = EngineTraceSample {
            now_ms,
            state_id,
            reject_reason: self.tick_reason,
            raw_pressed: self.last_raw_state,
            pending_clicks: self.pending_clicks,
            press_ms,
            hold_fired: self.hold_fired,
            hold_armed: self.hold_deadline_ms.is_some(),
            click_window_armed: self.click_deadline_ms.is_some(),
        };
    }
}
