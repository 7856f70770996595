use super::types::{EngineStateId, RejectReason};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EngineTraceSample {
    pub now_ms: u64,
    pub state_id: EngineStateId,
    pub reject_reason: RejectReason,
    pub raw_pressed: bool,
    pub pending_clicks: u32,
    pub press_ms: u64,
    pub hold_fired: bool,
    pub hold_armed: bool,
    pub click_window_armed: bool,
}

/// Observable detection state. Two engines with equal snapshots and equal
/// configs react identically to every future sample.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DetectionState {
    pub state_id: EngineStateId,
    pub last_raw_state: bool,
    pub press_started_at_ms: Option<u64>,
    pub last_release_at_ms: Option<u64>,
    pub pending_click_count: u32,
    pub first_click_at_ms: Option<u64>,
    pub hold_fired: bool,
    pub hold_deadline_ms: Option<u64>,
    pub click_deadline_ms: Option<u64>,
    pub progress_bucket: Option<u8>,
}

impl DetectionState {
    pub fn press_in_progress(&self) -> bool {
        self.press_started_at_ms.is_some()
    }
}
