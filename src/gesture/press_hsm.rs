use statig::prelude::*;

use super::{
    config::{ClickWindow, DetectorConfig},
    trace::{DetectionState, EngineTraceSample},
    types::{ActionBuffer, EngineAction, EngineStateId, Gesture, GestureKind, RejectReason},
};

mod engine;
mod helpers;
#[cfg(test)]
mod tests;

pub use engine::{EngineOutput, GestureEngine};

#[derive(Clone, Copy, Debug)]
enum PressHsmEvent {
    Sample { now_ms: u64, pressed: bool },
    SourceLost { now_ms: u64 },
}

#[derive(Default)]
struct DispatchContext {
    actions: ActionBuffer,
}

impl DispatchContext {
    fn push(&mut self, action: EngineAction) {
        // Capacity covers the worst case of a single tick.
        let _ = self.actions.push(action);
    }
}

struct PressHsm {
    config: DetectorConfig,
    last_raw_state: bool,
    press_started_at_ms: Option<u64>,
    last_release_at_ms: Option<u64>,
    last_press_ms: u64,
    pending_clicks: u32,
    first_click_at_ms: Option<u64>,
    hold_fired: bool,
    hold_deadline_ms: Option<u64>,
    click_deadline_ms: Option<u64>,
    progress_bucket: Option<u8>,
    tick_reason: RejectReason,
    last_trace: EngineTraceSample,
}

#[state_machine(initial = "State::idle()")]
impl PressHsm {
    #[state(superstate = "connected")]
    fn idle(&mut self, context: &mut DispatchContext, event: &PressHsmEvent) -> Outcome<State> {
        match event {
            PressHsmEvent::Sample { now_ms, pressed } => {
                self.begin_tick();
                self.expire_click_window(context, *now_ms);
                let was_pressed = core::mem::replace(&mut self.last_raw_state, *pressed);
                let outcome = match (was_pressed, *pressed) {
                    (false, true) => {
                        if self.debounced(*now_ms) {
                            self.reject_with_reason(RejectReason::Debounced);
                            Handled
                        } else {
                            self.begin_press(*now_ms);
                            Transition(State::pressed())
                        }
                    }
                    (true, false) => {
                        // The press edge was debounced; only the release time moves.
                        self.last_release_at_ms = Some(*now_ms);
                        Handled
                    }
                    _ => Handled,
                };
                self.update_trace(EngineStateId::Idle, *now_ms);
                outcome
            }
            PressHsmEvent::SourceLost { .. } => Super,
        }
    }

    #[state(superstate = "connected")]
    fn pressed(&mut self, context: &mut DispatchContext, event: &PressHsmEvent) -> Outcome<State> {
        match event {
            PressHsmEvent::Sample { now_ms, pressed } => {
                self.begin_tick();
                self.last_raw_state = *pressed;
                // An expired click window stays pending here; the release decides.
                let hold_due = self
                    .hold_deadline_ms
                    .is_some_and(|deadline| *now_ms >= deadline);
                let outcome = if hold_due {
                    self.fire_hold(context, *now_ms);
                    if *pressed {
                        Transition(State::holding())
                    } else {
                        self.finish_held_press(*now_ms);
                        Transition(State::idle())
                    }
                } else if *pressed {
                    self.report_progress(context, *now_ms);
                    Handled
                } else {
                    self.release_press(context, *now_ms);
                    Transition(State::idle())
                };
                self.update_trace(EngineStateId::Pressed, *now_ms);
                outcome
            }
            PressHsmEvent::SourceLost { .. } => Super,
        }
    }

    #[state(superstate = "connected")]
    fn holding(&mut self, context: &mut DispatchContext, event: &PressHsmEvent) -> Outcome<State> {
        let _ = context;
        match event {
            PressHsmEvent::Sample { now_ms, pressed } => {
                self.begin_tick();
                self.last_raw_state = *pressed;
                let outcome = if *pressed {
                    Handled
                } else {
                    self.finish_held_press(*now_ms);
                    Transition(State::idle())
                };
                self.update_trace(EngineStateId::Holding, *now_ms);
                outcome
            }
            PressHsmEvent::SourceLost { .. } => Super,
        }
    }

    #[superstate]
    fn connected(
        &mut self,
        context: &mut DispatchContext,
        event: &PressHsmEvent,
    ) -> Outcome<State> {
        match event {
            PressHsmEvent::SourceLost { now_ms } => {
                self.reset(context, *now_ms);
                Transition(State::idle())
            }
            _ => Super,
        }
    }
}
