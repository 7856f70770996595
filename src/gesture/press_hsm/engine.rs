use statig::blocking::IntoStateMachineExt as _;

use super::*;

#[derive(Clone, Debug, Default)]
pub struct EngineOutput {
    pub actions: ActionBuffer,
    pub trace: EngineTraceSample,
}

impl EngineOutput {
    pub fn gestures(&self) -> impl Iterator<Item = Gesture> + '_ {
        self.actions.iter().filter_map(|action| match action {
            EngineAction::Dispatch(gesture) => Some(*gesture),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Button gesture detector. Feed it one raw sample per poll; it returns the
/// gestures that finalized on that tick.
pub struct GestureEngine {
    machine: statig::blocking::StateMachine<PressHsm>,
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl GestureEngine {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            machine: PressHsm::new(config).state_machine(),
        }
    }

    pub fn tick(&mut self, now_ms: u64, pressed: bool) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&PressHsmEvent::Sample { now_ms, pressed }, &mut context);
        self.finish(context)
    }

    /// Abandons any press in progress and returns to the freshly constructed
    /// state. Pending clicks are dropped without dispatch.
    pub fn source_lost(&mut self, now_ms: u64) -> EngineOutput {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&PressHsmEvent::SourceLost { now_ms }, &mut context);
        self.finish(context)
    }

    /// `None` is a failed sample and is treated as a disconnect.
    pub fn poll(&mut self, now_ms: u64, sample: Option<bool>) -> EngineOutput {
        match sample {
            Some(pressed) => self.tick(now_ms, pressed),
            None => self.source_lost(now_ms),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.machine.inner().snapshot()
    }

    fn finish(&self, context: DispatchContext) -> EngineOutput {
        EngineOutput {
            actions: context.actions,
            trace: self.machine.inner().last_trace,
        }
    }
}
