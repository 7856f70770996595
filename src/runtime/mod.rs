mod status;
mod tasks;

pub use status::{gesture_label, StatusEvent, StatusLog};
pub use tasks::{gesture_task, publish_status, status_task, HostRuntime, STATUS_EVENTS};

use crate::{
    actions::ActionHandler,
    gesture::{
        types::ACTION_BUFFER_MAX, DetectorConfig, EngineAction, EngineOutput, GestureEngine,
        MediaAction,
    },
    settings::RuntimeConfig,
    source::SignalSource,
};

/// Room for one tick of engine actions plus link transitions.
pub const STATUS_BATCH_MAX: usize = ACTION_BUFFER_MAX + 2;

pub type StatusBatch = heapless::Vec<StatusEvent, STATUS_BATCH_MAX>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkState {
    Disconnected { retry_at_ms: u64 },
    Connected,
    /// Connect failed or source lost, with reconnect disabled. Terminal.
    Stopped,
}

/// Owns the engine, the source and the handler. One `poll_once` per polling
/// period does connect/sample/dispatch in order on the caller's thread.
pub struct GestureRuntime<S, H> {
    engine: GestureEngine,
    source: S,
    handler: H,
    config: RuntimeConfig,
    link: LinkState,
    last_action: Option<MediaAction>,
    dispatch_failures: u32,
}

impl<S, H> GestureRuntime<S, H>
where
    S: SignalSource,
    H: ActionHandler,
{
    pub fn new(detector: DetectorConfig, config: RuntimeConfig, source: S, handler: H) -> Self {
        Self {
            engine: GestureEngine::new(detector),
            source,
            handler,
            config,
            link: LinkState::Disconnected { retry_at_ms: 0 },
            last_action: None,
            dispatch_failures: 0,
        }
    }

    pub fn poll_once(&mut self, now_ms: u64) -> StatusBatch {
        let mut batch = StatusBatch::new();
        match self.link {
            LinkState::Stopped => {}
            LinkState::Disconnected { retry_at_ms } if now_ms < retry_at_ms => {}
            LinkState::Disconnected { .. } => self.try_connect(now_ms, &mut batch),
            LinkState::Connected => match self.source.sample() {
                Some(pressed) => {
                    let output = self.engine.tick(now_ms, pressed);
                    self.apply(output, &mut batch);
                }
                None => {
                    let output = self.engine.source_lost(now_ms);
                    self.apply(output, &mut batch);
                    log::warn!("source {} lost", self.source.describe());
                    push(&mut batch, StatusEvent::Disconnected { t_ms: now_ms });
                    self.schedule_reconnect(now_ms, &mut batch);
                }
            },
        }
        batch
    }

    fn try_connect(&mut self, now_ms: u64, batch: &mut StatusBatch) {
        match self.source.connect() {
            Ok(()) => {
                log::info!("source {} connected", self.source.describe());
                self.link = LinkState::Connected;
                push(batch, StatusEvent::Connected { t_ms: now_ms });
            }
            Err(err) => {
                log::warn!("source {} connect failed: {err}", self.source.describe());
                let retry_at_ms = self
                    .config
                    .auto_reconnect
                    .then(|| now_ms.saturating_add(self.config.reconnect_interval_ms));
                push(
                    batch,
                    StatusEvent::ConnectFailed {
                        t_ms: now_ms,
                        retry_at_ms,
                    },
                );
                if retry_at_ms.is_none() {
                    self.stop(now_ms, batch);
                } else {
                    self.schedule_reconnect(now_ms, batch);
                }
            }
        }
    }

    fn schedule_reconnect(&mut self, now_ms: u64, batch: &mut StatusBatch) {
        if self.config.auto_reconnect {
            self.link = LinkState::Disconnected {
                retry_at_ms: now_ms.saturating_add(self.config.reconnect_interval_ms),
            };
        } else {
            self.stop(now_ms, batch);
        }
    }

    fn stop(&mut self, now_ms: u64, batch: &mut StatusBatch) {
        self.link = LinkState::Stopped;
        push(batch, StatusEvent::Stopped { t_ms: now_ms });
    }

    fn apply(&mut self, output: EngineOutput, batch: &mut StatusBatch) {
        let t_ms = output.trace.now_ms;
        for action in output.actions {
            let event = match action {
                EngineAction::Dispatch(gesture) => match self.handler.dispatch(gesture.action) {
                    Ok(()) => {
                        self.last_action = Some(gesture.action);
                        StatusEvent::Dispatched { gesture }
                    }
                    Err(err) => {
                        self.dispatch_failures = self.dispatch_failures.saturating_add(1);
                        log::warn!("{} handler failed: {err}", self.handler.name());
                        StatusEvent::DispatchFailed { gesture }
                    }
                },
                EngineAction::HoldProgress { percent } => StatusEvent::HoldProgress { t_ms, percent },
                EngineAction::SequenceDiscarded { clicks, reason } => StatusEvent::Discarded {
                    t_ms,
                    clicks,
                    reason,
                },
            };
            push(batch, event);
        }
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_stopped(&self) -> bool {
        self.link == LinkState::Stopped
    }

    pub fn last_action(&self) -> Option<MediaAction> {
        self.last_action
    }

    pub fn dispatch_failures(&self) -> u32 {
        self.dispatch_failures
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.config.poll_interval_ms
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

fn push(batch: &mut StatusBatch, event: StatusEvent) {
    if batch.push(event).is_err() {
        log::warn!("status batch full, dropped {}", event.kind());
    }
}
