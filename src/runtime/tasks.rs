use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Duration, Ticker};

use super::{GestureRuntime, StatusEvent, StatusLog};
use crate::{
    actions::ActionHandler,
    source::{Clock, MonotonicClock, SignalSource},
};

pub type HostRuntime = GestureRuntime<Box<dyn SignalSource>, Box<dyn ActionHandler>>;

const STATUS_QUEUE_DEPTH: usize = 32;

pub static STATUS_EVENTS: Channel<CriticalSectionRawMutex, StatusEvent, STATUS_QUEUE_DEPTH> =
    Channel::new();

static DROPPED_STATUS_EVENTS: AtomicU32 = AtomicU32::new(0);

/// Never waits: a full queue drops the event and counts it.
pub fn publish_status(event: StatusEvent) {
    if STATUS_EVENTS.try_send(event).is_err() {
        DROPPED_STATUS_EVENTS.fetch_add(1, Ordering::Relaxed);
    }
}

#[embassy_executor::task]
pub async fn gesture_task(mut runtime: HostRuntime, clock: MonotonicClock) {
    let mut ticker = Ticker::every(Duration::from_millis(runtime.poll_interval_ms()));

    loop {
        for event in runtime.poll_once(clock.now_ms()) {
            publish_status(event);
        }
        if runtime.is_stopped() {
            log::info!("gesture task stopped");
            return;
        }
        ticker.next().await;
    }
}

/// Drains the status queue. Calls `on_stop` after the terminal event.
#[embassy_executor::task]
pub async fn status_task(mut status_log: StatusLog, on_stop: fn()) {
    loop {
        let event = STATUS_EVENTS.receive().await;

        let dropped = DROPPED_STATUS_EVENTS.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            status_log.note_dropped(dropped);
        }

        status_log.record(&event);
        if matches!(event, StatusEvent::Stopped { .. }) {
            on_stop();
            return;
        }
    }
}
