pub mod config;
pub mod patterns;
pub mod press_hsm;
pub mod trace;
pub mod types;

pub use config::{ClickWindow, ConfigError, DetectorConfig, DetectorSettings};
pub use patterns::ClickPatternTable;
pub use press_hsm::{EngineOutput, GestureEngine};
pub use trace::{DetectionState, EngineTraceSample};
pub use types::{
    ActionBuffer, EngineAction, EngineStateId, Gesture, GestureKind, MediaAction, RejectReason,
    UnknownMediaAction,
};
