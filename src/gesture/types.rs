use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    #[default]
    PlayPause,
    NextTrack,
    PrevTrack,
    PlayCurrent,
    NextSong,
    PrevSong,
    TogglePause,
    RestartSong,
}

impl MediaAction {
    /// System media keys first, then soundboard transport actions.
    pub const ALL: [MediaAction; 8] = [
        Self::PlayPause,
        Self::NextTrack,
        Self::PrevTrack,
        Self::PlayCurrent,
        Self::NextSong,
        Self::PrevSong,
        Self::TogglePause,
        Self::RestartSong,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayPause => "play_pause",
            Self::NextTrack => "next_track",
            Self::PrevTrack => "prev_track",
            Self::PlayCurrent => "play_current",
            Self::NextSong => "next_song",
            Self::PrevSong => "prev_song",
            Self::TogglePause => "toggle_pause",
            Self::RestartSong => "restart_song",
        }
    }

    /// Human label, e.g. `Prev Track`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PlayPause => "Play/Pause",
            Self::NextTrack => "Next Track",
            Self::PrevTrack => "Prev Track",
            Self::PlayCurrent => "Play Current",
            Self::NextSong => "Next Song",
            Self::PrevSong => "Prev Song",
            Self::TogglePause => "Toggle Pause",
            Self::RestartSong => "Restart Song",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownMediaAction(pub String);

impl fmt::Display for UnknownMediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown media action `{}` (use ", self.0)?;
        for (idx, action) in MediaAction::ALL.iter().enumerate() {
            if idx > 0 {
                f.write_str("|")?;
            }
            f.write_str(action.as_str())?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for UnknownMediaAction {}

impl FromStr for MediaAction {
    type Err = UnknownMediaAction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == raw)
            .ok_or_else(|| UnknownMediaAction(raw.to_owned()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GestureKind {
    Clicks(u32),
    Hold,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub action: MediaAction,
    pub t_ms: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineAction {
    Dispatch(Gesture),
    HoldProgress { percent: u8 },
    SequenceDiscarded { clicks: u32, reason: RejectReason },
}

pub type ActionBuffer = heapless::Vec<EngineAction, ACTION_BUFFER_MAX>;

/// Upper bound of actions produced by one tick: a hold firing discards the
/// pending sequence and dispatches itself.
pub const ACTION_BUFFER_MAX: usize = 2;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum RejectReason {
    #[default]
    None = 0,
    Debounced = 1,
    Noise = 2,
    LongPress = 3,
    UnmappedCount = 4,
    HoldPreempted = 5,
    SourceLost = 6,
}

impl RejectReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Debounced => "debounced",
            Self::Noise => "noise",
            Self::LongPress => "long_press",
            Self::UnmappedCount => "unmapped_count",
            Self::HoldPreempted => "hold_preempted",
            Self::SourceLost => "source_lost",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum EngineStateId {
    #[default]
    Idle = 0,
    Pressed = 1,
    Holding = 2,
}
