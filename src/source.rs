use std::{
    cell::Cell,
    collections::VecDeque,
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use embassy_time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read byte {offset} of {}: {source}", path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        source: std::io::Error,
    },
    #[error("byte {offset} holds {value:#04x}, expected a button state (0 or 1)")]
    InvalidState { offset: u64, value: u8 },
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Where raw button states come from. `sample` returning `None` means the
/// source went away; the caller resets detection and reconnects.
pub trait SignalSource {
    fn connect(&mut self) -> Result<(), SourceError>;
    fn sample(&mut self) -> Option<bool>;
    fn describe(&self) -> String;
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn connect(&mut self) -> Result<(), SourceError> {
        (**self).connect()
    }

    fn sample(&mut self) -> Option<bool> {
        (**self).sample()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        Instant::now()
            .saturating_duration_since(self.origin)
            .as_millis()
    }
}

/// Test clock moved by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Decodes a status byte. Both raw `0`/`1` and their ASCII digits are accepted.
pub fn decode_state_byte(value: u8) -> Option<bool> {
    match value {
        0 | b'0' => Some(false),
        1 | b'1' => Some(true),
        _ => None,
    }
}

/// Reads the button state from a single byte at `offset` of a file that
/// another tool keeps current.
pub struct FileSignalSource {
    path: PathBuf,
    offset: u64,
    file: Option<File>,
}

impl FileSignalSource {
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            file: None,
        }
    }

    fn read_byte(file: &mut File, path: &Path, offset: u64) -> Result<u8, SourceError> {
        let mut byte = [0u8; 1];
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut byte))
            .map_err(|source| SourceError::Read {
                path: path.to_path_buf(),
                offset,
                source,
            })?;
        Ok(byte[0])
    }
}

impl SignalSource for FileSignalSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        self.file = None;
        let mut file = File::open(&self.path).map_err(|source| SourceError::Open {
            path: self.path.clone(),
            source,
        })?;
        let value = Self::read_byte(&mut file, &self.path, self.offset)?;
        if decode_state_byte(value).is_none() {
            return Err(SourceError::InvalidState {
                offset: self.offset,
                value,
            });
        }
        self.file = Some(file);
        Ok(())
    }

    fn sample(&mut self) -> Option<bool> {
        let file = self.file.as_mut()?;
        let state = Self::read_byte(file, &self.path, self.offset)
            .ok()
            .and_then(decode_state_byte);
        if state.is_none() {
            self.file = None;
        }
        state
    }

    fn describe(&self) -> String {
        format!("file {}@{}", self.path.display(), self.offset)
    }
}

/// Plays back a fixed list of samples. Once the list runs out the button
/// reads as released.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    samples: VecDeque<Option<bool>>,
    connect_results: VecDeque<Result<(), String>>,
    connected: bool,
    connect_attempts: u32,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = Option<bool>>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queues connect outcomes; `Err` entries fail that attempt. When the
    /// queue is empty connects succeed.
    pub fn with_connect_results(
        mut self,
        results: impl IntoIterator<Item = Result<(), String>>,
    ) -> Self {
        self.connect_results = results.into_iter().collect();
        self
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }
}

impl SignalSource for ScriptedSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        self.connect_attempts += 1;
        match self.connect_results.pop_front().unwrap_or(Ok(())) {
            Ok(()) => {
                self.connected = true;
                Ok(())
            }
            Err(reason) => {
                self.connected = false;
                Err(SourceError::Unavailable(reason))
            }
        }
    }

    fn sample(&mut self) -> Option<bool> {
        if !self.connected {
            return None;
        }
        let sample = self.samples.pop_front().unwrap_or(Some(false));
        if sample.is_none() {
            self.connected = false;
        }
        sample
    }

    fn describe(&self) -> String {
        format!("script ({} samples left)", self.samples.len())
    }
}
