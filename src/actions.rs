use std::{
    collections::BTreeMap,
    process::{Child, Command, Stdio},
};

use serde::{Deserialize, Serialize};

use crate::gesture::MediaAction;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no command configured for {0}")]
    NotConfigured(MediaAction),
    #[error("failed to start `{program}` for {action}: {source}")]
    Spawn {
        action: MediaAction,
        program: String,
        source: std::io::Error,
    },
    #[error("{action} rejected: {reason}")]
    Rejected { action: MediaAction, reason: String },
}

/// Performs the side effect of one detected action. Called from the polling
/// task, so implementations must return promptly.
pub trait ActionHandler {
    fn dispatch(&mut self, action: MediaAction) -> Result<(), DispatchError>;
    fn name(&self) -> &'static str;
}

impl<H: ActionHandler + ?Sized> ActionHandler for Box<H> {
    fn dispatch(&mut self, action: MediaAction) -> Result<(), DispatchError> {
        (**self).dispatch(action)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    #[default]
    Log,
    Command,
}

impl HandlerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Command => "command",
        }
    }
}

/// Validated handler selection with one argv per action.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionConfig {
    pub handler: HandlerKind,
    pub commands: BTreeMap<MediaAction, Vec<String>>,
}

pub fn build_handler(config: &ActionConfig) -> Box<dyn ActionHandler> {
    match config.handler {
        HandlerKind::Log => Box::new(LogHandler),
        HandlerKind::Command => Box::new(CommandHandler::new(config.commands.clone())),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogHandler;

impl ActionHandler for LogHandler {
    fn dispatch(&mut self, action: MediaAction) -> Result<(), DispatchError> {
        log::info!("action: {} ({})", action.label(), action);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps every dispatched action. Can be told to fail to exercise error paths.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    history: Vec<MediaAction>,
    failures_left: u32,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` dispatches fail and are not recorded.
    pub fn fail_next(&mut self, count: u32) {
        self.failures_left = count;
    }

    pub fn history(&self) -> &[MediaAction] {
        &self.history
    }

    pub fn last_action(&self) -> Option<MediaAction> {
        self.history.last().copied()
    }
}

impl ActionHandler for RecordingHandler {
    fn dispatch(&mut self, action: MediaAction) -> Result<(), DispatchError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(DispatchError::Rejected {
                action,
                reason: "scripted failure".into(),
            });
        }
        self.history.push(action);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Runs a configured argv per action. Children are not waited on in the
/// dispatch path; finished ones are reaped on later dispatches and on drop.
pub struct CommandHandler {
    commands: BTreeMap<MediaAction, Vec<String>>,
    running: Vec<(MediaAction, Child)>,
}

impl CommandHandler {
    pub fn new(commands: BTreeMap<MediaAction, Vec<String>>) -> Self {
        Self {
            commands,
            running: Vec::new(),
        }
    }

    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Collects exited children and logs non-zero exits. Returns how many
    /// failed.
    pub fn reap(&mut self) -> usize {
        let mut failed = 0;
        self.running.retain_mut(|(action, child)| match child.try_wait() {
            Ok(Some(status)) if status.success() => false,
            Ok(Some(status)) => {
                failed += 1;
                log::warn!("action {action} command exited with {status}");
                false
            }
            Ok(None) => true,
            Err(err) => {
                failed += 1;
                log::warn!("action {action} command wait failed: {err}");
                false
            }
        });
        failed
    }
}

impl ActionHandler for CommandHandler {
    fn dispatch(&mut self, action: MediaAction) -> Result<(), DispatchError> {
        self.reap();
        let argv = self
            .commands
            .get(&action)
            .filter(|argv| !argv.is_empty())
            .ok_or(DispatchError::NotConfigured(action))?;
        let program = &argv[0];

        let child = Command::new(program)
            .args(&argv[1..])
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                action,
                program: program.clone(),
                source,
            })?;
        log::debug!("action {action}: started `{}` pid={}", argv.join(" "), child.id());
        self.running.push((action, child));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

impl Drop for CommandHandler {
    fn drop(&mut self) {
        for (action, child) in &mut self.running {
            if let Err(err) = child.wait() {
                log::warn!("action {action} command wait failed: {err}");
            }
        }
    }
}
