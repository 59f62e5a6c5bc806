//! Outbound commands for the backend's executor.
//!
//! Dispatch is fire-and-forget: the optimistic board update has already
//! happened and is never rolled back, whatever the delivery outcome.

mod http;

pub use http::HttpCommandSink;

use crate::controls::ControlOption;
use crate::error::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A `(group, option)` pair as understood by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub group: String,
    pub option: String,
}

impl Command {
    pub fn new(group: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            option: option.into(),
        }
    }

    /// Two space-separated tokens, group first.
    pub fn payload(&self) -> String {
        format!("{} {}", self.group, self.option)
    }

    /// Inverse of [`Command::payload`].
    pub fn parse(payload: &str) -> Option<Self> {
        let mut tokens = payload.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(group), Some(option), None) => Some(Self::new(group, option)),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.group, self.option)
    }
}

impl From<&ControlOption> for Command {
    fn from(option: &ControlOption) -> Self {
        Self::new(option.group(), option.id())
    }
}

/// Delivers commands to the backend.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, command: &Command) -> Result<()>;
}

/// Issues commands without waiting for them.
#[derive(Clone)]
pub struct CommandDispatcher {
    sink: Arc<dyn CommandSink>,
}

impl CommandDispatcher {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self { sink }
    }

    /// Send `command` in the background. Must be called inside a tokio runtime.
    ///
    /// Failures are logged and dropped. The returned handle may be ignored.
    pub fn dispatch(&self, command: Command) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            match sink.send(&command).await {
                Ok(()) => debug!("[Command] delivered {:?}", command.payload()),
                Err(e) => warn!("[Command] {:?} not delivered: {}", command.payload(), e),
            }
        })
    }
}
