mod loop_worker;
mod source;

use anyhow::Error;

use crate::remote::RemoteError;

pub use loop_worker::{Agent, FETCH_TIMEOUT_SECS};
pub use source::SignalSource;

/// How the poll loop ended.
#[derive(Debug)]
pub enum AgentExit {
    /// Stop was requested and the in-flight fetch wound down cleanly.
    Stopped,
    /// Stop was requested but the in-flight fetch ended with its own error.
    StoppedWithError(Error),
    /// A fetch failed while the agent was running, or storage failed at any time.
    Failed(Error),
}

impl AgentExit {
    pub fn from_error(err: Error, stop_requested: bool) -> Self {
        if !stop_requested {
            return AgentExit::Failed(err);
        }

        match err.downcast_ref::<RemoteError>() {
            Some(RemoteError::Cancelled) => AgentExit::Stopped,
            Some(_) => AgentExit::StoppedWithError(err),
            None => AgentExit::Failed(err),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AgentExit::Failed(_))
    }
}
