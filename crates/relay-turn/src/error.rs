use relay_openai::{ClientError, RunStatus};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Step of a turn that talks to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    CreateThread,
    CreateMessage,
    CreateRun,
    PollRun,
    ListMessages,
    CancelRun,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::CreateThread => "create thread",
            Self::CreateMessage => "create message",
            Self::CreateRun => "create run",
            Self::PollRun => "poll run",
            Self::ListMessages => "list messages",
            Self::CancelRun => "cancel run",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to {stage}: {source}")]
    Submission {
        stage: TurnStage,
        #[source]
        source: ClientError,
    },

    #[error("Run did not finish after {attempts} status checks in {elapsed:?} (last status: {last_status})")]
    PollTimeout {
        attempts: u32,
        elapsed: Duration,
        last_status: RunStatus,
    },

    #[error("Run {status}")]
    RunFailure {
        status: RunStatus,
        detail: Option<String>,
    },

    #[error("Run {run_id} completed but no assistant reply was found")]
    NoAssistantReply { run_id: String },
}

impl TurnError {
    pub(crate) fn submission(stage: TurnStage) -> impl FnOnce(ClientError) -> Self {
        move |source| Self::Submission { stage, source }
    }

    /// Run status this error was decided on, when a run was observed
    pub fn run_status(&self) -> Option<RunStatus> {
        match self {
            Self::PollTimeout { last_status, .. } => Some(last_status.clone()),
            Self::RunFailure { status, .. } => Some(status.clone()),
            Self::NoAssistantReply { .. } => Some(RunStatus::Completed),
            Self::InvalidInput(_) | Self::Submission { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TurnError>;
