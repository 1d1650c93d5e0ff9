use relay_openai::RunStatus;

/// Where a run stands from the poll loop's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Keep polling
    Pending,
    /// Terminal, reply available
    Success,
    /// Terminal, no reply
    Failure(FailureReason),
}

impl Classification {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    /// The run wants tool outputs submitted; not supported by this client
    RequiresAction,
}

/// Classify a parsed run status
///
/// Statuses outside the known terminal sets, including ones the service adds
/// later, are `Pending`.
pub fn classify(status: &RunStatus) -> Classification {
    match status {
        RunStatus::Completed => Classification::Success,
        RunStatus::Failed => Classification::Failure(FailureReason::Failed),
        RunStatus::Cancelled => Classification::Failure(FailureReason::Cancelled),
        RunStatus::Expired => Classification::Failure(FailureReason::Expired),
        RunStatus::Incomplete => Classification::Failure(FailureReason::Incomplete),
        RunStatus::RequiresAction => Classification::Failure(FailureReason::RequiresAction),
        RunStatus::Queued
        | RunStatus::InProgress
        | RunStatus::Cancelling
        | RunStatus::Unknown(_) => Classification::Pending,
    }
}

/// Classify a raw wire status string
pub fn classify_str(raw: &str) -> Classification {
    classify(&RunStatus::from(raw))
}
