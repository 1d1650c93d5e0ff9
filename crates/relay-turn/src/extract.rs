use crate::error::{Result, TurnError};
use relay_openai::{MessageRole, SortOrder, ThreadMessage};

/// Identifies the turn a reply must belong to
#[derive(Debug, Clone)]
pub struct ReplyBoundary {
    /// The user message that triggered the run
    pub trigger_message_id: String,
    pub run_id: String,
}

impl ReplyBoundary {
    pub fn new(trigger_message_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            trigger_message_id: trigger_message_id.into(),
            run_id: run_id.into(),
        }
    }
}

/// Find the assistant's reply to the boundary's trigger message.
///
/// `messages` is in `order` as returned by the service. Candidates are the
/// assistant messages strictly after the trigger; if the trigger is not in
/// the page, the assistant messages produced by the boundary's run. The
/// chronologically last candidate with non-empty text wins.
pub fn extract_reply(
    messages: &[ThreadMessage],
    order: SortOrder,
    boundary: &ReplyBoundary,
) -> Result<String> {
    let chronological = normalize(messages, order);

    let candidates: Vec<&ThreadMessage> = match chronological
        .iter()
        .position(|m| m.id == boundary.trigger_message_id)
    {
        Some(trigger) => chronological[trigger + 1..]
            .iter()
            .copied()
            .filter(|m| m.role == MessageRole::Assistant)
            .collect(),
        None => {
            tracing::debug!(
                trigger = %boundary.trigger_message_id,
                "Trigger message not in page, matching replies by run id"
            );
            chronological
                .iter()
                .copied()
                .filter(|m| m.role == MessageRole::Assistant)
                .filter(|m| m.run_id.as_deref() == Some(boundary.run_id.as_str()))
                .collect()
        }
    };

    candidates
        .into_iter()
        .rev()
        .map(ThreadMessage::text)
        .find(|text| !text.trim().is_empty())
        .ok_or_else(|| TurnError::NoAssistantReply {
            run_id: boundary.run_id.clone(),
        })
}

/// Oldest-first view of the page; equal timestamps keep the service's order
fn normalize(messages: &[ThreadMessage], order: SortOrder) -> Vec<&ThreadMessage> {
    let mut chronological: Vec<&ThreadMessage> = match order {
        SortOrder::Asc => messages.iter().collect(),
        SortOrder::Desc => messages.iter().rev().collect(),
    };
    chronological.sort_by_key(|m| m.created_at);
    chronological
}
