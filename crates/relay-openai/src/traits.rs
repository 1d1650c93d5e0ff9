use crate::error::Result;
use crate::types::{
    Assistant, CreateAssistantRequest, ListMessagesQuery, MessageRole, Run, Thread,
    ThreadMessage, UpdateAssistantRequest,
};
use async_trait::async_trait;

/// Access to the Assistants API resources
///
/// Implementations must be safe to share across concurrent turns: every call
/// is an independent request and carries no per-call state.
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn create_assistant(&self, request: CreateAssistantRequest) -> Result<Assistant>;

    async fn list_assistants(&self, limit: u32) -> Result<Vec<Assistant>>;

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;

    async fn update_assistant(
        &self,
        assistant_id: &str,
        request: UpdateAssistantRequest,
    ) -> Result<Assistant>;

    async fn create_thread(&self) -> Result<Thread>;

    /// Append a message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage>;

    /// Start a run of `assistant_id` against the thread's current state
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    async fn list_messages(
        &self,
        thread_id: &str,
        query: ListMessagesQuery,
    ) -> Result<Vec<ThreadMessage>>;
}
