pub mod client;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use client::OpenAIClient;
pub use config::OpenAIConfig;
pub use error::ClientError;
pub use traits::AssistantsApi;
pub use types::{
    Assistant, CreateAssistantRequest, ListMessagesQuery, MessageContent, MessageRole, Run,
    RunStatus, SortOrder, Thread, ThreadMessage, UpdateAssistantRequest,
};
