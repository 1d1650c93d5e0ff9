pub mod assistant;
pub mod message;
pub mod run;
pub mod thread;

pub use assistant::{Assistant, CreateAssistantRequest, UpdateAssistantRequest};
pub use message::{ListMessagesQuery, MessageContent, MessageRole, SortOrder, TextContent, ThreadMessage};
pub use run::{IncompleteDetails, Run, RunLastError, RunStatus};
pub use thread::{ListResponse, Thread};
