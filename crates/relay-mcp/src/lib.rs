pub mod dispatch;
pub mod server;
pub mod tools;

pub use dispatch::{DispatchError, ToolDispatcher};
pub use server::AssistantServer;
pub use tools::{tool_definitions, ToolInfo};
