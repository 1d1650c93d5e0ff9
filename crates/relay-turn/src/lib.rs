pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod policy;
pub mod status;

pub use error::{TurnError, TurnStage};
pub use extract::{extract_reply, ReplyBoundary};
pub use orchestrator::{ConversationTurn, TurnOrchestrator, TurnReply};
pub use policy::PollPolicy;
pub use status::{classify, classify_str, Classification, FailureReason};
