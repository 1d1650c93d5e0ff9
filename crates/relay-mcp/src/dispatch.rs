use crate::tools;
use relay_openai::{AssistantsApi, ClientError, CreateAssistantRequest, UpdateAssistantRequest};
use relay_turn::{PollPolicy, TurnError, TurnOrchestrator};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;
const RETRY_HINT: &str = "Please try sending your message again.";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Deserialize)]
struct CreateAssistantArgs {
    name: String,
    instructions: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct SendMessageArgs {
    #[serde(default)]
    thread_id: Option<String>,
    assistant_id: String,
    message: String,
}

#[derive(Deserialize)]
struct AssistantIdArgs {
    assistant_id: String,
}

#[derive(Deserialize)]
struct UpdateAssistantArgs {
    assistant_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// Maps a tool name and its argument bag to one operation and renders the
/// result as text. Never fails: every error becomes an `Error: ...` string.
#[derive(Clone)]
pub struct ToolDispatcher {
    client: Arc<dyn AssistantsApi>,
    orchestrator: TurnOrchestrator,
    default_model: String,
}

impl ToolDispatcher {
    pub fn new(
        client: Arc<dyn AssistantsApi>,
        policy: PollPolicy,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator: TurnOrchestrator::new(client.clone(), policy),
            client,
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn tools(&self) -> Vec<tools::ToolInfo> {
        tools::tool_definitions(&self.default_model)
    }

    /// Run tool `name` with `arguments` (a JSON object, or null for none)
    pub async fn call(&self, name: &str, arguments: Value) -> String {
        tracing::info!(tool = %name, "Tool call");

        let result = match name {
            tools::CREATE_ASSISTANT => self.create_assistant(arguments).await,
            tools::NEW_THREAD => self.new_thread().await,
            tools::SEND_MESSAGE_GET_RESPONSE => self.send_message_get_response(arguments).await,
            tools::LIST_ASSISTANTS => self.list_assistants(&arguments).await,
            tools::RETRIEVE_ASSISTANT => self.retrieve_assistant(arguments).await,
            tools::UPDATE_ASSISTANT => self.update_assistant(arguments).await,
            _ => {
                tracing::warn!(tool = %name, "Unknown tool requested");
                return format!("Unknown tool: {}", name);
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!(tool = %name, error = %e, "Tool call failed");
            format!("Error: {}", e)
        })
    }

    async fn create_assistant(&self, arguments: Value) -> Result<String> {
        let args: CreateAssistantArgs = parse_args(arguments)?;
        let model = args
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let assistant = self
            .client
            .create_assistant(CreateAssistantRequest::new(args.name, args.instructions, model))
            .await?;

        Ok(format!(
            "Created assistant '{}' with ID: {}",
            or_none(assistant.name.as_deref()),
            assistant.id
        ))
    }

    async fn new_thread(&self) -> Result<String> {
        let thread = self.client.create_thread().await?;
        Ok(format!("Created new thread with ID: {}", thread.id))
    }

    async fn send_message_get_response(&self, arguments: Value) -> Result<String> {
        let args: SendMessageArgs = parse_args(arguments)?;

        let turn = self
            .orchestrator
            .send_message(args.thread_id.as_deref(), &args.assistant_id, &args.message)
            .await;

        let mut text = match (&turn.thread_id, turn.created_thread) {
            (Some(id), true) => format!("Created new thread with ID: {}\n\n", id),
            _ => String::new(),
        };
        match turn.outcome {
            Ok(reply) => text.push_str(&reply.text),
            Err(e) => {
                tracing::error!(
                    thread_id = turn.thread_id.as_deref().unwrap_or(""),
                    error = %e,
                    "Turn failed"
                );
                text.push_str(&render_turn_error(&e));
            }
        }
        Ok(text)
    }

    async fn list_assistants(&self, arguments: &Value) -> Result<String> {
        let limit = parse_limit(arguments.get("limit"));
        let assistants = self.client.list_assistants(limit).await?;

        let entries: Vec<String> = assistants
            .iter()
            .map(|a| {
                format!(
                    "ID: {}\nName: {}\nModel: {}\n",
                    a.id,
                    or_none(a.name.as_deref()),
                    a.model
                )
            })
            .collect();

        Ok(format!("Available Assistants:\n\n{}", entries.join("\n")))
    }

    async fn retrieve_assistant(&self, arguments: Value) -> Result<String> {
        let args: AssistantIdArgs = parse_args(arguments)?;
        let assistant = self.client.retrieve_assistant(&args.assistant_id).await?;

        Ok(format!(
            "Assistant Details:\nID: {}\nName: {}\nModel: {}\nInstructions: {}",
            assistant.id,
            or_none(assistant.name.as_deref()),
            assistant.model,
            or_none(assistant.instructions.as_deref())
        ))
    }

    async fn update_assistant(&self, arguments: Value) -> Result<String> {
        let args: UpdateAssistantArgs = parse_args(arguments)?;

        let mut request = UpdateAssistantRequest::new();
        if let Some(name) = args.name {
            request = request.name(name);
        }
        if let Some(instructions) = args.instructions {
            request = request.instructions(instructions);
        }
        if let Some(model) = args.model {
            request = request.model(model);
        }

        let assistant = self
            .client
            .update_assistant(&args.assistant_id, request)
            .await?;

        Ok(format!(
            "Updated assistant '{}' (ID: {})",
            or_none(assistant.name.as_deref()),
            assistant.id
        ))
    }
}

/// Unset assistant fields render as `None`
fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    Ok(serde_json::from_value(arguments)?)
}

/// Accepts a number or a numeric string; anything else falls back to the default
fn parse_limit(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT) as u32
}

fn render_turn_error(err: &TurnError) -> String {
    match err {
        TurnError::RunFailure { status, .. } => {
            format!("Error: Run {}. {}", status, RETRY_HINT)
        }
        TurnError::PollTimeout {
            attempts,
            last_status,
            ..
        } => format!(
            "Error: Run did not finish after {} status checks (last status: {}). {}",
            attempts, last_status, RETRY_HINT
        ),
        TurnError::NoAssistantReply { .. } => {
            format!("Error: Run completed but no assistant reply was found. {}", RETRY_HINT)
        }
        other => format!("Error: {}", other),
    }
}
