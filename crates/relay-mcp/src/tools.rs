use serde_json::{json, Value};

pub const CREATE_ASSISTANT: &str = "create_assistant";
pub const NEW_THREAD: &str = "new_thread";
pub const SEND_MESSAGE_GET_RESPONSE: &str = "send_message_get_response";
pub const LIST_ASSISTANTS: &str = "list_assistants";
pub const RETRIEVE_ASSISTANT: &str = "retrieve_assistant";
pub const UPDATE_ASSISTANT: &str = "update_assistant";

/// Tool declaration advertised to the host
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolInfo {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Every tool the server exposes, in listing order
pub fn tool_definitions(default_model: &str) -> Vec<ToolInfo> {
    vec![
        ToolInfo::new(
            CREATE_ASSISTANT,
            "Create a new OpenAI assistant to help you with your tasks. You can provide \
             instructions that this assistant will follow when working with your prompts \
             and a model to use for the assistant.\n\n\
             NOTE: Check existing assistants with list_assistants before creating a new one \
             to avoid duplicating names or instructions.",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name for the assistant. Use a descriptive name so it can be re-used later by an instance without your context."
                    },
                    "instructions": {
                        "type": "string",
                        "description": "Instructions that shape the assistant's behavior and responses. These can be long if that helps the assistant perform better."
                    },
                    "model": {
                        "type": "string",
                        "description": format!("Model to use (default: {})", default_model),
                        "default": default_model
                    }
                },
                "required": ["name", "instructions"]
            }),
        ),
        ToolInfo::new(
            NEW_THREAD,
            "Creates a new conversation thread. Threads have large capacity and the context \
             window moves so that it always covers a certain number of tokens (depending on the model).",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        ),
        ToolInfo::new(
            SEND_MESSAGE_GET_RESPONSE,
            "Send a message to an assistant and wait for its response. If no thread ID is \
             given, a new thread is created and its ID is returned as part of the response.",
            json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "string",
                        "description": "Optional: Thread ID to use. A new thread is created when omitted."
                    },
                    "assistant_id": {
                        "type": "string",
                        "description": "Assistant ID to use"
                    },
                    "message": {
                        "type": "string",
                        "description": "Message to send"
                    }
                },
                "required": ["assistant_id", "message"]
            }),
        ),
        ToolInfo::new(
            LIST_ASSISTANTS,
            "List all available OpenAI assistants. Returns their IDs, names and models. \
             Use this to find existing assistants to use with send_message_get_response \
             or update_assistant.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "number",
                        "description": "Optional: Maximum number of assistants to return (default: 20)",
                        "default": 20
                    }
                },
                "additionalProperties": false
            }),
        ),
        ToolInfo::new(
            RETRIEVE_ASSISTANT,
            "Get details of a specific assistant",
            json!({
                "type": "object",
                "properties": {
                    "assistant_id": {
                        "type": "string",
                        "description": "ID of the assistant to retrieve"
                    }
                },
                "required": ["assistant_id"]
            }),
        ),
        ToolInfo::new(
            UPDATE_ASSISTANT,
            "Modify an existing assistant",
            json!({
                "type": "object",
                "properties": {
                    "assistant_id": {
                        "type": "string",
                        "description": "ID of the assistant to modify"
                    },
                    "name": {
                        "type": "string",
                        "description": "Optional: New name for the assistant"
                    },
                    "instructions": {
                        "type": "string",
                        "description": "Optional: New instructions for the assistant"
                    },
                    "model": {
                        "type": "string",
                        "description": "Optional: New model to use (e.g. gpt-4o)"
                    }
                },
                "required": ["assistant_id"]
            }),
        ),
    ]
}
