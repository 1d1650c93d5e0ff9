use crate::dispatch::ToolDispatcher;
use crate::tools::ToolInfo;
use anyhow::{Context, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData as McpError, Implementation,
    JsonObject, ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ServerHandler, ServiceExt};
use serde_json::Value;

const SERVER_NAME: &str = "openai-assistant-relay";

const INSTRUCTIONS: &str = "Tools for working with OpenAI assistants. \
List assistants before creating new ones, keep assistant and thread IDs for reuse, \
and pass a thread_id to continue a conversation. send_message_get_response waits \
for the assistant's reply and may take a while.";

/// MCP server exposing the assistant tools
#[derive(Clone)]
pub struct AssistantServer {
    dispatcher: ToolDispatcher,
}

impl AssistantServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve over stdin/stdout until the host disconnects
    pub async fn serve_stdio(self) -> Result<()> {
        tracing::info!("Serving MCP over stdio");

        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start MCP server")?;
        let reason = service.waiting().await.context("MCP server task failed")?;

        tracing::info!(reason = ?reason, "MCP server stopped");
        Ok(())
    }
}

fn to_mcp_tool(info: ToolInfo) -> Tool {
    let schema: JsonObject = match info.input_schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    Tool::new(info.name, info.description, schema)
}

impl ServerHandler for AssistantServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        let tools = self.dispatcher.tools().into_iter().map(to_mcp_tool).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        let text = self.dispatcher.call(&request.name, arguments).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
