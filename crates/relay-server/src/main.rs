use anyhow::Context;
use std::sync::Arc;

use relay_mcp::{AssistantServer, ToolDispatcher};
use relay_openai::{AssistantsApi, OpenAIClient};
use relay_server::{config::Config, logging::init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging);

    tracing::info!("Starting OpenAI assistant relay");
    tracing::info!(
        base_url = %config.openai.base_url,
        default_model = %config.openai.default_model,
        "Config loaded"
    );

    let client: Arc<dyn AssistantsApi> = Arc::new(
        OpenAIClient::from_config(config.openai_config())
            .context("Failed to initialize OpenAI client")?,
    );

    let policy = config.poll_policy();
    tracing::debug!(?policy, "Run poll policy");

    let dispatcher = ToolDispatcher::new(client, policy, config.openai.default_model.clone());

    AssistantServer::new(dispatcher).serve_stdio().await
}
