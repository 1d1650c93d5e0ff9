// HTTP implementation of the Assistants API (v2)

use crate::config::OpenAIConfig;
use crate::error::{ClientError, Result};
use crate::traits::AssistantsApi;
use crate::types::{
    Assistant, CreateAssistantRequest, ListMessagesQuery, ListResponse, MessageRole, Run,
    Thread, ThreadMessage, UpdateAssistantRequest,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const OPENAI_BETA: HeaderName = HeaderName::from_static("openai-beta");
const OPENAI_ORGANIZATION: HeaderName = HeaderName::from_static("openai-organization");

/// Assistants API client (HTTP direct, no SDK)
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key against the public endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(OpenAIConfig::new(api_key))
    }

    pub fn from_config(config: OpenAIConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(OPENAI_BETA, HeaderValue::from_static("assistants=v2"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| ClientError::InvalidConfig("Invalid API key format".to_string()))?,
        );
        if let Some(org) = &config.organization {
            headers.insert(
                OPENAI_ORGANIZATION,
                HeaderValue::from_str(org).map_err(|_| {
                    ClientError::InvalidConfig("Invalid organization format".to_string())
                })?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.resolved_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Extract `error.message` from an API error body, falling back to the raw body
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl AssistantsApi for OpenAIClient {
    async fn create_assistant(&self, request: CreateAssistantRequest) -> Result<Assistant> {
        tracing::debug!(name = %request.name, model = %request.model, "Creating assistant");
        self.send(self.http_client.post(self.url("/assistants")).json(&request))
            .await
    }

    async fn list_assistants(&self, limit: u32) -> Result<Vec<Assistant>> {
        let list: ListResponse<Assistant> = self
            .send(
                self.http_client
                    .get(self.url("/assistants"))
                    .query(&[("limit", limit.clamp(1, 100).to_string())]),
            )
            .await?;
        Ok(list.data)
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.send(
            self.http_client
                .get(self.url(&format!("/assistants/{}", assistant_id))),
        )
        .await
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        request: UpdateAssistantRequest,
    ) -> Result<Assistant> {
        self.send(
            self.http_client
                .post(self.url(&format!("/assistants/{}", assistant_id)))
                .json(&request),
        )
        .await
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.send(
            self.http_client
                .post(self.url("/threads"))
                .json(&serde_json::json!({})),
        )
        .await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage> {
        let payload = serde_json::json!({
            "role": role.as_str(),
            "content": text,
        });

        self.send(
            self.http_client
                .post(self.url(&format!("/threads/{}/messages", thread_id)))
                .json(&payload),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let payload = serde_json::json!({ "assistant_id": assistant_id });

        self.send(
            self.http_client
                .post(self.url(&format!("/threads/{}/runs", thread_id)))
                .json(&payload),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            self.http_client
                .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id))),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            self.http_client
                .post(self.url(&format!("/threads/{}/runs/{}/cancel", thread_id, run_id))),
        )
        .await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        query: ListMessagesQuery,
    ) -> Result<Vec<ThreadMessage>> {
        let list: ListResponse<ThreadMessage> = self
            .send(
                self.http_client
                    .get(self.url(&format!("/threads/{}/messages", thread_id)))
                    .query(&[
                        ("order", query.order.as_str().to_string()),
                        ("limit", query.limit.to_string()),
                    ]),
            )
            .await?;
        Ok(list.data)
    }
}
