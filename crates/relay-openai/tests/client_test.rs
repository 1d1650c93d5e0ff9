use mockito::{Matcher, Server, ServerGuard};
use relay_openai::{
    AssistantsApi, ClientError, CreateAssistantRequest, ListMessagesQuery, MessageRole,
    OpenAIClient, OpenAIConfig, RunStatus, SortOrder, UpdateAssistantRequest,
};
use serde_json::json;

fn client_for(server: &ServerGuard) -> OpenAIClient {
    OpenAIClient::from_config(OpenAIConfig::new("test-key").with_base_url(server.url())).unwrap()
}

fn run_body(status: &str) -> String {
    json!({
        "id": "run_1",
        "object": "thread.run",
        "created_at": 1700000000,
        "thread_id": "thread_1",
        "assistant_id": "asst_1",
        "status": status,
        "last_error": null
    })
    .to_string()
}

#[tokio::test]
async fn test_create_message_sends_role_and_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/threads/thread_1/messages")
        .match_header("authorization", "Bearer test-key")
        .match_header("openai-beta", "assistants=v2")
        .match_body(Matcher::PartialJson(json!({"role": "user", "content": "hello"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_1",
                "object": "thread.message",
                "created_at": 1700000000,
                "thread_id": "thread_1",
                "role": "user",
                "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let message = client
        .create_message("thread_1", MessageRole::User, "hello")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(message.id, "msg_1");
    assert_eq!(message.text(), "hello");
}

#[tokio::test]
async fn test_create_and_get_run() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/threads/thread_1/runs")
        .match_body(Matcher::Json(json!({"assistant_id": "asst_1"})))
        .with_status(200)
        .with_body(run_body("queued"))
        .create_async()
        .await;
    let get = server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_body(run_body("in_progress"))
        .create_async()
        .await;

    let client = client_for(&server);
    let run = client.create_run("thread_1", "asst_1").await.unwrap();
    assert_eq!(run.status, RunStatus::Queued);

    let run = client.get_run("thread_1", &run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::InProgress);

    create.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn test_cancel_run_posts_to_cancel_endpoint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/threads/thread_1/runs/run_1/cancel")
        .with_status(200)
        .with_body(run_body("cancelling"))
        .create_async()
        .await;

    let run = client_for(&server).cancel_run("thread_1", "run_1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(run.status, RunStatus::Cancelling);
}

#[tokio::test]
async fn test_list_messages_passes_order_and_limit() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/threads/thread_1/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("order".into(), "desc".into()),
            Matcher::UrlEncoded("limit".into(), "50".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "object": "list",
                "data": [
                    {
                        "id": "msg_2",
                        "created_at": 1700000002,
                        "thread_id": "thread_1",
                        "role": "assistant",
                        "content": [{"type": "text", "text": {"value": "hi there", "annotations": []}}],
                        "run_id": "run_1"
                    },
                    {
                        "id": "msg_1",
                        "created_at": 1700000001,
                        "thread_id": "thread_1",
                        "role": "user",
                        "content": [{"type": "text", "text": {"value": "hello", "annotations": []}}]
                    }
                ],
                "first_id": "msg_2",
                "last_id": "msg_1",
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let messages = client_for(&server)
        .list_messages("thread_1", ListMessagesQuery::new(SortOrder::Desc).limit(50))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].text(), "hi there");
}

#[tokio::test]
async fn test_assistant_crud_round_trip() {
    let mut server = Server::new_async().await;
    let assistant = json!({
        "id": "asst_1",
        "object": "assistant",
        "created_at": 1700000000,
        "name": "Data Analyst",
        "model": "gpt-4o",
        "instructions": "Analyze data",
        "tools": []
    });

    let create = server
        .mock("POST", "/assistants")
        .match_body(Matcher::Json(json!({
            "name": "Data Analyst",
            "instructions": "Analyze data",
            "model": "gpt-4o"
        })))
        .with_status(200)
        .with_body(assistant.to_string())
        .create_async()
        .await;
    let update = server
        .mock("POST", "/assistants/asst_1")
        .match_body(Matcher::Json(json!({"model": "gpt-4o-mini"})))
        .with_status(200)
        .with_body(assistant.to_string())
        .create_async()
        .await;
    let list = server
        .mock("GET", "/assistants")
        .match_query(Matcher::UrlEncoded("limit".into(), "20".into()))
        .with_status(200)
        .with_body(json!({"object": "list", "data": [assistant], "has_more": false}).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let created = client
        .create_assistant(CreateAssistantRequest::new("Data Analyst", "Analyze data", "gpt-4o"))
        .await
        .unwrap();
    assert_eq!(created.name.as_deref(), Some("Data Analyst"));

    client
        .update_assistant("asst_1", UpdateAssistantRequest::new().model("gpt-4o-mini"))
        .await
        .unwrap();

    let all = client.list_assistants(20).await.unwrap();
    assert_eq!(all.len(), 1);

    create.assert_async().await;
    update.assert_async().await;
    list.assert_async().await;
}

#[tokio::test]
async fn test_api_error_is_mapped() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/threads")
        .with_status(401)
        .with_body(
            json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}})
                .to_string(),
        )
        .create_async()
        .await;

    let err = client_for(&server).create_thread().await.unwrap_err();

    match &err {
        ClientError::Api { status, message } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_run("thread_1", "run_1")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_body("{\"id\": 42}")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_run("thread_1", "run_1")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}
