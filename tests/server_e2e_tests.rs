//! End-to-end tests: real HTTP server, fake model upstream.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulse::agent::{ExecutorConfig, MaxLoops, OutputType};
use pulse::agents::ConversationAgent;
use pulse::llm::OpenAiClient;
use pulse::memory::{InMemoryStore, MemoryStore};
use pulse::server::{router, AppState};
use pulse::tools::{FnTool, ToolParameters, ToolRegistry};

fn sse_chunk(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
    )
}

async fn serve(agent: ConversationAgent) -> std::net::SocketAddr {
    let app = router(AppState {
        agent: Arc::new(agent),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_agent(
    upstream: &MockServer,
    registry: ToolRegistry,
    memory: Arc<InMemoryStore>,
) -> ConversationAgent {
    let client = Arc::new(OpenAiClient::new("gpt-4-turbo", "test-key", upstream.uri()));
    ConversationAgent::new("Pulse Agent", client, Arc::new(registry), memory)
        .with_system_prompt("You are a Pulse Agent.")
        .with_config(ExecutorConfig {
            agent_name: "Pulse Agent".into(),
            user_name: "User".into(),
            max_loops: MaxLoops::Bounded(6),
            retry_attempts: 3,
            output_type: OutputType::List,
            emit_status: false,
        })
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let upstream = MockServer::start().await;
    let memory = Arc::new(InMemoryStore::new(10));
    let addr = serve(test_agent(&upstream, ToolRegistry::new(), memory)).await;

    let resp = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn immediate_final_answer_streams_one_message_event() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("{}data: [DONE]\n\n", sse_chunk("Final Answer: 42")),
            "text/event-stream",
        ))
        .mount(&upstream)
        .await;

    let memory = Arc::new(InMemoryStore::new(10));
    let addr = serve(test_agent(&upstream, ToolRegistry::new(), memory.clone())).await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/chat/completion?query=meaning+of+life&conversationId=e2e-1"
    ))
    .await
    .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("event: message\ndata: {\"text\":\"42\"}\n\n"));
    assert!(!body.contains("event: status"));

    // The exchange was persisted with the marker stripped.
    let history = memory.get("e2e-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].output, "42");
}

#[tokio::test]
async fn tool_call_then_final_answer_round_trip() {
    let upstream = MockServer::start().await;

    // First model call: a tool invocation. Second: the final answer.
    let tool_call =
        r#"{"name": "query_price_by_ids", "parameters": {"symbols": "bitcoin", "vs_currencies": "usd"}}"#;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("{}data: [DONE]\n\n", sse_chunk(tool_call)),
            "text/event-stream",
        ))
        .up_to_n_times(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                "{}data: [DONE]\n\n",
                sse_chunk("Final Answer: Bitcoin trades at $50,000.")
            ),
            "text/event-stream",
        ))
        .mount(&upstream)
        .await;

    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(FnTool::new(
            "query_price_by_ids",
            "query coin prices",
            ToolParameters::object()
                .string("symbols", "coins", true)
                .string("vs_currencies", "currencies", true)
                .build(),
            |_params| async move { Ok(serde_json::json!({ "bitcoin": { "usd": 50000 } })) },
        )))
        .unwrap();

    let memory = Arc::new(InMemoryStore::new(10));
    let addr = serve(test_agent(&upstream, registry, memory.clone())).await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/chat/completion?query=what%27s+bitcoin+price&conversationId=e2e-2"
    ))
    .await
    .unwrap();
    let body = resp.text().await.unwrap();

    assert!(body.contains("Bitcoin trades at $50,000."));
    assert!(!body.contains("Final Answer:"));

    let history = memory.get("e2e-2").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].output, "Bitcoin trades at $50,000.");
}

#[tokio::test]
async fn missing_conversation_id_gets_a_generated_one() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("{}data: [DONE]\n\n", sse_chunk("Final Answer: hi")),
            "text/event-stream",
        ))
        .mount(&upstream)
        .await;

    let memory = Arc::new(InMemoryStore::new(10));
    let addr = serve(test_agent(&upstream, ToolRegistry::new(), memory)).await;

    let resp = reqwest::get(format!("http://{addr}/api/chat/completion?query=hello"))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("event: message"));
}

#[tokio::test]
async fn upstream_failure_degrades_to_fallback_message() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&upstream)
        .await;

    let memory = Arc::new(InMemoryStore::new(10));
    let addr = serve(test_agent(&upstream, ToolRegistry::new(), memory)).await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/chat/completion?query=hello&conversationId=e2e-3"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Sorry, I can't help with that."));
}
