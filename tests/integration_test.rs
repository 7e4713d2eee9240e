/// End-to-end tests for the chat pipeline.
///
/// Both remote endpoints are simulated with wiremock:
///   Config → RagChat → Vectorize retrieval → context → chat completion
use std::sync::Mutex;
use std::time::Duration;

use ragchat::chat::{ChatEvent, RagChat};
use ragchat::config::{Config, ConfigError, Env};
use ragchat::document::{NO_DOCUMENTS_CONTEXT, NO_KNOWLEDGE_BASE_CONTEXT};
use ragchat::source::SourceKind;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RETRIEVAL_PATH: &str = "/org/org-1/pipelines/pipe-1/retrieval";
const COMPLETION_PATH: &str = "/v1/chat/completions";

fn env_for(server: &MockServer) -> Env {
    Env::from_pairs([
        ("OPENAI_API_KEY", "sk-test".to_string()),
        ("VECTORIZE_PIPELINE_ACCESS_TOKEN", "vz-token".to_string()),
        ("VECTORIZE_ORGANIZATION_ID", "org-1".to_string()),
        ("VECTORIZE_PIPELINE_ID", "pipe-1".to_string()),
        ("VECTORIZE_API_HOST", server.uri()),
    ])
}

fn config_for(server: &MockServer, source: SourceKind) -> Config {
    Config {
        source,
        openai_base_url: format!("{}/v1", server.uri()),
        request_timeout_secs: 10,
        ..Config::default()
    }
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }))
}

async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(completion(content))
        .mount(server)
        .await;
}

async fn mount_documents(server: &MockServer, documents: Value) {
    Mock::given(method("POST"))
        .and(path(RETRIEVAL_PATH))
        .and(header("authorization", "Bearer vz-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "question": "ignored",
            "documents": documents,
        })))
        .mount(server)
        .await;
}

/// User-turn contents of every completion request the server saw, in order.
async fn user_prompts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == COMPLETION_PATH)
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            assert_eq!(body["model"], "gpt-4o-mini");
            assert_eq!(body["messages"][0]["role"], "system");
            body["messages"][1]["content"].as_str().unwrap().to_string()
        })
        .collect()
}

fn three_documents() -> Value {
    json!([
        {"id": "a", "text": "Alpha passage", "source_display_name": "alpha.md", "relevancy": 0.93},
        {"id": "b", "text": "Beta passage", "source_display_name": "beta.md", "relevancy": 0.81},
        {"id": "c", "text": "Gamma passage", "source_display_name": "gamma.md", "relevancy": 0.42}
    ])
}

#[tokio::test]
async fn test_no_source_uses_general_knowledge() {
    let server = MockServer::start().await;
    mount_completion(&server, "RAG means retrieval-augmented generation.").await;

    let env = Env::from_pairs([("OPENAI_API_KEY", "sk-test")]);
    let chat = RagChat::from_config(&config_for(&server, SourceKind::None), &env).unwrap();
    assert!(!chat.has_knowledge_base());

    let events = Mutex::new(Vec::new());
    let reporter = |e: ChatEvent| events.lock().unwrap().push(e);
    let answer = chat.chat("What is RAG?", &reporter).await;

    assert_eq!(answer, "RAG means retrieval-augmented generation.");
    let prompts = user_prompts(&server).await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with(&format!("Context:\n{NO_KNOWLEDGE_BASE_CONTEXT}\n\n")));
    assert!(prompts[0].contains("Question: What is RAG?"));
    assert_eq!(*events.lock().unwrap(), vec![ChatEvent::Generating]);
}

#[tokio::test]
async fn test_three_documents_formatted_in_order() {
    let server = MockServer::start().await;
    mount_documents(&server, three_documents()).await;
    mount_completion(&server, "answer").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();

    let events = Mutex::new(Vec::new());
    let reporter = |e: ChatEvent| events.lock().unwrap().push(e);
    let answer = chat.chat("Tell me about the letters", &reporter).await;
    assert_eq!(answer, "answer");

    let prompt = &user_prompts(&server).await[0];
    let expected_context = "Here are the relevant documents:\n\n\
        Document 1:\nContent: Alpha passage\nSource: alpha.md\nRelevance Score: 0.93\n\n\
        Document 2:\nContent: Beta passage\nSource: beta.md\nRelevance Score: 0.81\n\n\
        Document 3:\nContent: Gamma passage\nSource: gamma.md\nRelevance Score: 0.42\n\n";
    assert!(prompt.contains(expected_context), "prompt was: {prompt}");
    assert!(!prompt.contains("Document 4:"));

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            ChatEvent::Retrieving {
                question: "Tell me about the letters".to_string()
            },
            ChatEvent::DocumentsFound(3),
            ChatEvent::Generating,
        ]
    );

    // Request carried the question and the result budget
    let requests = server.received_requests().await.unwrap();
    let retrieval = requests
        .iter()
        .find(|r| r.url.path() == RETRIEVAL_PATH)
        .unwrap();
    let body: Value = serde_json::from_slice(&retrieval.body).unwrap();
    assert_eq!(
        body,
        json!({"question": "Tell me about the letters", "numResults": 5})
    );
}

#[tokio::test]
async fn test_zero_documents_still_answers() {
    let server = MockServer::start().await;
    mount_documents(&server, json!([])).await;
    mount_completion(&server, "I could not find anything relevant.").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();

    let events = Mutex::new(Vec::new());
    let reporter = |e: ChatEvent| events.lock().unwrap().push(e);
    let answer = chat.chat("Unknown topic", &reporter).await;

    assert_eq!(answer, "I could not find anything relevant.");
    assert!(user_prompts(&server).await[0].contains(NO_DOCUMENTS_CONTEXT));
    let events = events.lock().unwrap();
    assert!(events.contains(&ChatEvent::DocumentsFound(0)));
    assert!(!events.iter().any(|e| matches!(e, ChatEvent::Error(_))));
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_empty_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RETRIEVAL_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;
    mount_completion(&server, "fallback answer").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();

    let events = Mutex::new(Vec::new());
    let reporter = |e: ChatEvent| events.lock().unwrap().push(e);
    let answer = chat.chat("q", &reporter).await;

    assert_eq!(answer, "fallback answer");
    assert!(user_prompts(&server).await[0].contains(NO_DOCUMENTS_CONTEXT));

    let events = events.lock().unwrap();
    let errors: Vec<&ChatEvent> = events
        .iter()
        .filter(|e| matches!(e, ChatEvent::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ChatEvent::Error(msg) if msg.contains("401")));
    assert!(events.contains(&ChatEvent::DocumentsFound(0)));
}

#[tokio::test]
async fn test_malformed_retrieval_response_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RETRIEVAL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    mount_completion(&server, "ok").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();
    let answer = chat.chat("q", &ragchat::chat::Silent).await;
    assert_eq!(answer, "ok");
}

#[tokio::test]
async fn test_generation_failure_is_answer_shaped() {
    let server = MockServer::start().await;
    mount_documents(&server, three_documents()).await;
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
        .mount(&server)
        .await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();
    let answer = chat.chat("q", &ragchat::chat::Silent).await;

    assert!(answer.starts_with("Error generating response:"), "{answer}");
    assert!(answer.contains("429"));
}

#[tokio::test]
async fn test_empty_choices_is_answer_shaped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let env = Env::from_pairs([("OPENAI_API_KEY", "sk-test")]);
    let chat = RagChat::from_config(&config_for(&server, SourceKind::None), &env).unwrap();
    let answer = chat.chat("q", &ragchat::chat::Silent).await;
    assert!(answer.starts_with("Error generating response:"));
}

#[tokio::test]
async fn test_context_is_idempotent() {
    let server = MockServer::start().await;
    mount_documents(&server, three_documents()).await;
    mount_completion(&server, "same").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();
    chat.chat("repeat me", &ragchat::chat::Silent).await;
    chat.chat("repeat me", &ragchat::chat::Silent).await;

    let prompts = user_prompts(&server).await;
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn test_cancelled_request_leaves_session_usable() {
    let server = MockServer::start().await;
    mount_documents(&server, three_documents()).await;
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .respond_with(completion("slow").set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_completion(&server, "fast").await;

    let chat =
        RagChat::from_config(&config_for(&server, SourceKind::Vectorize), &env_for(&server))
            .unwrap();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(500),
        chat.chat("first", &ragchat::chat::Silent),
    )
    .await;
    assert!(cancelled.is_err(), "slow request should have been cancelled");

    let answer = chat.chat("second", &ragchat::chat::Silent).await;
    assert_eq!(answer, "fast");
}

#[tokio::test]
async fn test_pinecone_mock_end_to_end() {
    let server = MockServer::start().await;
    mount_completion(&server, "mocked").await;

    let env = Env::from_pairs([
        ("OPENAI_API_KEY", "sk-test"),
        ("PINECONE_API_KEY", "pc"),
        ("PINECONE_ENVIRONMENT", "us-east-1"),
        ("PINECONE_INDEX_NAME", "docs"),
    ]);
    let chat = RagChat::from_config(&config_for(&server, SourceKind::Pinecone), &env).unwrap();
    assert_eq!(chat.chat("q", &ragchat::chat::Silent).await, "mocked");

    let prompt = &user_prompts(&server).await[0];
    assert!(prompt.contains("Document 3:\nContent: This is a mock document 3"));
    assert!(prompt.contains("Source: mock_source_1.txt"));
}

#[test]
fn test_missing_configuration_lists_every_key() {
    let config = Config {
        source: SourceKind::Pinecone,
        ..Config::default()
    };
    let env = Env::from_pairs([("PINECONE_INDEX_NAME", "docs")]);

    match RagChat::from_config(&config, &env) {
        Err(ConfigError::MissingEnvVars(missing)) => assert_eq!(
            missing,
            vec!["OPENAI_API_KEY", "PINECONE_API_KEY", "PINECONE_ENVIRONMENT"]
        ),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("construction should fail"),
    }
}
