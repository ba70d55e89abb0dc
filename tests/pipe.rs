//! End-to-end behavior of the pipe against a mock LKEAP server

use futures::StreamExt;
use lkeap_pipe::prelude::*;
use mockito::{Matcher, ServerGuard};
use serde_json::json;
use url::Url;

const ERROR_BLOCK_BAD_KEY: &str = "```json\n{\n  \"error\": \"bad key\",\n}\n```\n";

fn pipe_for(server: &ServerGuard, api_key: &str) -> LkeapPipe {
    let config = PipeConfig::new(api_key).with_base_url(Url::parse(&server.url()).unwrap());
    LkeapPipe::new(config).unwrap()
}

fn sse(events: &[serde_json::Value]) -> String {
    let mut body: String = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

async fn mock_chat(server: &mut ServerGuard, body: String) -> mockito::Mock {
    server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await
}

async fn collect(pipe: &LkeapPipe, model: &str) -> Vec<String> {
    let request = ChatRequest::new(model, vec![ChatMessage::user("你好")]);
    pipe.stream_chat(request).collect().await
}

#[tokio::test]
async fn lists_models_with_prefix() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(json!({"data": [{"id": "m1", "name": "Model One"}, {"id": "m2"}]}).to_string())
        .create_async()
        .await;

    let models = pipe_for(&server, "sk-test").list_models().await;

    assert_eq!(
        models,
        vec![
            ModelDescriptor::new("m1", "tencentcloud/Model One"),
            ModelDescriptor::new("m2", "tencentcloud/m2"),
        ]
    );
}

#[tokio::test]
async fn uses_configured_name_prefix() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .with_status(200)
        .with_body(json!({"data": [{"id": "deepseek-r1"}]}).to_string())
        .create_async()
        .await;

    let config = PipeConfig::new("sk-test")
        .with_base_url(Url::parse(&server.url()).unwrap())
        .with_name_prefix("lkeap/");
    let models = LkeapPipe::new(config).unwrap().list_models().await;

    assert_eq!(models, vec![ModelDescriptor::new("deepseek-r1", "lkeap/deepseek-r1")]);
}

#[tokio::test]
async fn listing_failures_become_placeholder() {
    let expected = vec![ModelDescriptor::new(
        "error",
        "Error fetching models. Please check your API Key.",
    )];

    for (status, body) in [
        (401, r#"{"error":{"message":"invalid key"}}"#),
        (200, "not json"),
        (200, r#"{"object":"list"}"#),
        (200, r#"{"data":[{"name":"no id"}]}"#),
    ] {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/models")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        assert_eq!(pipe_for(&server, "sk-test").list_models().await, expected, "body: {body}");
    }
}

#[tokio::test]
async fn listing_without_key_is_placeholder() {
    let server = mockito::Server::new_async().await;
    assert_eq!(
        pipe_for(&server, "").list_models().await,
        vec![ModelDescriptor::new("error", "API Key not provided.")]
    );
}

#[tokio::test]
async fn relays_reasoning_then_answer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"model": "deepseek-r1", "stream": true})))
        .with_status(200)
        .with_body(sse(&[
            json!({"choices": [{"delta": {"role": "assistant", "content": "", "reasoning_content": ""}}]}),
            json!({"choices": [{"delta": {"reasoning_content": "a"}}]}),
            json!({"choices": [{"delta": {"content": "b"}}]}),
        ]))
        .create_async()
        .await;

    let fragments = collect(&pipe_for(&server, "sk-test"), "test.deepseek-r1").await;

    assert_eq!(fragments, vec!["<think>", "a", "</think>", "b"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn reasoning_only_response_is_left_open() {
    let mut server = mockito::Server::new_async().await;
    mock_chat(
        &mut server,
        sse(&[json!({"choices": [{"delta": {"reasoning_content": "a"}}]})]),
    )
    .await;

    let fragments = collect(&pipe_for(&server, "sk-test"), "deepseek-r1").await;

    assert_eq!(fragments, vec!["<think>", "a"]);
}

#[tokio::test]
async fn first_line_error_yields_single_block() {
    let mut server = mockito::Server::new_async().await;
    mock_chat(&mut server, "{\"error\":{\"message\":\"bad key\"}}\n".to_string()).await;

    let fragments = collect(&pipe_for(&server, "sk-test"), "deepseek-r1").await;

    assert_eq!(fragments, vec![ERROR_BLOCK_BAD_KEY]);
}

#[tokio::test]
async fn error_status_yields_single_block() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#)
        .create_async()
        .await;

    let fragments = collect(&pipe_for(&server, "sk-test"), "deepseek-r1").await;

    assert_eq!(fragments, vec![ERROR_BLOCK_BAD_KEY]);
}

#[tokio::test]
async fn malformed_event_ends_with_error_block() {
    let mut server = mockito::Server::new_async().await;
    mock_chat(
        &mut server,
        concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
            "data: {oops\n\n",
            "data: [DONE]\n\n"
        )
        .to_string(),
    )
    .await;

    let fragments = collect(&pipe_for(&server, "sk-test"), "deepseek-v3").await;

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0], "partial");
    assert!(fragments[1].starts_with("```json\n{\n  \"error\": \"Serialization error: "));
}

#[tokio::test]
async fn dropping_stream_early_is_clean() {
    let mut server = mockito::Server::new_async().await;
    mock_chat(
        &mut server,
        sse(&[
            json!({"choices": [{"delta": {"reasoning_content": "a"}}]}),
            json!({"choices": [{"delta": {"content": "b"}}]}),
        ]),
    )
    .await;

    let pipe = pipe_for(&server, "sk-test");
    let request = ChatRequest::new("deepseek-r1", vec![ChatMessage::user("hi")]);
    let first: Vec<String> = pipe.stream_chat(request).take(1).collect().await;
    assert_eq!(first, vec!["<think>"]);

    // The pipe stays usable after an abandoned stream
    let again = collect(&pipe, "deepseek-r1").await;
    assert_eq!(again, vec!["<think>", "a", "</think>", "b"]);
}

#[tokio::test]
async fn works_through_trait_object() {
    let mut server = mockito::Server::new_async().await;
    mock_chat(
        &mut server,
        sse(&[json!({"choices": [{"delta": {"content": "plain"}}]})]),
    )
    .await;

    let pipe: Box<dyn ChatPipe> = Box::new(pipe_for(&server, "sk-test"));
    let request = ChatRequest::new("deepseek-v3", vec![ChatMessage::user("hi")]);
    let fragments: Vec<String> = pipe.stream_chat(request).collect().await;

    assert_eq!(fragments, vec!["plain"]);
}
