use futures::StreamExt;
use mockito::Matcher;

use super::*;
use crate::client::describe_error;
use crate::models::{MessageId, Role, SendOptions};

const CONVERSATION: &str = r#"{"id": 7, "user_id": 3, "title": "Rust questions", "create_time": "2025-03-01T08:00:00", "update_time": "2025-03-01T09:00:00"}"#;

fn setup_transport(url: String) -> HttpTransport {
    HttpTransport::new()
        .with_endpoint(&url)
        .with_token("test_token")
}

#[tokio::test]
async fn test_list_conversations() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("GET", "/qa/conversations")
        .match_header("Authorization", "Bearer test_token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("skip".into(), "0".into()),
            Matcher::UrlEncoded("limit".into(), "20".into()),
        ]))
        .with_status(200)
        .with_body(format!(r#"{{"conversations": [{CONVERSATION}], "total": 1}}"#))
        .expect(1)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let page = transport
        .list_conversations(Page::first(20))
        .await
        .expect("Failed to list conversations");

    handler.assert_async().await;
    assert_eq!(page.total, 1);
    assert_eq!(page.conversations.len(), 1);
    assert_eq!(page.conversations[0].id(), 7);
    assert_eq!(page.conversations[0].user_id(), 3);
    assert_eq!(page.conversations[0].title(), "Rust questions");
}

#[tokio::test]
async fn test_create_conversation() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/qa/conversations")
        .match_body(Matcher::Json(serde_json::json!({"title": "Rust questions"})))
        .with_status(200)
        .with_body(CONVERSATION)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let convo = transport
        .create_conversation("Rust questions".to_string())
        .await
        .expect("Failed to create conversation");

    handler.assert_async().await;
    assert_eq!(convo.id(), 7);
}

#[tokio::test]
async fn test_delete_conversation_error_detail() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/qa/conversations/7")
        .with_status(404)
        .with_body(r#"{"detail": "conversation not found"}"#)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let err = transport
        .delete_conversation(7)
        .await
        .expect_err("delete should fail");

    assert_eq!(err.to_string(), "deleting conversation 7");
    assert_eq!(describe_error(&err), "conversation not found");
    let api = err.downcast_ref::<ApiError>().expect("api error in chain");
    assert_eq!(api.http_code(), Some(404));
}

#[tokio::test]
async fn test_status_without_detail_falls_back_to_status_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/qa/conversations/7/messages")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let err = transport
        .list_messages(7, Page::first(50))
        .await
        .expect_err("listing should fail");

    assert_eq!(describe_error(&err), "unauthorized, please log in again");
    let api = err.downcast_ref::<ApiError>().expect("api error in chain");
    assert!(api.is_unauthorized());
}

#[tokio::test]
async fn test_list_messages() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("GET", "/qa/conversations/7/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("skip".into(), "0".into()),
            Matcher::UrlEncoded("limit".into(), "50".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"messages": [
                {"id": 101, "conversation_id": 7, "content": "hello", "role": "user", "create_time": "2025-03-01T08:30:00"},
                {"id": 102, "conversation_id": 7, "content": "hi there", "role": "assistant", "create_time": "2025-03-01T08:30:02"}
            ], "total": 2}"#,
        )
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let page = transport
        .list_messages(7, Page::first(50))
        .await
        .expect("Failed to list messages");

    handler.assert_async().await;
    assert_eq!(page.total, 2);
    assert_eq!(page.messages[0].id(), MessageId::Confirmed(101));
    assert_eq!(page.messages[1].role(), Role::Assistant);
}

#[tokio::test]
async fn test_post_message() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/qa/conversations/7/messages")
        .match_body(Matcher::Json(serde_json::json!({
            "content": "hello",
            "use_rag": true,
            "use_image": false,
        })))
        .with_status(200)
        .with_body(r#"{"id": 102, "conversation_id": 7, "content": "hi there", "role": "assistant", "create_time": "2025-03-01T08:30:02"}"#)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let reply = transport
        .post_message(
            7,
            StreamRequest::new("hello", SendOptions::default().with_rag(true)),
        )
        .await
        .expect("Failed to post message");

    handler.assert_async().await;
    assert_eq!(reply.content(), "hi there");
}

#[tokio::test]
async fn test_open_stream() {
    let body = "data: {\"type\":\"chunk\",\"content\":\"hi\"}\n\ndata: {\"type\":\"done\"}\n";

    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/qa/conversations/7/messages/stream")
        .match_header("Authorization", "Bearer test_token")
        .match_body(Matcher::Json(serde_json::json!({
            "content": "hello",
            "use_rag": false,
            "use_image": true,
            "image_base64": "aGVsbG8=",
        })))
        .with_status(200)
        .with_header("Content-Type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let res = transport
        .open_stream(
            7,
            StreamRequest::new("hello", SendOptions::default().with_image("aGVsbG8=")),
        )
        .await
        .expect("Failed to open stream");

    handler.assert_async().await;
    assert!(res.is_success());

    let mut received = Vec::new();
    let mut stream = res.body.expect("stream has a body");
    while let Some(chunk) = stream.next().await {
        received.extend(chunk.expect("Failed to read chunk"));
    }
    assert_eq!(String::from_utf8(received).unwrap(), body);
}

#[tokio::test]
async fn test_open_stream_error_status_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/qa/conversations/7/messages/stream")
        .with_status(500)
        .with_body(r#"{"detail":"overloaded"}"#)
        .create_async()
        .await;

    let transport = setup_transport(server.url());
    let res = transport
        .open_stream(7, StreamRequest::new("hello", SendOptions::default()))
        .await
        .expect("error statuses are returned to the caller");

    assert!(!res.is_success());
    assert_eq!(res.status, 500);
    assert_eq!(res.reason, "Internal Server Error");
}

#[tokio::test]
async fn test_network_error() {
    // Nothing listens on the discard port
    let transport = setup_transport("http://127.0.0.1:9".to_string());
    let err = transport
        .list_conversations(Page::first(20))
        .await
        .expect_err("request should fail");

    assert_eq!(err.to_string(), "listing conversations");
    assert_eq!(
        describe_error(&err),
        "network error, please check your connection"
    );
}

#[test]
fn test_from_api_config() {
    let config = ApiConfig {
        endpoint: "https://qa.example.com/api/".to_string(),
        token: Some("secret".to_string()),
        token_env: None,
        timeout_secs: Some(30),
    };
    let transport = HttpTransport::from(&config);
    assert_eq!(transport.endpoint(), "https://qa.example.com/api");
    assert_eq!(transport.token(), Some("secret"));
    assert_eq!(transport.timeout(), Some(time::Duration::from_secs(30)));
}

#[test]
fn test_extract_detail() {
    assert_eq!(
        extract_detail(br#"{"detail":"overloaded"}"#).as_deref(),
        Some("overloaded")
    );
    assert_eq!(
        extract_detail(br#"{"message":"bad input"}"#).as_deref(),
        Some("bad input")
    );
    assert_eq!(
        extract_detail(br#"{"detail":[{"msg":"field required"}]}"#).as_deref(),
        Some(r#"[{"msg":"field required"}]"#)
    );
    assert_eq!(extract_detail(b"<html>oops</html>"), None);
    assert_eq!(extract_detail(b"{}"), None);
}
