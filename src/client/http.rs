#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use crate::client::{ApiError, ArcTransport, StreamResponse, Transport, extract_detail};
use crate::config::{ApiConfig, user_agent};
use crate::models::{
    Conversation, ConversationId, ConversationPage, Message, MessagePage, Page, StreamRequest,
};
use async_trait::async_trait;
use eyre::{Context, Result};
use futures::TryStreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time;

/// [`Transport`] over the QA service HTTP API.
pub struct HttpTransport {
    endpoint: String,
    token: Option<String>,
    timeout: Option<time::Duration>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_conversations(&self, page: Page) -> Result<ConversationPage> {
        let res = self
            .request(reqwest::Method::GET, "/qa/conversations")
            .query(&page)
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err("listing conversations")?;
        parse_json(res).await.wrap_err("listing conversations")
    }

    async fn create_conversation(&self, title: String) -> Result<Conversation> {
        let res = self
            .request(reqwest::Method::POST, "/qa/conversations")
            .json(&CreateConversationRequest { title: &title })
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err("creating conversation")?;
        parse_json(res).await.wrap_err("creating conversation")
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<()> {
        let res = self
            .request(reqwest::Method::DELETE, &format!("/qa/conversations/{id}"))
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err(format!("deleting conversation {id}"))?;
        check_status(res)
            .await
            .wrap_err(format!("deleting conversation {id}"))?;
        Ok(())
    }

    async fn list_messages(&self, id: ConversationId, page: Page) -> Result<MessagePage> {
        let res = self
            .request(
                reqwest::Method::GET,
                &format!("/qa/conversations/{id}/messages"),
            )
            .query(&page)
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err(format!("listing messages of conversation {id}"))?;
        parse_json(res)
            .await
            .wrap_err(format!("listing messages of conversation {id}"))
    }

    async fn post_message(&self, id: ConversationId, request: StreamRequest) -> Result<Message> {
        let res = self
            .request(
                reqwest::Method::POST,
                &format!("/qa/conversations/{id}/messages"),
            )
            .json(&request)
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err(format!("posting message to conversation {id}"))?;
        parse_json(res)
            .await
            .wrap_err(format!("posting message to conversation {id}"))
    }

    async fn open_stream(
        &self,
        id: ConversationId,
        request: StreamRequest,
    ) -> Result<StreamResponse> {
        log::debug!(
            "Opening message stream for conversation {}: use_rag={}, use_image={}, image={}",
            id,
            request.use_rag,
            request.use_image,
            request
                .image_base64
                .as_ref()
                .map(|img| format!("{} chars", img.len()))
                .unwrap_or_else(|| "none".to_string()),
        );

        let res = self
            .request(
                reqwest::Method::POST,
                &format!("/qa/conversations/{id}/messages/stream"),
            )
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(ApiError::Network)
            .wrap_err(format!("opening message stream for conversation {id}"))?;

        let status = res.status();
        let reason = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string());

        let body = res
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| eyre::Report::new(ApiError::Network(e)));

        Ok(StreamResponse {
            status: status.as_u16(),
            reason,
            body: Some(Box::pin(body)),
        })
    }
}

impl From<HttpTransport> for ArcTransport {
    fn from(value: HttpTransport) -> Self {
        Arc::new(value)
    }
}

impl From<&ApiConfig> for HttpTransport {
    fn from(value: &ApiConfig) -> Self {
        let mut transport = HttpTransport::new().with_endpoint(&value.endpoint);
        transport.token = value.resolve_token();
        transport.timeout = value.timeout();
        transport
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.endpoint, path))
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            endpoint: crate::config::constants::API_ENDPOINT.to_string(),
            token: None,
            timeout: None,
            client: reqwest::Client::new(),
        }
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response> {
    if res.status().is_success() {
        return Ok(res);
    }

    let http_code = res.status().as_u16();
    let body = res.bytes().await.unwrap_or_default();
    log::error!(
        "Error response ({}): {}",
        http_code,
        String::from_utf8_lossy(&body)
    );
    Err(ApiError::status(http_code, extract_detail(&body)).into())
}

async fn parse_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
    let res = check_status(res).await?;
    let value = res.json::<T>().await.map_err(ApiError::Decode)?;
    Ok(value)
}
