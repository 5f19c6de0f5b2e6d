//! Stateless HTTP request builder and response parser for the Mixgarden API.
//!
//! # Design
//! `ApiClient` holds only the base URL and the bearer header and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest`; every response goes through
//! [`ApiClient::parse_json`]. `Mixgarden` executes the round-trip between
//! the two.

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ChatRequest, CompletionRequest, ConversationFilters, ConversationalChat};

/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    authorization: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            authorization: format!("Bearer {}", config.api_key()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_plugins(&self) -> HttpRequest {
        self.get("/plugins".to_string())
    }

    pub fn build_get_plugin(&self, plugin_id: &str) -> Result<HttpRequest> {
        let id = require_id("plugin id", plugin_id)?;
        Ok(self.get(format!("/plugins/{id}")))
    }

    pub fn build_list_models(&self) -> HttpRequest {
        self.get("/models".to_string())
    }

    pub fn build_chat(&self, input: &ChatRequest) -> Result<HttpRequest> {
        if input.plugin_id.trim().is_empty() {
            return Err(ApiError::InvalidArgument("plugin id must not be empty".to_string()));
        }
        self.post("/chat".to_string(), input)
    }

    pub fn build_completion(&self, input: &CompletionRequest) -> Result<HttpRequest> {
        self.post("/chat/completions".to_string(), input)
    }

    pub fn build_mg_completion(&self, input: &CompletionRequest) -> Result<HttpRequest> {
        self.post("/mg-completion".to_string(), input)
    }

    pub fn build_list_conversations(&self, filters: &ConversationFilters) -> HttpRequest {
        let mut req = self.get("/conversations".to_string());
        req.query = filters.to_query();
        req
    }

    pub fn build_get_conversation(&self, conversation_id: &str) -> Result<HttpRequest> {
        let id = require_id("conversation id", conversation_id)?;
        Ok(self.get(format!("/conversations/{id}")))
    }

    pub fn build_create_conversation(&self, input: &ConversationalChat) -> Result<HttpRequest> {
        self.post("/conversations".to_string(), input)
    }

    pub fn build_post_message<T: Serialize>(
        &self,
        conversation_id: &str,
        body: &T,
    ) -> Result<HttpRequest> {
        let id = require_id("conversation id", conversation_id)?;
        self.post(format!("/conversations/{id}/messages"), body)
    }

    /// Decode a response: `Some(json)` for 2xx, `None` for 204, `Http` for
    /// everything else.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Option<Value>> {
        check_status(&response)?;
        if response.status == 204 {
            return Ok(None);
        }
        serde_json::from_slice(&response.body)
            .map(Some)
            .map_err(|e| match response.header("content-type") {
                Some(content_type) => ApiError::Decode(format!("{e} (content-type: {content_type})")),
                None => ApiError::Decode(e.to_string()),
            })
    }

    /// Pull the `id` out of a freshly created conversation.
    pub fn parse_created_id(&self, created: Option<&Value>) -> Result<String> {
        created
            .and_then(|value| value.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::Decode("created conversation response has no string `id`".to_string())
            })
    }

    fn get(&self, path: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{path}", self.base_url),
            headers: vec![("authorization".to_string(), self.authorization.clone())],
            query: Vec::new(),
            body: None,
        }
    }

    fn post<T: Serialize + ?Sized>(&self, path: String, body: &T) -> Result<HttpRequest> {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{path}", self.base_url),
            headers: vec![
                ("authorization".to_string(), self.authorization.clone()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            query: Vec::new(),
            body: Some(body),
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Reject empty ids and percent-encode the rest as a single path segment.
fn require_id(what: &str, id: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(ApiError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(urlencoding::encode(id).into_owned())
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ApiClient {
        let config = ClientConfig::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:3000/")
            .unwrap();
        ApiClient::new(&config)
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn build_list_plugins_produces_correct_request() {
        let req = client().build_list_plugins();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/plugins");
        assert_eq!(req.header("Authorization"), Some("Bearer sk-test"));
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_get_plugin_encodes_id() {
        let req = client().build_get_plugin("tone pro/v2").unwrap();
        assert_eq!(req.url, "http://localhost:3000/plugins/tone%20pro%2Fv2");
    }

    #[test]
    fn build_get_plugin_rejects_empty_id() {
        let err = client().build_get_plugin("").unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn build_chat_produces_minimal_body() {
        let req = client()
            .build_chat(&ChatRequest::new("Rewrite this in pirate slang", "tonepro"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/chat");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"prompt": "Rewrite this in pirate slang", "pluginId": "tonepro"})
        );
    }

    #[test]
    fn build_chat_requires_plugin() {
        for plugin_id in ["", "   ", "\t"] {
            let err = client().build_chat(&ChatRequest::new("hi", plugin_id)).unwrap_err();
            assert!(matches!(err, ApiError::InvalidArgument(_)), "{plugin_id:?}");
        }
    }

    #[test]
    fn completion_endpoints_differ_only_in_path() {
        let input = CompletionRequest {
            content: Some("hi".to_string()),
            ..Default::default()
        };
        let c = client();
        let a = c.build_completion(&input).unwrap();
        let b = c.build_mg_completion(&input).unwrap();
        assert_eq!(a.url, "http://localhost:3000/chat/completions");
        assert_eq!(b.url, "http://localhost:3000/mg-completion");
        assert_eq!(a.body, b.body);
    }

    #[test]
    fn build_list_conversations_carries_filters() {
        let filters = ConversationFilters {
            limit: Some(5),
            ..Default::default()
        };
        let req = client().build_list_conversations(&filters);
        assert_eq!(req.url, "http://localhost:3000/conversations");
        assert_eq!(req.query, vec![("limit".to_string(), "5".to_string())]);
    }

    #[test]
    fn build_post_message_targets_conversation() {
        let chat = ConversationalChat::new("hi").in_conversation("c1");
        let req = client().build_post_message("c1", &chat).unwrap();
        assert_eq!(req.url, "http://localhost:3000/conversations/c1/messages");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"content": "hi"}));
    }

    #[test]
    fn parse_json_returns_body_unchanged() {
        let body = r#"{"text":"Arr","usage":{"tokens":3},"list":[1,2]}"#;
        let value = client().parse_json(response(200, body)).unwrap().unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(body).unwrap());
    }

    #[test]
    fn parse_json_accepts_any_2xx() {
        let value = client().parse_json(response(201, r#"{"id":"c1"}"#)).unwrap();
        assert_eq!(value, Some(json!({"id": "c1"})));
    }

    #[test]
    fn parse_json_no_content_yields_none() {
        assert_eq!(client().parse_json(response(204, "")).unwrap(), None);
    }

    #[test]
    fn parse_json_error_statuses() {
        for status in [400, 401, 404, 422, 500, 503] {
            let err = client().parse_json(response(status, "boom")).unwrap_err();
            match err {
                ApiError::Http { status: got, body } => {
                    assert_eq!(got, status);
                    assert_eq!(body, "boom");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn parse_json_bad_json() {
        let err = client().parse_json(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_json_decode_error_names_content_type() {
        let mut html = response(200, "<html></html>");
        html.headers.push(("Content-Type".to_string(), "text/html".to_string()));
        match client().parse_json(html).unwrap_err() {
            ApiError::Decode(message) => assert!(message.contains("text/html"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_json_invalid_utf8_success_is_decode_error() {
        let mut bytes = response(200, "");
        bytes.body = vec![0xff, 0xfe, 0x00, 0x80];
        assert!(matches!(client().parse_json(bytes), Err(ApiError::Decode(_))));
    }

    #[test]
    fn parse_json_binary_error_body_keeps_status() {
        let mut binary = response(500, "");
        binary.body = vec![0xff, 0xfe, 0x00, 0x80];
        let err = client().parse_json(binary).unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn parse_created_id_requires_string_id() {
        let c = client();
        assert_eq!(c.parse_created_id(Some(&json!({"id": "c9"}))).unwrap(), "c9");
        assert!(matches!(
            c.parse_created_id(Some(&json!({"id": 9}))),
            Err(ApiError::Decode(_))
        ));
        assert!(matches!(c.parse_created_id(None), Err(ApiError::Decode(_))));
    }

    #[test]
    fn debug_hides_authorization() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("sk-test"));
    }
}
