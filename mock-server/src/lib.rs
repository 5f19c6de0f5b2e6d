use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub prompt: String,
    pub plugin_id: String,
    pub model: Option<String>,
    pub params: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversation {
    pub title: Option<String>,
    pub plugin_id: Option<String>,
    pub model: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessage {
    pub content: String,
    pub plugin_id: Option<String>,
    pub model: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConversations {
    pub plugin_id: Option<String>,
    pub model: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A request as seen by the server, recorded before auth and routing.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// A canned response served instead of the real handler. The content type
/// defaults to `application/json` unless `headers` sets one.
#[derive(Clone, Debug)]
pub struct Injected {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Injected {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::bytes(status, body.into().into_bytes())
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
            delay: None,
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::status(200, "{}")
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

pub type Db = Arc<RwLock<Vec<Conversation>>>;

/// Shared server state. Cloning shares the same store, journal and
/// injected responses, so tests keep a handle while the server runs.
#[derive(Clone, Default)]
pub struct MockState {
    db: Db,
    journal: Arc<Mutex<Vec<RecordedRequest>>>,
    injected: Arc<Mutex<HashMap<(String, String), Injected>>>,
    api_key: Option<String>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `Authorization: Bearer <api_key>` on every request.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.clear();
        }
    }

    /// Serve `response` for `method` on paths matching `pattern`. A `*`
    /// segment in the pattern matches any single path segment.
    pub fn inject(&self, method: &str, pattern: &str, response: Injected) {
        if let Ok(mut injected) = self.injected.lock() {
            injected.insert((method.to_uppercase(), pattern.to_string()), response);
        }
    }

    fn record(&self, request: RecordedRequest) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(request);
        }
    }

    fn injected_for(&self, method: &str, path: &str) -> Option<Injected> {
        let injected = self.injected.lock().ok()?;
        injected
            .iter()
            .find(|((m, pattern), _)| m == method && path_matches(pattern, path))
            .map(|(_, response)| response.clone())
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path: Vec<&str> = path.trim_matches('/').split('/').collect();
    pattern.len() == path.len() && pattern.iter().zip(&path).all(|(p, s)| *p == "*" || p == s)
}

pub fn plugins() -> Vec<Value> {
    vec![
        json!({
            "id": "tonepro",
            "name": "Tone Pro",
            "description": "Rewrites text in a chosen tone",
            "settings": {"tone": {"type": "string", "default": "neutral"}}
        }),
        json!({
            "id": "summarize",
            "name": "Summarize",
            "description": "Condenses long text",
            "settings": {}
        }),
    ]
}

pub fn models() -> Vec<Value> {
    vec![
        json!({"id": "gpt-4o", "provider": "openai"}),
        json!({"id": "claude-3-5-sonnet", "provider": "anthropic"}),
    ]
}

pub fn app() -> Router {
    app_with(MockState::new())
}

pub fn app_with(state: MockState) -> Router {
    Router::new()
        .route("/plugins", get(list_plugins))
        .route("/plugins/{id}", get(get_plugin))
        .route("/models", get(list_models))
        .route("/chat", post(chat))
        .route("/chat/completions", post(completion))
        .route("/mg-completion", post(mg_completion))
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/messages", post(post_message))
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockState::new()).await
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

/// Records the request, enforces the bearer key and serves injected
/// responses before routing.
async fn gatekeeper(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let method = parts.method.as_str().to_string();
    let path = parts.uri.path().to_string();
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(%method, %path, "request");
    state.record(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: parts.uri.query().map(str::to_string),
        authorization: authorization.clone(),
        body: serde_json::from_slice(&bytes).ok(),
    });

    if let Some(key) = &state.api_key {
        if authorization.as_deref() != Some(format!("Bearer {key}").as_str()) {
            return error(StatusCode::UNAUTHORIZED, "invalid API key");
        }
    }

    if let Some(injected) = state.injected_for(&method, &path) {
        if let Some(delay) = injected.delay {
            tokio::time::sleep(delay).await;
        }
        return injected_response(injected);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn injected_response(injected: Injected) -> Response {
    let status = StatusCode::from_u16(injected.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, injected.body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in injected.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            headers.insert(name, value);
        }
    }
    response
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

async fn list_plugins() -> Json<Vec<Value>> {
    Json(plugins())
}

async fn get_plugin(Path(id): Path<String>) -> Response {
    match plugins().into_iter().find(|p| p["id"] == id.as_str()) {
        Some(plugin) => Json(plugin).into_response(),
        None => error(StatusCode::NOT_FOUND, "plugin not found"),
    }
}

async fn list_models() -> Json<Vec<Value>> {
    Json(models())
}

async fn chat(Json(input): Json<ChatBody>) -> Response {
    if !plugins().iter().any(|p| p["id"] == input.plugin_id.as_str()) {
        return error(StatusCode::NOT_FOUND, "plugin not found");
    }
    Json(json!({
        "text": format!("[{}] {}", input.plugin_id, input.prompt),
        "pluginId": input.plugin_id,
        "model": input.model.unwrap_or_else(|| "gpt-4o".to_string()),
        "params": input.params.unwrap_or_default(),
    }))
    .into_response()
}

async fn completion(Json(input): Json<Value>) -> Json<Value> {
    Json(json!({"object": "chat.completion", "request": input}))
}

async fn mg_completion(Json(input): Json<Value>) -> Json<Value> {
    Json(json!({"object": "mg.completion", "request": input}))
}

async fn list_conversations(
    State(state): State<MockState>,
    Query(filters): Query<ListConversations>,
) -> Json<Vec<Conversation>> {
    let db = state.db.read().await;
    let matching = db
        .iter()
        .filter(|c| filters.plugin_id.is_none() || c.plugin_id == filters.plugin_id)
        .filter(|c| filters.model.is_none() || c.model == filters.model)
        .skip(filters.offset.unwrap_or(0))
        .take(filters.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(matching)
}

async fn create_conversation(
    State(state): State<MockState>,
    Json(input): Json<CreateConversation>,
) -> (StatusCode, Json<Conversation>) {
    let conversation = Conversation {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        plugin_id: input.plugin_id,
        model: input.model,
        messages: Vec::new(),
    };
    state.db.write().await.push(conversation.clone());
    tracing::debug!(id = %conversation.id, "conversation created");
    (StatusCode::CREATED, Json(conversation))
}

async fn get_conversation(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.iter().find(|c| c.id == id) {
        Some(conversation) => Json(conversation.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "conversation not found"),
    }
}

async fn post_message(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Json(input): Json<PostMessage>,
) -> Response {
    let mut db = state.db.write().await;
    let Some(conversation) = db.iter_mut().find(|c| c.id == id) else {
        return error(StatusCode::NOT_FOUND, "conversation not found");
    };
    if input.plugin_id.is_some() {
        conversation.plugin_id = input.plugin_id;
    }
    if input.model.is_some() {
        conversation.model = input.model;
    }
    let plugin = conversation.plugin_id.clone().unwrap_or_else(|| "none".to_string());
    let reply = Message {
        role: "assistant".to_string(),
        content: format!("[{plugin}] {}", input.content),
    };
    conversation.messages.push(Message {
        role: "user".to_string(),
        content: input.content,
    });
    conversation.messages.push(reply.clone());
    (StatusCode::CREATED, Json(reply)).into_response()
}
