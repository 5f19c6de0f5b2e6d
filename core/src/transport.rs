//! Blocking Mixgarden client that owns the connection pool.
//!
//! # Design
//! `Mixgarden` pairs an [`ApiClient`] (pure request building and response
//! parsing) with a `ureq::Agent`. The agent is created once at construction
//! with the configured timeout and is shared by every call, so concurrent
//! callers on different threads reuse the same pool. Non-2xx statuses,
//! 3xx included, are returned by the agent as data and interpreted by
//! `ApiClient::parse_json`; redirects are never followed, so no request
//! leaves without the bearer header. Bodies are read as bytes without a
//! size cap.
//!
//! The pool is released when the client is dropped; [`Mixgarden::close`]
//! and [`Mixgarden::scoped`] make that point explicit. Because `close`
//! consumes the client, release happens once on every exit path.

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ChatRequest, CompletionRequest, ConversationFilters, ConversationalChat};

pub struct Mixgarden {
    api: ApiClient,
    agent: ureq::Agent,
    config: ClientConfig,
}

impl Mixgarden {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build()
            .new_agent();
        debug!(base_url = config.base_url(), timeout = ?config.timeout(), "mixgarden client ready");
        Ok(Self {
            api: ApiClient::new(&config),
            agent,
            config,
        })
    }

    /// Build a client from `MIXGARDEN_API_KEY` (and `MIXGARDEN_BASE_URL`).
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(api_key)?)
    }

    /// Open a client, run `f` with it, and close it whatever `f` returns.
    pub fn scoped<T, F>(config: ClientConfig, f: F) -> Result<T>
    where
        F: FnOnce(&Mixgarden) -> Result<T>,
    {
        let client = Self::new(config)?;
        let result = f(&client);
        client.close();
        result
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn list_plugins(&self) -> Result<Option<Value>> {
        self.send(self.api.build_list_plugins())
    }

    pub fn get_plugin(&self, plugin_id: &str) -> Result<Option<Value>> {
        self.send(self.api.build_get_plugin(plugin_id)?)
    }

    pub fn list_models(&self) -> Result<Option<Value>> {
        self.send(self.api.build_list_models())
    }

    /// Run a prompt through a plugin and return the server's JSON
    /// (typically `{"text": ...}`) unchanged.
    pub fn chat(&self, request: &ChatRequest) -> Result<Option<Value>> {
        self.send(self.api.build_chat(request)?)
    }

    pub fn get_completion(&self, request: &CompletionRequest) -> Result<Option<Value>> {
        self.send(self.api.build_completion(request)?)
    }

    pub fn get_mg_completion(&self, request: &CompletionRequest) -> Result<Option<Value>> {
        self.send(self.api.build_mg_completion(request)?)
    }

    pub fn list_conversations(&self, filters: &ConversationFilters) -> Result<Option<Value>> {
        self.send(self.api.build_list_conversations(filters))
    }

    pub fn get_conversation(&self, conversation_id: &str) -> Result<Option<Value>> {
        self.send(self.api.build_get_conversation(conversation_id)?)
    }

    /// Post a message and return the resulting conversation, creating the
    /// conversation first when `request.conversation_id` is unset.
    ///
    /// The requests run one after another and are not atomic. If a step
    /// after creation fails, the new conversation stays on the server and
    /// only the error is returned; callers that need exactly-once creation
    /// should create the conversation themselves and pass its id.
    pub fn chat_conversational(&self, request: &ConversationalChat) -> Result<Option<Value>> {
        let conversation_id = match request.conversation_id.as_deref() {
            Some(id) => {
                self.send(self.api.build_post_message(id, request)?)?;
                id.to_string()
            }
            None => {
                let created = self.send(self.api.build_create_conversation(request)?)?;
                let id = self.api.parse_created_id(created.as_ref())?;
                debug!(conversation_id = %id, "conversation created");
                self.send(self.api.build_post_message(&id, &request.first_message())?)?;
                id
            }
        };
        self.get_conversation(&conversation_id)
    }

    /// Release the connection pool.
    pub fn close(self) {
        debug!(base_url = self.config.base_url(), "closing mixgarden client");
        drop(self);
    }

    fn send(&self, request: HttpRequest) -> Result<Option<Value>> {
        let method = request.method;
        let url = request.url.clone();
        debug!(method = method.as_str(), url = %url, "sending request");

        let response = self.execute(request)?;
        if !response.is_success() {
            warn!(method = method.as_str(), url = %url, status = response.status, "request failed");
        }
        self.api.parse_json(response)
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                for (name, value) in &request.query {
                    builder = builder.query(name, value);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                for (name, value) in &request.query {
                    builder = builder.query(name, value);
                }
                builder.send(request.body.as_deref().unwrap_or_default().as_bytes())
            }
        };

        let mut response = result.map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| self.transport_error(e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn transport_error(&self, err: ureq::Error) -> ApiError {
        match err {
            ureq::Error::Timeout(kind) => {
                ApiError::Timeout(format!("{kind:?} timeout after {:?}", self.config.timeout()))
            }
            ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                ApiError::Timeout(format!("{io} after {:?}", self.config.timeout()))
            }
            other => ApiError::Transport(other.to_string()),
        }
    }
}

impl std::fmt::Debug for Mixgarden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixgarden")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
