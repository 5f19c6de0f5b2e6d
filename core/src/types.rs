//! Request and response shapes for the Mixgarden API.
//!
//! # Design
//! Request types are explicit structs with optional fields instead of
//! free-form maps; the wire names are camelCase. Responses are returned to
//! callers as raw `serde_json::Value` so nothing the server adds is lost.
//! The typed views below (`Plugin`, `Conversation`, `ChatResponse`) are
//! opt-in via [`decode`] and keep unknown fields in a flattened map.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.is_empty())
}

fn is_empty_map(value: &Option<Map<String, Value>>) -> bool {
    value.as_ref().map_or(true, Map::is_empty)
}

/// Body for `POST /chat`: run a prompt through a single plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    pub plugin_id: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub params: Option<Map<String, Value>>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            plugin_id: plugin_id.into(),
            model: None,
            params: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// Body for `POST /chat/completions` and `POST /mg-completion`.
///
/// Fields the client does not model can be passed through `extra`; they are
/// serialized at the top level of the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub plugin_settings: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Query filters for `GET /conversations`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationFilters {
    pub plugin_id: Option<String>,
    pub model: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ConversationFilters {
    /// Query pairs in a stable order; unset filters are omitted.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(plugin_id) = self.plugin_id.as_deref().filter(|s| !s.is_empty()) {
            query.push(("pluginId".to_string(), plugin_id.to_string()));
        }
        if let Some(model) = self.model.as_deref().filter(|s| !s.is_empty()) {
            query.push(("model".to_string(), model.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        query
    }
}

/// Input for the create-or-continue conversation flow.
///
/// `conversation_id` selects the target conversation and is never part of a
/// request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationalChat {
    #[serde(default, skip_serializing)]
    pub conversation_id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub plugin_settings: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub title: Option<String>,
}

impl ConversationalChat {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The message posted right after a conversation is created: only the
    /// content and routing fields, nothing conversation-level like `title`.
    pub fn first_message(&self) -> NewMessage {
        NewMessage {
            content: self.content.clone(),
            model: self.model.clone(),
            plugin_id: self.plugin_id.clone(),
            plugin_settings: self.plugin_settings.clone(),
        }
    }
}

/// Body for `POST /conversations/{id}/messages` after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub plugin_settings: Option<Map<String, Value>>,
}

/// Typed view of a plugin. Everything besides `id` is kept as metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plugin {
    pub id: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Typed view of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a `/chat` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Convert a decoded response into one of the typed views.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
