//! Blocking client for the Mixgarden plugin API.
//!
//! # Overview
//! Mixgarden proxies chat completions through server-side plugins. This
//! crate sends bearer-authenticated JSON requests to it and hands the decoded
//! JSON back unchanged.
//!
//! ```no_run
//! use mixgarden::{ChatRequest, ClientConfig, Mixgarden};
//!
//! let client = Mixgarden::new(ClientConfig::resolve(None)?)?;
//! let reply = client.chat(&ChatRequest::new("Rewrite this in pirate slang", "tonepro"))?;
//! println!("{}", reply.unwrap_or_default()["text"]);
//! client.close();
//! # Ok::<(), mixgarden::ApiError>(())
//! ```
//!
//! # Design
//! - `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//!   without touching the network, so every operation is testable offline.
//! - `Mixgarden` owns the pooled `ureq` agent and runs build, execute, parse.
//! - Responses are `Option<serde_json::Value>`: `None` means 204 No Content.
//! - No retries and no local recovery; every failure is an `ApiError`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::Mixgarden;
pub use types::{
    decode, ChatRequest, ChatResponse, CompletionRequest, Conversation, ConversationFilters,
    ConversationalChat, Message, NewMessage, Plugin,
};
