//! Structured errors for AI parsing
//!
//! Every failure carries a stable code so an agent can decide how to recover
//! (bind the missing variable, remember the window, retry the prompt...).

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code:?}] {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnboundVariable,
    InvalidAction,
    CollaboratorFailure,
    PromptTimeout,
    AlreadyRecording,
    NotRecording,
    NotFound,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// A `{var}` reference named a variable that is not bound.
    /// `bound` lists what is available so the caller can correct the name.
    pub fn unbound_variable<'a>(name: &str, bound: impl IntoIterator<Item = &'a str>) -> Self {
        let bound: Vec<String> = bound.into_iter().map(str::to_string).collect();
        let mut suggestions = vec![format!(
            "bind '{}' with a prompt_point action or pass it in the initial variables",
            name
        )];
        if !bound.is_empty() {
            suggestions.push(format!("bound variables: {}", bound.join(", ")));
        }
        Self::new(
            ErrorCode::UnboundVariable,
            format!("Unbound variable: {}", name),
        )
        .with_suggestions(suggestions)
        .with_context(serde_json::json!({ "var": name }))
    }

    pub fn invalid_action(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAction, reason)
    }

    /// Invalid action data at a known position in a sequence
    pub fn invalid_action_at(index: usize, reason: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidAction,
            format!("Invalid action at index {}: {}", index, reason),
        )
        .with_context(serde_json::json!({ "index": index }))
    }

    pub fn collaborator_failure(action: &str, cause: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::CollaboratorFailure,
            format!("{} failed: {}", action, cause),
        )
        .with_context(serde_json::json!({ "action": action }))
    }

    pub fn prompt_timeout(var: &str, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::PromptTimeout,
            format!("Timeout after {}ms waiting for point '{}'", timeout_ms, var),
        )
        .with_context(serde_json::json!({ "var": var, "timeout_ms": timeout_ms }))
    }

    pub fn already_recording() -> Self {
        Self::new(ErrorCode::AlreadyRecording, "Recording already in progress")
            .with_suggestions(vec!["stop the active recording first".to_string()])
    }

    pub fn not_recording() -> Self {
        Self::new(ErrorCode::NotRecording, "No active recording")
    }

    pub fn window_not_found<'a>(name: &str, known: impl IntoIterator<Item = &'a str>) -> Self {
        let known: Vec<String> = known.into_iter().map(str::to_string).collect();
        let err = Self::new(ErrorCode::NotFound, format!("Window '{}' not found", name));
        if known.is_empty() {
            err.with_suggestions(vec!["remember a window first".to_string()])
        } else {
            err.with_context(serde_json::json!({ "available_windows": known }))
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidAction, e.to_string())
    }
}
