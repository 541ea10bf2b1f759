use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Author of a message in an assistant thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message exchanged with the assistant, flattened to plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub role: Role,
    pub content: String,
}

/// Identifies a run started on the conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub thread_id: String,
    pub run_id: String,
}

/// Lifecycle status of an assistant run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop at this status
    ///
    /// `requires_action` counts as terminal: this client never submits tool
    /// outputs, so such a run can only sit there until it expires.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::RequiresAction
                | RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// OpenAI Assistants API Types
// ============================================================================

/// `POST /threads` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiThread {
    pub id: String,
}

/// Run object returned when creating or retrieving a run
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRun {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<ApiRunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRunError {
    pub code: String,
    pub message: String,
}

/// `GET /threads/{id}/messages` response, newest message first
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessageList {
    pub data: Vec<ApiMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub role: Role,
    /// Run that produced the message; absent on user messages
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<ApiMessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiMessageContent {
    Text { text: ApiText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiText {
    pub value: String,
}

impl ApiMessage {
    /// Concatenates the text parts of the message, ignoring images and files
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ApiMessageContent::Text { text } => Some(text.value.as_str()),
                ApiMessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<&ApiMessage> for AssistantReply {
    fn from(message: &ApiMessage) -> Self {
        AssistantReply {
            role: message.role,
            content: message.text(),
        }
    }
}
