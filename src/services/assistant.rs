/// OpenAI Assistants API client
///
/// API Flow (one long-lived thread per client):
/// 1. Thread: POST /threads (first use only)
/// 2. Message: POST /threads/{thread_id}/messages
/// 3. Run: POST /threads/{thread_id}/runs
/// 4. Poll: GET /threads/{thread_id}/runs/{run_id} until a terminal status
/// 5. Reply: GET /threads/{thread_id}/messages?run_id={run_id}
///
/// Runs abandoned on timeout or `requires_action` are cancelled with
/// POST /threads/{thread_id}/runs/{run_id}/cancel.
use crate::{
    error::{AppError, AppResult},
    models::{
        assistant::{ApiMessageList, ApiRun, ApiThread},
        AssistantReply, DiscoveryFilter, Role, RunHandle, RunStatus,
    },
};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VERSION: &str = "assistants=v2";

/// How often and how long to wait for a run to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Conversational assistant that answers free-form preferences
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Assistant: Send + Sync {
    /// Appends `text` to the conversation and starts a run on it
    async fn send_preferences(&self, text: &str) -> AppResult<RunHandle>;

    /// Waits for the run to reach a terminal status
    ///
    /// Returns `Ok(RunStatus::Completed)` on success. Any other terminal
    /// status is an `AssistantRun` error, and running past `options.timeout`
    /// is an `AssistantTimeout` error. Nothing is retried.
    async fn poll_until_complete(
        &self,
        handle: &RunHandle,
        options: PollOptions,
    ) -> AppResult<RunStatus>;

    /// The assistant message produced by the given run
    async fn latest_reply(&self, handle: &RunHandle) -> AppResult<AssistantReply>;

    /// Sends `text`, waits for the run and returns the reply it produced
    async fn ask(&self, text: &str, options: PollOptions) -> AppResult<AssistantReply> {
        let handle = self.send_preferences(text).await?;
        self.poll_until_complete(&handle, options).await?;
        self.latest_reply(&handle).await
    }
}

/// Parses the assistant's reply into a discovery filter
///
/// The reply is expected to be a JSON object, possibly wrapped in a Markdown
/// code fence with a language tag. Anything else is an `InvalidFilter` error.
pub fn extract_structured_filter(reply: &AssistantReply) -> AppResult<DiscoveryFilter> {
    let payload = strip_code_fence(&reply.content);

    let value: Value = serde_json::from_str(payload).map_err(|e| {
        tracing::warn!(error = %e, content = %reply.content, "Assistant reply is not JSON");
        AppError::InvalidFilter(format!("reply is not valid JSON: {}", e))
    })?;

    let object = value.as_object().ok_or_else(|| {
        AppError::InvalidFilter("reply must be a JSON object of filter values".to_string())
    })?;

    DiscoveryFilter::from_json_object(object)
}

/// Removes a surrounding Markdown fence and its optional language tag
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = trimmed.trim_start_matches('`');
    // The language tag runs to the end of the opening line
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end().trim_end_matches('`').trim()
}

pub struct OpenAiAssistant {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    assistant_id: String,
    /// Conversation thread, created on first use
    thread_id: OnceCell<String>,
    /// Held for a whole `ask`; the thread takes one active run at a time
    turn: Mutex<()>,
}

impl OpenAiAssistant {
    pub fn new(api_key: String, assistant_id: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            assistant_id,
            thread_id: OnceCell::new(),
            turn: Mutex::new(()),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OpenAI API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        tracing::debug!(response = %body, "Raw OpenAI API response");

        serde_json::from_str(&body).map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse OpenAI response: {}", e))
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);
        self.send_json(self.http_client.post(&url).json(&body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);
        self.send_json(self.http_client.get(&url)).await
    }

    /// The conversation thread, created on the first call
    async fn thread_id(&self) -> AppResult<&str> {
        let id = self
            .thread_id
            .get_or_try_init(|| async {
                let thread: ApiThread = self.post("threads", json!({})).await?;
                tracing::info!(thread_id = %thread.id, "Assistant thread created");
                Ok::<_, AppError>(thread.id)
            })
            .await?;

        Ok(id.as_str())
    }

    async fn retrieve_run(&self, handle: &RunHandle) -> AppResult<ApiRun> {
        self.get(&format!(
            "threads/{}/runs/{}",
            handle.thread_id, handle.run_id
        ))
        .await
    }

    /// Re-checks the run every `interval` until it reaches a terminal status
    async fn wait_for_terminal(&self, handle: &RunHandle, interval: Duration) -> AppResult<ApiRun> {
        loop {
            let run = self.retrieve_run(handle).await?;
            tracing::debug!(run_id = %handle.run_id, status = %run.status, "Run status");

            if run.status.is_terminal() {
                return Ok(run);
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Stops a run we are giving up on so the thread accepts new messages
    ///
    /// Best effort: a failed cancel is logged and otherwise ignored.
    async fn cancel_run(&self, handle: &RunHandle) {
        let path = format!(
            "threads/{}/runs/{}/cancel",
            handle.thread_id, handle.run_id
        );

        match self.post::<Value>(&path, json!({})).await {
            Ok(_) => tracing::info!(run_id = %handle.run_id, "Assistant run cancelled"),
            Err(e) => tracing::warn!(
                run_id = %handle.run_id,
                error = %e,
                "Failed to cancel assistant run"
            ),
        }
    }
}

#[async_trait::async_trait]
impl Assistant for OpenAiAssistant {
    async fn send_preferences(&self, text: &str) -> AppResult<RunHandle> {
        let thread_id = self.thread_id().await?;

        let _: Value = self
            .post(
                &format!("threads/{}/messages", thread_id),
                json!({ "role": "user", "content": text }),
            )
            .await?;

        let run: ApiRun = self
            .post(
                &format!("threads/{}/runs", thread_id),
                json!({ "assistant_id": self.assistant_id }),
            )
            .await?;

        tracing::info!(
            thread_id = %thread_id,
            run_id = %run.id,
            status = %run.status,
            "Assistant run started"
        );

        Ok(RunHandle {
            thread_id: run.thread_id,
            run_id: run.id,
        })
    }

    async fn poll_until_complete(
        &self,
        handle: &RunHandle,
        options: PollOptions,
    ) -> AppResult<RunStatus> {
        let poll = self.wait_for_terminal(handle, options.interval);

        let run = match tokio::time::timeout(options.timeout, poll).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    run_id = %handle.run_id,
                    timeout = ?options.timeout,
                    "Gave up waiting for assistant run"
                );
                self.cancel_run(handle).await;
                return Err(AppError::AssistantTimeout(options.timeout));
            }
        };

        if run.status == RunStatus::Completed {
            return Ok(run.status);
        }

        // Still active upstream, waiting on tool outputs we never send
        if run.status == RunStatus::RequiresAction {
            self.cancel_run(handle).await;
        }

        let message = run
            .last_error
            .map(|e| format!("{}: {}", e.code, e.message))
            .unwrap_or_else(|| "no error details".to_string());
        tracing::error!(
            run_id = %handle.run_id,
            status = %run.status,
            error = %message,
            "Assistant run did not complete"
        );

        Err(AppError::AssistantRun {
            status: run.status.to_string(),
            message,
        })
    }

    async fn latest_reply(&self, handle: &RunHandle) -> AppResult<AssistantReply> {
        let messages: ApiMessageList = self
            .get(&format!(
                "threads/{}/messages?order=desc&run_id={}",
                handle.thread_id,
                urlencoding::encode(&handle.run_id)
            ))
            .await?;

        messages
            .data
            .iter()
            .find(|m| m.role == Role::Assistant && m.run_id.as_deref() == Some(&handle.run_id))
            .map(AssistantReply::from)
            .ok_or_else(|| {
                AppError::ExternalApi(format!(
                    "Assistant run {} produced no reply",
                    handle.run_id
                ))
            })
    }

    async fn ask(&self, text: &str, options: PollOptions) -> AppResult<AssistantReply> {
        let _turn = self.turn.lock().await;

        let handle = self.send_preferences(text).await?;
        self.poll_until_complete(&handle, options).await?;
        self.latest_reply(&handle).await
    }
}
