use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::answers::{Answers, answers_to_json};

/// Everything the submission endpoint receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub form_id: String,
    pub answers: Map<String, Value>,
    pub elapsed_ms: u64,
}

impl SubmissionRequest {
    pub fn new(form_id: &str, answers: &Answers, elapsed_ms: u64) -> Self {
        Self {
            form_id: form_id.to_string(),
            answers: answers_to_json(answers),
            elapsed_ms,
        }
    }
}

/// Endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Opaque I/O collaborator that stores a finished response.
pub trait SubmissionEndpoint {
    fn submit(&mut self, request: &SubmissionRequest) -> SubmissionResponse;
}

/// Where a controller is in the submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Failed,
    Done,
}

/// Terminal UI states exposed to respondents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Error => "error",
        }
    }
}

impl SubmissionState {
    pub fn status(self) -> SessionStatus {
        match self {
            SubmissionState::Idle | SubmissionState::InFlight => SessionStatus::InProgress,
            SubmissionState::Failed => SessionStatus::Error,
            SubmissionState::Done => SessionStatus::Submitted,
        }
    }

    /// No navigation or further submission while in flight or after success.
    pub fn is_locked(self) -> bool {
        matches!(self, SubmissionState::InFlight | SubmissionState::Done)
    }
}

/// Records every request and answers with a scripted reply.
#[derive(Debug, Clone, Default)]
pub struct RecordingEndpoint {
    pub requests: Vec<SubmissionRequest>,
    pub failures: Vec<String>,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues failures returned before the endpoint starts accepting.
    pub fn failing_with(mut self, error: impl Into<String>) -> Self {
        self.failures.push(error.into());
        self
    }
}

impl SubmissionEndpoint for RecordingEndpoint {
    fn submit(&mut self, request: &SubmissionRequest) -> SubmissionResponse {
        self.requests.push(request.clone());
        if self.failures.is_empty() {
            SubmissionResponse::accepted()
        } else {
            SubmissionResponse::rejected(self.failures.remove(0))
        }
    }
}
