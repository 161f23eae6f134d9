use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stage of the job-application agent.
///
/// `initializing -> {parsing, searching, generating}* -> completed`, or any
/// state to `error`. `completed` and `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Initializing,
    #[serde(alias = "parsing_resume")]
    Parsing,
    #[serde(alias = "searching_jobs")]
    Searching,
    #[serde(alias = "generating_cover_letters", alias = "generating_cover_letter")]
    Generating,
    Completed,
    #[serde(alias = "failed")]
    Error,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Error)
    }
}

/// One observation of a running task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, alias = "agent_id")]
    pub task_id: String,
    pub status: TaskState,
    #[serde(default, alias = "current_step_description")]
    pub current_step: String,
    #[serde(default, deserialize_with = "progress_percent")]
    pub progress: u8,
    #[serde(default)]
    pub results: Option<Value>,
}

impl TaskStatus {
    pub fn initializing(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskState::Initializing,
            current_step: String::new(),
            progress: 0,
            results: None,
        }
    }
}

fn progress_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(raw.clamp(0.0, 100.0).round() as u8)
}

/// `GET /api/job-application/{id}/status` answers either `{status: {...}}` or a flat status.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusResponse {
    Wrapped { status: TaskStatus },
    Flat(TaskStatus),
}

impl StatusResponse {
    pub(crate) fn into_status(self) -> TaskStatus {
        match self {
            StatusResponse::Wrapped { status } | StatusResponse::Flat(status) => status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StartApplicationRequest {
    pub resume_data: Value,
    pub preferences: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartApplicationResponse {
    pub agent_id: String,
}
