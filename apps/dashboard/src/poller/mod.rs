//! Long-Running Task Poller — drives the job-application agent to a terminal state.
//!
//! `TaskPoller::start` submits the task and spawns the poll loop. The loop
//! is owned by the returned `TaskHandle`: cancelling or dropping the handle
//! aborts it, and no status update is published after `cancel()` returns.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::models::{StartApplicationRequest, TaskState, TaskStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Backend operations the poll loop depends on. `ApiClient` is the HTTP implementation.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn submit(&self, request: &StartApplicationRequest) -> Result<String, ClientError>;
    async fn status(&self, task_id: &str) -> Result<TaskStatus, ClientError>;
    async fn results(&self, task_id: &str) -> Result<Value, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Wall-clock cap of the loop, ignoring request latency.
    pub fn deadline(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

pub struct TaskPoller {
    backend: Arc<dyn TaskBackend>,
    config: PollConfig,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn TaskBackend>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Submits the task and starts polling it. A failed submit aborts the flow.
    pub async fn start(&self, request: &StartApplicationRequest) -> Result<TaskHandle, ClientError> {
        let task_id = self.backend.submit(request).await?;
        info!("Job application task {task_id} submitted");
        Ok(self.watch(task_id))
    }

    /// Starts polling an already submitted task. Must be called inside a Tokio runtime.
    pub fn watch(&self, task_id: String) -> TaskHandle {
        let (updates, status) = watch::channel(TaskStatus::initializing(task_id.clone()));
        let gate = UpdateGate::default();

        let backend = Arc::clone(&self.backend);
        let config = self.config;
        let loop_gate = gate.clone();
        let id = task_id.clone();
        let join = tokio::spawn(async move {
            poll_until_done(backend.as_ref(), &id, config, &updates, &loop_gate).await
        });

        TaskHandle {
            task_id,
            status,
            gate,
            join: Some(join),
        }
    }
}

/// Ownership of a running poll loop.
pub struct TaskHandle {
    task_id: String,
    status: watch::Receiver<TaskStatus>,
    gate: UpdateGate,
    join: Option<JoinHandle<Result<Value, ClientError>>>,
}

impl TaskHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Receiver woken on every status observation.
    pub fn status(&self) -> watch::Receiver<TaskStatus> {
        self.status.clone()
    }

    pub fn current(&self) -> TaskStatus {
        self.status.borrow().clone()
    }

    /// Stops the loop. No poll is scheduled and no update is published afterwards.
    pub fn cancel(&self) {
        self.gate.close();
        if let Some(join) = &self.join {
            join.abort();
        }
        debug!("Polling for task {} cancelled", self.task_id);
    }

    /// Waits for the loop to finish and returns the results payload.
    pub async fn wait(mut self) -> Result<Value, ClientError> {
        let Some(join) = self.join.take() else {
            return Err(ClientError::TaskCancelled);
        };
        match join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ClientError::TaskCancelled),
            Err(e) => Err(ClientError::TaskFailed(format!("poll loop panicked: {e}"))),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            self.gate.close();
            join.abort();
        }
    }
}

/// Serializes "is the handle still live" with the publication of an update.
#[derive(Clone)]
struct UpdateGate(Arc<Mutex<bool>>);

impl Default for UpdateGate {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }
}

impl UpdateGate {
    fn close(&self) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = false;
    }

    /// Publishes the update if still open; returns false once closed.
    fn publish(&self, updates: &watch::Sender<TaskStatus>, status: TaskStatus) -> bool {
        let open = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if !*open {
            return false;
        }
        updates.send_replace(status);
        true
    }
}

/// The poll loop. The first status check is immediate, then one per interval.
///
/// Any failed status request ends the loop; it is never retried.
async fn poll_until_done(
    backend: &dyn TaskBackend,
    task_id: &str,
    config: PollConfig,
    updates: &watch::Sender<TaskStatus>,
    gate: &UpdateGate,
) -> Result<Value, ClientError> {
    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(config.interval).await;
        }

        let status = backend.status(task_id).await.map_err(|e| {
            warn!("Status check {attempt} for task {task_id} failed: {e}");
            e
        })?;
        debug!(
            "Task {task_id} attempt {attempt}: {:?} {}% {}",
            status.status, status.progress, status.current_step
        );

        let state = status.status;
        let step = status.current_step.clone();
        if !gate.publish(updates, status) {
            return Err(ClientError::TaskCancelled);
        }

        match state {
            TaskState::Completed => {
                info!("Task {task_id} completed after {attempt} status checks");
                return backend.results(task_id).await;
            }
            TaskState::Error => {
                let message = if step.is_empty() {
                    "The job application agent reported an error".to_string()
                } else {
                    step
                };
                warn!("Task {task_id} failed: {message}");
                return Err(ClientError::TaskFailed(message));
            }
            _ => {}
        }
    }

    warn!(
        "Task {task_id} did not finish within {} status checks",
        config.max_attempts
    );
    Err(ClientError::TaskTimeout {
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Step {
        Status(TaskState, u8, &'static str),
        Fail,
    }

    /// Plays back a fixed list of status responses, then keeps answering `searching`.
    struct ScriptedBackend {
        steps: Mutex<VecDeque<Step>>,
        submit_fails: bool,
        status_calls: AtomicUsize,
        results_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                submit_fails: false,
                status_calls: AtomicUsize::new(0),
                results_calls: AtomicUsize::new(0),
            })
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        fn results_calls(&self) -> usize {
            self.results_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskBackend for ScriptedBackend {
        async fn submit(&self, _request: &StartApplicationRequest) -> Result<String, ClientError> {
            if self.submit_fails {
                return Err(ClientError::Server {
                    status: 500,
                    detail: "agent unavailable".into(),
                });
            }
            Ok("x".into())
        }

        async fn status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Fail) => Err(ClientError::Server {
                    status: 502,
                    detail: "Bad Gateway".into(),
                }),
                Some(Step::Status(state, progress, current_step)) => Ok(TaskStatus {
                    task_id: task_id.into(),
                    status: state,
                    current_step: current_step.into(),
                    progress,
                    results: None,
                }),
                None => Ok(TaskStatus {
                    task_id: task_id.into(),
                    status: TaskState::Searching,
                    current_step: "Searching for jobs".into(),
                    progress: 40,
                    results: None,
                }),
            }
        }

        async fn results(&self, _task_id: &str) -> Result<Value, ClientError> {
            self.results_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"applications_sent": 3}))
        }
    }

    fn poller(backend: Arc<ScriptedBackend>) -> TaskPoller {
        TaskPoller::new(backend, PollConfig::default())
    }

    #[test]
    fn test_default_deadline_is_two_minutes() {
        assert_eq!(PollConfig::default().deadline(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_stops_loop_and_fetches_results_once() {
        let backend = ScriptedBackend::new(vec![
            Step::Status(TaskState::Parsing, 10, "Parsing resume"),
            Step::Status(TaskState::Completed, 100, "Done"),
        ]);
        let handle = poller(backend.clone())
            .start(&StartApplicationRequest::default())
            .await
            .unwrap();
        assert_eq!(handle.task_id(), "x");
        let status = handle.status();

        let results = handle.wait().await.unwrap();
        assert_eq!(results, json!({"applications_sent": 3}));
        assert_eq!(status.borrow().status, TaskState::Completed);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.status_calls(), 2);
        assert_eq!(backend.results_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_reports_timeout() {
        let backend = ScriptedBackend::new(vec![]);
        let handle = poller(backend.clone()).watch("x".into());

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, ClientError::TaskTimeout { attempts: 60 }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.status_calls(), 60);
        assert_eq!(backend.results_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_reports_step() {
        let backend = ScriptedBackend::new(vec![
            Step::Status(TaskState::Initializing, 0, "Starting"),
            Step::Status(TaskState::Error, 20, "Resume could not be parsed"),
        ]);
        let err = poller(backend.clone()).watch("x".into()).wait().await.unwrap_err();
        assert!(matches!(err, ClientError::TaskFailed(ref m) if m == "Resume could not be parsed"));
        assert_eq!(backend.results_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_request_aborts_loop() {
        let backend = ScriptedBackend::new(vec![
            Step::Status(TaskState::Parsing, 10, "Parsing resume"),
            Step::Fail,
        ]);
        let err = poller(backend.clone()).watch("x".into()).wait().await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 502, .. }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polls_and_updates() {
        let backend = ScriptedBackend::new(vec![Step::Status(TaskState::Parsing, 10, "Parsing resume")]);
        let handle = poller(backend.clone()).watch("x".into());
        let mut status = handle.status();

        status.changed().await.unwrap();
        assert_eq!(status.borrow_and_update().progress, 10);
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.status_calls(), 1);
        assert!(!status.has_changed().unwrap_or(false));
        assert!(matches!(handle.wait().await, Err(ClientError::TaskCancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let backend = ScriptedBackend::new(vec![]);
        let handle = poller(backend.clone()).watch("x".into());
        let mut status = handle.status();
        status.changed().await.unwrap();

        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_aborts_flow() {
        let backend = Arc::new(ScriptedBackend {
            steps: Mutex::new(VecDeque::new()),
            submit_fails: true,
            status_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
        });
        let result = poller(backend.clone()).start(&StartApplicationRequest::default()).await;
        assert!(matches!(result, Err(ClientError::Server { status: 500, .. })));
        assert_eq!(backend.status_calls(), 0);
    }
}
