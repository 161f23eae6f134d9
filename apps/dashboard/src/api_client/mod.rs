/// API Client — the single point of entry for all backend calls.
///
/// No other module builds HTTP requests. The session store, the agent calls
/// and the task poller all go through `ApiClient`.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::models::task::StatusResponse;
use crate::models::{
    ApplyRequest, ApplyResponse, AuthResponse, FindJobsResponse, ProfileEnvelope, ProfileUpdate,
    ResumeParseResult, SignInRequest, SignUpRequest, StartApplicationRequest,
    StartApplicationResponse, TaskStatus, UserProfile,
};
use crate::poller::TaskBackend;

pub mod detail;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the job-application backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /api/auth/signup
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse, ClientError> {
        let builder = self.client.post(self.url("/api/auth/signup")).json(request);
        self.execute_json(builder, None).await
    }

    /// POST /api/auth/signin
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse, ClientError> {
        let builder = self.client.post(self.url("/api/auth/signin")).json(request);
        self.execute_json(builder, None).await
    }

    /// GET /api/auth/me
    pub async fn me(&self, token: &str) -> Result<UserProfile, ClientError> {
        let builder = self.client.get(self.url("/api/auth/me"));
        let envelope: ProfileEnvelope = self.execute_json(builder, Some(token)).await?;
        Ok(envelope.profile)
    }

    /// PUT /api/auth/profile
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<(), ClientError> {
        let builder = self.client.put(self.url("/api/auth/profile")).json(update);
        self.execute(builder, Some(token)).await.map(|_| ())
    }

    /// POST /api/agents/parse-resume (multipart field `file`)
    pub async fn parse_resume(
        &self,
        token: &str,
        file_name: &str,
        content: Bytes,
    ) -> Result<ResumeParseResult, ClientError> {
        let part = multipart::Part::bytes(content.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);
        let builder = self
            .client
            .post(self.url("/api/agents/parse-resume"))
            .multipart(form);
        self.execute_json(builder, Some(token)).await
    }

    /// POST /api/agents/find-jobs
    pub async fn find_jobs(&self, token: &str) -> Result<FindJobsResponse, ClientError> {
        let builder = self.client.post(self.url("/api/agents/find-jobs"));
        self.execute_json(builder, Some(token)).await
    }

    /// POST /api/agents/apply-to-job
    pub async fn apply_to_job(
        &self,
        token: &str,
        request: &ApplyRequest,
    ) -> Result<ApplyResponse, ClientError> {
        let builder = self
            .client
            .post(self.url("/api/agents/apply-to-job"))
            .json(request);
        let body = self.execute(builder, Some(token)).await?;
        if body.is_null() {
            return Ok(ApplyResponse {
                success: true,
                ..Default::default()
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    /// POST /api/job-application/start
    pub async fn start_application(
        &self,
        request: &StartApplicationRequest,
    ) -> Result<String, ClientError> {
        let builder = self
            .client
            .post(self.url("/api/job-application/start"))
            .json(request);
        let response: StartApplicationResponse = self.execute_json(builder, None).await?;
        Ok(response.agent_id)
    }

    /// GET /api/job-application/{id}/status
    pub async fn application_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        let builder = self
            .client
            .get(self.url(&format!("/api/job-application/{task_id}/status")));
        let response: StatusResponse = self.execute_json(builder, None).await?;
        let mut status = response.into_status();
        if status.task_id.is_empty() {
            status.task_id = task_id.to_string();
        }
        Ok(status)
    }

    /// GET /api/job-application/{id}/results
    pub async fn application_results(&self, task_id: &str) -> Result<Value, ClientError> {
        let builder = self
            .client
            .get(self.url(&format!("/api/job-application/{task_id}/results")));
        let mut body = self.execute(builder, None).await?;
        if let Some(results) = body.get_mut("results") {
            return Ok(results.take());
        }
        Ok(body)
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<Value, ClientError> {
        let builder = self.client.get(self.url("/api/health"));
        self.execute(builder, None).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        let body = self.execute(builder, bearer).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Sends a request and returns the JSON body (`Null` for an empty body).
    ///
    /// A 401 maps to `Unauthorized` only when a bearer token was sent;
    /// credential endpoints report it as a server error carrying `detail`.
    async fn execute(
        &self,
        builder: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<Value, ClientError> {
        let builder = match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED && bearer.is_some() {
            warn!("Backend rejected bearer token on {url}");
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() {
            let detail = detail::extract(&text)
                .unwrap_or_else(|| fallback_detail(status, &text));
            warn!("Backend returned {status} on {url}: {detail}");
            return Err(ClientError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        debug!("Backend call succeeded: {url} ({status})");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn fallback_detail(status: StatusCode, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn submit(&self, request: &StartApplicationRequest) -> Result<String, ClientError> {
        self.start_application(request).await
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.application_status(task_id).await
    }

    async fn results(&self, task_id: &str) -> Result<Value, ClientError> {
        self.application_results(task_id).await
    }
}
