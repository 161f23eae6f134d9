//! Authenticated agent calls: résumé parsing, job search, applications.
//!
//! Every call takes its token from the session store and is routed through
//! `SessionStore::guard`, so a 401 signs the user out before returning.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::errors::ClientError;
use crate::models::{ApplyRequest, ApplyResponse, Job, ResumeParseResult};
use crate::session::{NotificationLevel, SessionStore};

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

pub struct JobAgents {
    session: Arc<SessionStore>,
}

impl JobAgents {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Uploads a résumé for parsing, then reloads the profile so
    /// `resume_uploaded` and the extracted skills show up.
    pub async fn upload_resume(
        &self,
        file_name: &str,
        content: Bytes,
    ) -> Result<ResumeParseResult, ClientError> {
        let result = self.try_upload_resume(file_name, content).await;
        self.finish(result, |parsed| {
            format!("Resume parsed: {} skills found", parsed.skills_count)
        })
    }

    async fn try_upload_resume(
        &self,
        file_name: &str,
        content: Bytes,
    ) -> Result<ResumeParseResult, ClientError> {
        validate_resume(file_name, &content)?;
        let token = self.session.require_token()?;
        let parsed = self
            .session
            .guard(self.session.api().parse_resume(&token, file_name, content).await)?;
        info!(
            "Resume {file_name} parsed: {} skills, {} years",
            parsed.skills_count, parsed.experience_years
        );
        self.session.refresh_profile().await;
        Ok(parsed)
    }

    pub async fn find_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let result = self.try_find_jobs().await;
        self.finish(result, |jobs| format!("Found {} job matches", jobs.len()))
    }

    async fn try_find_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let token = self.session.require_token()?;
        let response = self
            .session
            .guard(self.session.api().find_jobs(&token).await)?;
        if !response.success {
            return Err(ClientError::SearchUnavailable(
                response
                    .error
                    .unwrap_or_else(|| "Job search failed".to_string()),
            ));
        }
        Ok(response.jobs)
    }

    pub async fn apply_to_job(&self, job: &Job) -> Result<ApplyResponse, ClientError> {
        let result = self.try_apply(&ApplyRequest::from(job)).await;
        self.finish(result, |response| {
            if response.message.is_empty() {
                format!("Applied to {} at {}", job.title, job.company)
            } else {
                response.message.clone()
            }
        })
    }

    async fn try_apply(&self, request: &ApplyRequest) -> Result<ApplyResponse, ClientError> {
        let token = self.session.require_token()?;
        self.session
            .guard(self.session.api().apply_to_job(&token, request).await)
    }

    fn finish<T>(
        &self,
        result: Result<T, ClientError>,
        success: impl FnOnce(&T) -> String,
    ) -> Result<T, ClientError> {
        match &result {
            Ok(value) => self.session.notify(NotificationLevel::Success, success(value)),
            Err(e) => self.session.report(e),
        }
        result
    }
}

/// Reads a résumé from disk, returning its file name and content.
pub async fn load_resume(path: &Path) -> Result<(String, Bytes), ClientError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::Validation(format!("Invalid file path: {}", path.display())))?
        .to_string();
    let content = tokio::fs::read(path).await.map_err(|e| {
        ClientError::Validation(format!("Could not read {}: {e}", path.display()))
    })?;
    Ok((file_name, Bytes::from(content)))
}

/// Rejects files the parser would refuse anyway, before any upload.
pub fn validate_resume(file_name: &str, content: &[u8]) -> Result<(), ClientError> {
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(ClientError::Validation("Only PDF files are supported".into()));
    }
    if content.is_empty() {
        return Err(ClientError::Validation("The selected file is empty".into()));
    }
    if content.len() > MAX_RESUME_BYTES {
        return Err(ClientError::Validation(format!(
            "Resume must be smaller than {} MB",
            MAX_RESUME_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_resume_extension() {
        assert!(validate_resume("cv.PDF", b"%PDF-1.4").is_ok());
        let err = validate_resume("cv.docx", b"data").unwrap_err();
        assert_eq!(err.user_message(), "Only PDF files are supported");
    }

    #[test]
    fn test_validate_resume_size() {
        assert!(validate_resume("cv.pdf", b"").is_err());
        let big = vec![0u8; MAX_RESUME_BYTES + 1];
        assert!(validate_resume("cv.pdf", &big).is_err());
    }

    #[tokio::test]
    async fn test_load_resume_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let (name, content) = load_resume(&path).await.unwrap();
        assert_eq!(name, "resume.pdf");
        assert_eq!(&content[..], b"%PDF-1.4");
    }
}
