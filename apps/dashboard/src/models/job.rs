use serde::{Deserialize, Serialize};

/// A job match as formatted by `POST /api/agents/find-jobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub job_type: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub apply_link: String,
    #[serde(default)]
    pub posted_date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub match_score: u32,
    #[serde(default)]
    pub applied: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindJobsResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub search_query: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyRequest {
    pub job_id: String,
    pub job_title: String,
    pub company: String,
}

impl From<&Job> for ApplyRequest {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}
