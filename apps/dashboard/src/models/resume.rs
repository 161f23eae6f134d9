use serde::{Deserialize, Serialize};

/// Result of `POST /api/agents/parse-resume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeParseResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub skills_count: u32,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub skills: Vec<String>,
}
