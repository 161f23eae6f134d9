#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dashboard::{ApiClient, MemoryTokenStore, SessionStore};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn profile_json(location: &str) -> Value {
    json!({
        "user_id": "u-1",
        "full_name": "A",
        "email": "a@b.com",
        "phone": null,
        "location": location,
        "experience_level": "Mid-Level",
        "desired_salary": null,
        "preferred_job_types": ["Full-time"],
        "profile_picture": null,
        "resume_uploaded": false,
        "skills": [],
        "education": [],
        "work_experience": [],
        "created_at": "2024-05-01T09:00:00.000000",
        "updated_at": "2024-05-01T09:00:00.000000"
    })
}

pub fn store_for(server: &MockServer, tokens: Arc<MemoryTokenStore>) -> SessionStore {
    store_with_timeout(server, tokens, Duration::from_secs(5))
}

pub fn store_with_timeout(
    server: &MockServer,
    tokens: Arc<MemoryTokenStore>,
    timeout: Duration,
) -> SessionStore {
    let api = ApiClient::new(server.uri(), timeout).unwrap();
    SessionStore::new(api, tokens)
}

/// Mounts `GET /api/auth/me` answering for `token` with the given location.
pub async fn mock_me(server: &MockServer, token: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "profile": profile_json(location)
        })))
        .mount(server)
        .await;
}

pub async fn mock_sign_in_ok(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "access_token": token,
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
}
