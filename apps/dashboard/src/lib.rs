//! Client for the AI job-application dashboard backend.
//!
//! `SessionStore` owns the signed-in session and the persisted token,
//! `JobAgents` wraps the authenticated agent endpoints, and `TaskPoller`
//! drives the long-running job-application agent.

pub mod agents;
pub mod api_client;
pub mod config;
pub mod errors;
pub mod models;
pub mod poller;
pub mod session;
pub mod token_store;

pub use agents::JobAgents;
pub use api_client::ApiClient;
pub use config::ClientConfig;
pub use errors::ClientError;
pub use poller::{PollConfig, TaskBackend, TaskHandle, TaskPoller};
pub use session::{Notification, NotificationLevel, ProfileFailurePolicy, Session, SessionStore};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
