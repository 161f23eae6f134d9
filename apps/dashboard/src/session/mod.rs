//! Session Store — the single source of truth for "who is signed in".
//!
//! Constructed explicitly and shared as `Arc<SessionStore>`. Observers call
//! `subscribe()` to be woken on every session change and `notifications()`
//! for user-facing success/error messages.
//!
//! Public operations never return errors: they report a success flag and
//! publish a `Notification`. A 401 on any authenticated call tears the
//! session down before the operation returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::ClientError;
use crate::models::{ProfileUpdate, SignInRequest, SignUpRequest, UserProfile};
use crate::token_store::TokenStore;

pub mod notification;
pub mod validation;

pub use notification::{Notification, NotificationLevel};

const NOTIFICATION_CAPACITY: usize = 64;

/// Snapshot of the client-side session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub has_token: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            has_token: false,
        }
    }
}

/// What `refresh_profile` does when the profile cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileFailurePolicy {
    /// Any failure signs the user out.
    #[default]
    SignOut,
    /// Transport failures keep the session; 401 and server rejections still sign out.
    KeepOnTransportError,
}

pub struct SessionStore {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
    notifications: broadcast::Sender<Notification>,
    initialized: AtomicBool,
    policy: ProfileFailurePolicy,
}

impl SessionStore {
    pub fn new(api: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            api,
            tokens,
            state,
            notifications,
            initialized: AtomicBool::new(false),
            policy: ProfileFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ProfileFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Restores a persisted session. Runs at most once; later calls return immediately.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read persisted token: {e}");
                None
            }
        };

        let Some(token) = token else {
            self.state.send_modify(|s| s.is_loading = false);
            return;
        };

        match self.api.me(&token).await {
            Ok(profile) => {
                info!("Restored session for {}", profile.email);
                self.state.send_modify(|s| {
                    s.has_token = true;
                    set_user(s, Some(profile));
                    s.is_loading = false;
                });
            }
            Err(e) => {
                warn!("Discarding persisted token: {e}");
                self.discard_token();
                self.state.send_modify(|s| {
                    s.has_token = false;
                    set_user(s, None);
                    s.is_loading = false;
                });
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> bool {
        let request = SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        if let Err(e) = validation::sign_in(&request) {
            self.report(&e);
            return false;
        }

        let response = match self.api.sign_in(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.report(&e);
                return false;
            }
        };

        if !self.accept_token(&response.access_token).await {
            return false;
        }
        info!("Signed in as {}", request.email);
        self.notify(NotificationLevel::Success, "Welcome back!");
        true
    }

    pub async fn sign_up(&self, mut request: SignUpRequest) -> bool {
        request.email = request.email.trim().to_string();
        if let Err(e) = validation::sign_up(&request) {
            self.report(&e);
            return false;
        }

        let response = match self.api.sign_up(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.report(&e);
                return false;
            }
        };

        if !self.accept_token(&response.access_token).await {
            return false;
        }
        info!("Account created for {}", request.email);
        self.notify(NotificationLevel::Success, "Account created successfully!");
        true
    }

    /// Clears the persisted token and the in-memory user. Never fails.
    pub fn sign_out(&self) {
        self.discard_token();
        self.state.send_modify(|s| {
            s.has_token = false;
            set_user(s, None);
            s.is_loading = false;
        });
        info!("Signed out");
    }

    /// Sends a partial update, then reloads the full profile from the backend.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> bool {
        if update.is_empty() {
            self.report(&ClientError::Validation("Nothing to update".into()));
            return false;
        }

        let token = match self.require_token() {
            Ok(token) => token,
            Err(e) => {
                self.report(&e);
                return false;
            }
        };

        if let Err(e) = self.guard(self.api.update_profile(&token, update).await) {
            self.report(&e);
            return false;
        }

        if !self.refresh_profile().await {
            return false;
        }
        self.notify(NotificationLevel::Success, "Profile updated");
        true
    }

    /// Reloads the profile with the stored token. Failure tears the session
    /// down unless the policy keeps it through transport errors.
    pub async fn refresh_profile(&self) -> bool {
        let token = match self.require_token() {
            Ok(token) => token,
            Err(_) => {
                self.sign_out();
                return false;
            }
        };

        match self.api.me(&token).await {
            Ok(profile) => {
                self.state.send_modify(|s| {
                    s.has_token = true;
                    set_user(s, Some(profile));
                    s.is_loading = false;
                });
                true
            }
            Err(e) if e.is_transport() && self.policy == ProfileFailurePolicy::KeepOnTransportError => {
                warn!("Profile refresh failed, keeping session: {e}");
                self.report(&e);
                false
            }
            Err(e) => {
                warn!("Profile refresh failed, signing out: {e}");
                self.sign_out();
                self.report(&e);
                false
            }
        }
    }

    /// Token for an authenticated call, or a validation error when signed out.
    pub(crate) fn require_token(&self) -> Result<String, ClientError> {
        match self.tokens.load() {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(ClientError::Validation("You need to sign in first".into())),
            Err(e) => Err(e),
        }
    }

    /// Passes a call result through, signing out first when it was rejected with 401.
    pub(crate) fn guard<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::Unauthorized) = &result {
            self.sign_out();
        }
        result
    }

    /// Publishes a failure as an error notification.
    pub fn report(&self, error: &ClientError) {
        self.notify(NotificationLevel::Error, error.user_message());
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification::new(level, message);
        match level {
            NotificationLevel::Error => warn!("{}", notification.message),
            _ => info!("{}", notification.message),
        }
        // no subscribers is fine
        let _ = self.notifications.send(notification);
    }

    /// Commits a freshly issued token only once its profile loads. On any
    /// failure the persisted token and the current session stay as they were.
    async fn accept_token(&self, token: &str) -> bool {
        let profile = match self.api.me(token).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Could not load profile for new token: {e}");
                self.report(&e);
                return false;
            }
        };
        if let Err(e) = self.tokens.save(token) {
            self.report(&e);
            return false;
        }
        self.state.send_modify(|s| {
            s.has_token = true;
            set_user(s, Some(profile));
            s.is_loading = false;
        });
        true
    }

    fn discard_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!("Could not clear persisted token: {e}");
        }
    }
}

fn set_user(session: &mut Session, user: Option<UserProfile>) {
    session.is_authenticated = user.is_some();
    session.user = user;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::DEFAULT_TIMEOUT;
    use crate::token_store::MemoryTokenStore;

    // Nothing listens here; every test below must finish without a request.
    fn offline_store(tokens: Arc<MemoryTokenStore>) -> SessionStore {
        let api = ApiClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        SessionStore::new(api, tokens)
    }

    #[tokio::test]
    async fn test_initialize_without_token_clears_loading() {
        let store = offline_store(Arc::new(MemoryTokenStore::new()));
        assert!(store.snapshot().is_loading);

        store.initialize().await;
        let session = store.snapshot();
        assert!(!session.is_loading);
        assert!(!session.is_authenticated);
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_token_and_never_fails() {
        let tokens = Arc::new(MemoryTokenStore::with_token("t1"));
        let store = offline_store(tokens.clone());

        store.sign_out();
        store.sign_out();
        assert_eq!(tokens.load().unwrap(), None);
        assert!(!store.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn test_refresh_after_sign_out_fails() {
        let tokens = Arc::new(MemoryTokenStore::with_token("t1"));
        let store = offline_store(tokens);

        store.sign_out();
        assert!(!store.refresh_profile().await);
        assert!(store.snapshot().user.is_none());
    }

    #[tokio::test]
    async fn test_invalid_sign_in_is_rejected_locally() {
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = offline_store(tokens.clone());
        let mut notes = store.notifications();

        assert!(!store.sign_in("not-an-email", "pw").await);
        assert_eq!(tokens.load().unwrap(), None);

        let note = notes.recv().await.unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Please enter a valid email address");
    }

    #[tokio::test]
    async fn test_update_profile_requires_token() {
        let store = offline_store(Arc::new(MemoryTokenStore::new()));
        let mut notes = store.notifications();
        let update = ProfileUpdate {
            location: Some("Berlin".into()),
            ..Default::default()
        };

        assert!(!store.update_profile(&update).await);
        assert_eq!(notes.recv().await.unwrap().message, "You need to sign in first");
    }

    #[tokio::test]
    async fn test_guard_signs_out_on_unauthorized() {
        let tokens = Arc::new(MemoryTokenStore::with_token("t1"));
        let store = offline_store(tokens.clone());

        let result: Result<(), ClientError> = store.guard(Err(ClientError::Unauthorized));
        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert_eq!(tokens.load().unwrap(), None);

        // other failures leave the token alone
        tokens.save("t2").unwrap();
        let _ = store.guard::<()>(Err(ClientError::Validation("x".into())));
        assert_eq!(tokens.load().unwrap().as_deref(), Some("t2"));
    }
}
