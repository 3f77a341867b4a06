use std::sync::Arc;

use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::auth::claims::ensure_fresh;
use crate::auth::provider::{AuthState, IdentityProvider};
use crate::auth::services::verify_token;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub uid: String,
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// True until the provider reports its first definite state.
    pub initializing: bool,
    pub user: Option<CurrentUser>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            initializing: true,
            user: None,
        }
    }
}

impl SessionState {
    pub fn uid(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }
}

/// Session context handed to whoever needs the current user. Owns the
/// provider subscription; dropping the session stops listening.
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionState>>,
    listener: JoinHandle<()>,
}

impl Session {
    /// Must be called inside a tokio runtime.
    pub fn attach(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _) = watch::channel(SessionState::default());
        let state = Arc::new(tx);

        let mut rx = provider.subscribe();
        let initial = rx.borrow_and_update().clone();
        apply_auth_state(&state, initial);

        let listener = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let next = rx.borrow_and_update().clone();
                    apply_auth_state(&state, next);
                }
                debug!("identity provider closed its stream");
            })
        };

        Self {
            provider,
            state,
            listener,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().user.clone()
    }

    /// Checks the token locally, has the backend verify it, and adopts the
    /// uid the backend vouches for.
    #[instrument(skip_all)]
    pub async fn login(&self, api: &ApiClient, id_token: &str) -> Result<CurrentUser> {
        let id_token = id_token.trim();
        ensure_fresh(id_token, OffsetDateTime::now_utc())?;
        let uid = verify_token(api, id_token).await.map_err(|e| {
            warn!(error = %e, "token verification failed");
            e
        })?;

        let user = CurrentUser {
            uid,
            id_token: Some(id_token.to_string()),
        };
        self.state.send_modify(|s| {
            s.initializing = false;
            s.user = Some(user.clone());
        });
        info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    /// Signs out at the provider; local state follows through the
    /// subscription.
    pub async fn logout(&self) -> Result<()> {
        self.provider.sign_out().await.map_err(|e| match e {
            ClientError::Identity(_) => e,
            other => ClientError::Identity(other.to_string()),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn apply_auth_state(state: &watch::Sender<SessionState>, auth: AuthState) {
    state.send_if_modified(|s| {
        let before = s.clone();
        match auth {
            AuthState::Unknown => {}
            AuthState::SignedOut => {
                s.initializing = false;
                s.user = None;
            }
            AuthState::SignedIn(u) => {
                s.initializing = false;
                // keep a backend-verified session for the same uid as is
                if s.uid() != Some(u.uid.as_str()) {
                    s.user = Some(CurrentUser {
                        uid: u.uid,
                        id_token: Some(u.id_token),
                    });
                }
            }
        }
        *s != before
    });
}
