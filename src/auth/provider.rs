use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::auth::claims::peek_claims;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub uid: String,
    pub id_token: String,
}

/// What the identity provider currently believes. `Unknown` until it has
/// restored (or failed to restore) a persisted sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    SignedOut,
    SignedIn(IdentityUser),
}

/// The external identity service (Firebase Authentication in production).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// A stream of authentication states; the current value is readable at once.
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    async fn sign_out(&self) -> Result<()>;
}

/// Provider backed by an identity token obtained out of band, e.g. pasted
/// into the terminal or read from `MEALMIND_ID_TOKEN`.
pub struct TokenIdentityProvider {
    state: watch::Sender<AuthState>,
}

impl TokenIdentityProvider {
    /// Starts `Unknown`; call [`Self::sign_in`] or [`Self::settle`] later.
    pub fn pending() -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self { state }
    }

    /// Starts signed in when the token decodes, signed out otherwise.
    pub fn from_token(token: Option<&str>) -> Self {
        let provider = Self::pending();
        match token {
            Some(t) => provider.sign_in(t),
            None => provider.settle(),
        }
        provider
    }

    pub fn sign_in(&self, token: &str) {
        match peek_claims(token) {
            Ok(claims) => {
                info!(uid = %claims.uid(), "identity provider signed in");
                self.state.send_replace(AuthState::SignedIn(IdentityUser {
                    uid: claims.uid().to_string(),
                    id_token: token.to_string(),
                }));
            }
            Err(e) => {
                warn!(error = %e, "identity token rejected");
                self.state.send_replace(AuthState::SignedOut);
            }
        }
    }

    /// Resolves an `Unknown` state to signed out.
    pub fn settle(&self) {
        self.state.send_if_modified(|s| {
            if *s == AuthState::Unknown {
                *s = AuthState::SignedOut;
                true
            } else {
                false
            }
        });
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.send_replace(AuthState::SignedOut);
        info!("identity provider signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::test_tokens::id_token;

    #[test]
    fn from_token_signs_in_with_token_uid() {
        let token = id_token("abc", 600);
        let p = TokenIdentityProvider::from_token(Some(&token));
        match &*p.subscribe().borrow() {
            AuthState::SignedIn(u) => assert_eq!(u.uid, "abc"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_or_bad_token_is_signed_out() {
        let p = TokenIdentityProvider::from_token(None);
        assert_eq!(*p.subscribe().borrow(), AuthState::SignedOut);
        let p = TokenIdentityProvider::from_token(Some("garbage"));
        assert_eq!(*p.subscribe().borrow(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn sign_out_publishes() {
        let p = TokenIdentityProvider::from_token(Some(&id_token("abc", 600)));
        let mut rx = p.subscribe();
        p.sign_out().await.expect("sign out");
        assert!(rx.has_changed().expect("open"));
        assert_eq!(*rx.borrow_and_update(), AuthState::SignedOut);
    }
}
