pub mod claims;
mod dto;
pub mod provider;
pub mod services;
pub mod session;

pub use claims::{ensure_fresh, peek_claims, IdTokenClaims};
pub use dto::{SignupForm, SignupRequest};
pub use provider::{AuthState, IdentityProvider, IdentityUser, TokenIdentityProvider};
pub use session::{CurrentUser, Session, SessionState};
