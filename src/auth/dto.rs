use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::users::{ProfileForm, UserProfile};

/// Body of `GET /auth/verify`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub uid: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /auth/signup`: credentials plus the initial profile.
#[derive(Clone, PartialEq, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Text fields of the sign-up screen.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub profile: ProfileForm,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

impl SignupForm {
    /// Email and password must be present; the profile fields are checked
    /// the same way the profile screen checks them.
    pub fn to_request(&self) -> Result<SignupRequest, ClientError> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(ClientError::InvalidSignup(
                "email and password are required".into(),
            ));
        }
        Ok(SignupRequest {
            email: email.to_string(),
            password: self.password.clone(),
            profile: self.profile.to_profile()?,
        })
    }
}
