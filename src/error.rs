use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("invalid sign-up: {0}")]
    InvalidSignup(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("identity token has expired")]
    ExpiredToken,

    #[error("invalid identity token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("a request is already in flight")]
    Busy,

    #[error("no meal is awaiting confirmation")]
    NothingToConfirm,

    #[error("identity provider error: {0}")]
    Identity(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
