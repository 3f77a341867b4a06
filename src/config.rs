use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::ClientError;

pub const DEFAULT_LOCAL_URL: &str = "http://192.168.0.199:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTarget {
    Local,
    Deployed,
}

impl std::str::FromStr for ApiTarget {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "dev" => Ok(ApiTarget::Local),
            "deployed" | "prod" | "gateway" => Ok(ApiTarget::Deployed),
            other => Err(ClientError::InvalidConfig(format!(
                "unknown api target `{other}` (expected `local` or `deployed`)"
            ))),
        }
    }
}

/// Parameters forwarded verbatim to `/openai/chat`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            temperature: 0.0,
            max_tokens: 150,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub chat: ChatConfig,
    pub id_token: Option<String>,
}

impl AppConfig {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            request_timeout: Duration::from_secs(30),
            chat: ChatConfig::default(),
            id_token: None,
        }
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target = match lookup("MEALMIND_API_TARGET") {
            Some(v) => v.parse::<ApiTarget>()?,
            None => ApiTarget::Local,
        };

        let raw_url = match lookup("MEALMIND_API_URL") {
            Some(url) => url,
            None => match target {
                ApiTarget::Local => {
                    lookup("MEALMIND_LOCAL_URL").unwrap_or_else(|| DEFAULT_LOCAL_URL.into())
                }
                ApiTarget::Deployed => lookup("MEALMIND_GATEWAY_URL").ok_or_else(|| {
                    ClientError::InvalidConfig(
                        "MEALMIND_GATEWAY_URL must be set when MEALMIND_API_TARGET=deployed".into(),
                    )
                })?,
            },
        };
        let api_base_url = parse_base_url(&raw_url)?;

        let request_timeout = Duration::from_secs(
            lookup("MEALMIND_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let defaults = ChatConfig::default();
        let chat = ChatConfig {
            model: lookup("MEALMIND_CHAT_MODEL").unwrap_or(defaults.model),
            temperature: lookup("MEALMIND_CHAT_TEMPERATURE")
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: lookup("MEALMIND_CHAT_MAX_TOKENS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_tokens),
        };

        let id_token = lookup("MEALMIND_ID_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(Self {
            api_base_url,
            request_timeout,
            chat,
            id_token,
        })
    }
}

/// Stage gateways live under a path prefix (`/prod`), so the base must end
/// with a slash for `Url::join` to keep it.
fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized)
        .map_err(|e| ClientError::InvalidConfig(format!("bad base url `{raw}`: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidConfig(format!(
            "`{raw}` cannot be used as a base url"
        )));
    }
    Ok(url)
}
