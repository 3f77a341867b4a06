use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::meals::dto::MealCandidate;

/// Body of `POST /openai/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub description: String,
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Raw `/openai/chat` answer. Older backends send a single `meal`, newer
/// ones a `meals` batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub meal: Option<MealCandidate>,
    #[serde(default)]
    pub meals: Option<Vec<MealCandidate>>,
    #[serde(default)]
    pub conversation_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatReplyKind {
    Message(String),
    Meals(Vec<MealCandidate>),
}

/// A chat answer reduced to one of the two shapes the conversation cares
/// about. Structured meals win over a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub conversation_id: String,
    pub kind: ChatReplyKind,
}

impl TryFrom<ChatResponse> for ChatReply {
    type Error = ClientError;

    fn try_from(res: ChatResponse) -> Result<Self, Self::Error> {
        let mut candidates = res.meals.unwrap_or_default();
        if let Some(meal) = res.meal {
            candidates.insert(0, meal);
        }
        let kind = if !candidates.is_empty() {
            ChatReplyKind::Meals(candidates)
        } else if let Some(message) = res.message.filter(|m| !m.trim().is_empty()) {
            ChatReplyKind::Message(message)
        } else {
            return Err(ClientError::Malformed("chat reply has neither a message nor a meal"));
        };
        Ok(Self {
            conversation_id: res.conversation_id,
            kind,
        })
    }
}
