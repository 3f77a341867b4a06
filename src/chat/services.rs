use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::chat::dto::{ChatReply, ChatRequest, ChatResponse};
use crate::chat::state::ChatTicket;
use crate::config::ChatConfig;
use crate::error::Result;

pub fn build_request(user_id: &str, config: &ChatConfig, ticket: &ChatTicket) -> ChatRequest {
    ChatRequest {
        user_id: user_id.to_string(),
        description: ticket.description.clone(),
        conversation_id: ticket.conversation_id.clone(),
        user_feedback: ticket.user_feedback.clone(),
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

#[instrument(skip_all, fields(generation = ticket.generation, conversation_id = ?ticket.conversation_id))]
pub async fn send_chat(
    api: &ApiClient,
    user_id: &str,
    config: &ChatConfig,
    ticket: &ChatTicket,
) -> Result<ChatReply> {
    let request = build_request(user_id, config, ticket);
    let response: ChatResponse = api.post("/openai/chat", &request).await?;
    debug!(
        conversation_id = %response.conversation_id,
        complete = ?response.conversation_complete,
        "chat reply received"
    );
    response.try_into()
}
