pub mod dto;
pub mod services;
pub mod state;

pub use dto::{ChatReply, ChatReplyKind, ChatRequest};
pub use state::{ChatTicket, Conversation, ConversationEvent, Effect, Phase, SaveTicket, Selection};
