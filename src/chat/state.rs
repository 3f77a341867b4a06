//! Conversational meal logging as an explicit state machine.
//!
//! ```text
//! Idle ──submit──▶ AwaitingResponse ──message──▶ Idle
//!   ▲                 │   ▲
//!   │              meals  └──submit (feedback)──┐
//!   │                 ▼                         │
//!   └──confirm/cancel── AwaitingConfirmation ───┘
//! ```
//!
//! Every request leaves the conversation as a ticket stamped with the
//! generation it was issued under. Cancel, confirm and reset advance the
//! generation so late answers are recognised and dropped.

use tracing::{debug, info, warn};

use crate::chat::dto::{ChatReply, ChatReplyKind};
use crate::error::ClientError;
use crate::meals::dto::{MealCandidate, MealEntry};

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    /// `resume` holds the batch that was awaiting confirmation when the
    /// message was sent, restored if the request fails.
    AwaitingResponse { resume: Option<Vec<MealCandidate>> },
    AwaitingConfirmation {
        candidates: Vec<MealCandidate>,
        saving: bool,
    },
}

/// A chat turn ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTicket {
    pub generation: u64,
    pub description: String,
    pub conversation_id: Option<String>,
    pub user_feedback: Option<String>,
}

/// Candidates the user chose to log, with their positions in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub generation: u64,
    pub indices: Vec<usize>,
    pub candidates: Vec<MealCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Indices(Vec<usize>),
}

#[derive(Debug)]
pub enum ConversationEvent {
    Submit(String),
    Reply {
        generation: u64,
        result: Result<ChatReply, ClientError>,
    },
    Confirm(Selection),
    Saved {
        ticket: SaveTicket,
        saved: Vec<MealEntry>,
        error: Option<ClientError>,
    },
    Cancel {
        keep_history: bool,
    },
    Reset,
}

#[derive(Debug)]
pub enum Effect {
    None,
    SendChat(ChatTicket),
    SaveMeals(SaveTicket),
    Logged(Vec<MealEntry>),
    Rejected(ClientError),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    phase: Phase,
    conversation_id: Option<String>,
    history: Vec<String>,
    feedback: Option<String>,
    generation: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            conversation_id: None,
            history: Vec::new(),
            feedback: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::AwaitingResponse { .. })
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self.phase, Phase::AwaitingConfirmation { .. })
    }

    pub fn candidates(&self) -> &[MealCandidate] {
        match &self.phase {
            Phase::AwaitingConfirmation { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// The single transition function.
    pub fn reduce(&mut self, event: ConversationEvent) -> Effect {
        match event {
            ConversationEvent::Submit(text) => self.submit(text),
            ConversationEvent::Reply { generation, result } => self.reply(generation, result),
            ConversationEvent::Confirm(selection) => self.confirm(selection),
            ConversationEvent::Saved {
                ticket,
                saved,
                error,
            } => self.saved(ticket, saved, error),
            ConversationEvent::Cancel { keep_history } => {
                self.clear(keep_history);
                Effect::None
            }
            ConversationEvent::Reset => {
                self.clear(false);
                Effect::None
            }
        }
    }

    fn submit(&mut self, text: String) -> Effect {
        let text = text.trim();
        if text.is_empty() {
            return Effect::None;
        }
        let resume = match &self.phase {
            Phase::AwaitingResponse { .. } => return Effect::Rejected(ClientError::Busy),
            Phase::AwaitingConfirmation { saving: true, .. } => {
                return Effect::Rejected(ClientError::Busy)
            }
            Phase::AwaitingConfirmation { candidates, .. } => Some(candidates.clone()),
            Phase::Idle => None,
        };

        self.history.push(format!("You: {}", text));
        self.feedback = resume.as_ref().map(|_| text.to_string());
        self.phase = Phase::AwaitingResponse { resume };

        Effect::SendChat(ChatTicket {
            generation: self.generation,
            description: text.to_string(),
            conversation_id: self.conversation_id.clone(),
            user_feedback: self.feedback.clone(),
        })
    }

    fn reply(&mut self, generation: u64, result: Result<ChatReply, ClientError>) -> Effect {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale chat reply");
            return Effect::None;
        }
        let resume = match &mut self.phase {
            Phase::AwaitingResponse { resume } => resume.take(),
            _ => {
                debug!("chat reply arrived outside of a request; ignoring");
                return Effect::None;
            }
        };

        match result {
            Ok(reply) => {
                self.conversation_id = Some(reply.conversation_id);
                match reply.kind {
                    ChatReplyKind::Message(message) => {
                        self.history.push(format!("App: {}", message));
                        self.phase = Phase::Idle;
                    }
                    ChatReplyKind::Meals(candidates) => {
                        self.history.push(summarize(&candidates));
                        self.phase = Phase::AwaitingConfirmation {
                            candidates,
                            saving: false,
                        };
                    }
                }
                Effect::None
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.phase = match resume {
                    Some(candidates) => Phase::AwaitingConfirmation {
                        candidates,
                        saving: false,
                    },
                    None => Phase::Idle,
                };
                Effect::None
            }
        }
    }

    fn confirm(&mut self, selection: Selection) -> Effect {
        let available = match &self.phase {
            Phase::AwaitingConfirmation { saving: true, .. } => {
                return Effect::Rejected(ClientError::Busy)
            }
            Phase::AwaitingConfirmation { candidates, .. } => candidates.len(),
            _ => return Effect::Rejected(ClientError::NothingToConfirm),
        };

        let mut indices = match selection {
            Selection::All => (0..available).collect::<Vec<_>>(),
            Selection::Indices(idx) => idx,
        };
        indices.sort_unstable();
        indices.dedup();
        indices.retain(|&i| i < available);
        if indices.is_empty() {
            return Effect::Rejected(ClientError::NothingToConfirm);
        }

        let Phase::AwaitingConfirmation { candidates, saving } = &mut self.phase else {
            return Effect::Rejected(ClientError::NothingToConfirm);
        };
        *saving = true;
        let chosen = indices.iter().map(|&i| candidates[i].clone()).collect();
        Effect::SaveMeals(SaveTicket {
            generation: self.generation,
            indices,
            candidates: chosen,
        })
    }

    fn saved(
        &mut self,
        ticket: SaveTicket,
        saved: Vec<MealEntry>,
        error: Option<ClientError>,
    ) -> Effect {
        if ticket.generation != self.generation {
            debug!(generation = ticket.generation, "save finished after the conversation moved on");
            return match error {
                Some(e) => Effect::Rejected(e),
                None => Effect::Logged(saved),
            };
        }

        match error {
            None => {
                info!(count = saved.len(), "meals confirmed");
                self.clear(false);
                Effect::Logged(saved)
            }
            Some(e) => {
                warn!(error = %e, saved = saved.len(), "saving confirmed meals failed");
                let mut exhausted = false;
                if let Phase::AwaitingConfirmation { candidates, saving } = &mut self.phase {
                    *saving = false;
                    // drop what already made it so a retry can't duplicate it
                    let mut done: Vec<usize> = ticket.indices.into_iter().take(saved.len()).collect();
                    done.sort_unstable_by(|a, b| b.cmp(a));
                    for i in done {
                        if i < candidates.len() {
                            candidates.remove(i);
                        }
                    }
                    exhausted = candidates.is_empty();
                }
                if exhausted {
                    self.clear(false);
                }
                Effect::Rejected(e)
            }
        }
    }

    /// Drops the pending batch, conversation id and feedback. History goes
    /// too unless `keep_history` is set.
    fn clear(&mut self, keep_history: bool) {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.conversation_id = None;
        self.feedback = None;
        if !keep_history {
            self.history.clear();
        }
    }
}

fn summarize(candidates: &[MealCandidate]) -> String {
    match candidates {
        [one] => format!(
            "App: Found \"{}\" ({} cal)",
            one.description, one.nutrients.calories
        ),
        many => {
            let items: Vec<String> = many
                .iter()
                .map(|c| format!("\"{}\" ({} cal)", c.description, c.nutrients.calories))
                .collect();
            format!("App: Found {} meals: {}", many.len(), items.join(", "))
        }
    }
}
