use crate::protocol::ClientEvent;
use crate::puzzle::PuzzleId;
use crate::session::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub puzzle_id: PuzzleId,
    pub author: Identity,
    pub text: String,
    /// Position in which the message reached this client.
    pub arrival: u64,
}

/// Append-only chat history for one puzzle, in arrival order.
#[derive(Debug, Clone)]
pub struct ChatLog {
    puzzle_id: PuzzleId,
    identity: Identity,
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new(puzzle_id: PuzzleId, identity: Identity) -> Self {
        Self {
            puzzle_id,
            identity,
            messages: Vec::new(),
        }
    }

    /// Turn the draft into an outbound message and clear it. Blank drafts
    /// produce nothing and are left untouched. The message only shows up in
    /// the log once the backend echoes it back.
    pub fn send(&self, draft: &mut String) -> Option<ClientEvent> {
        if draft.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(draft);
        Some(ClientEvent::Message {
            puzzle_id: self.puzzle_id,
            author: self.identity.clone(),
            text,
        })
    }

    pub fn receive(&mut self, author: Identity, text: String) -> &ChatMessage {
        let arrival = self.messages.len() as u64;
        self.messages.push(ChatMessage {
            puzzle_id: self.puzzle_id,
            author,
            text,
            arrival,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Whether the local player wrote this message.
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        message.author == self.identity
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
