//! Owned conversation state with explicit turn mutation operations.
//!
//! Message arrays are not mutated ad hoc: every change goes through
//! `append_user`, `append_assistant_delta`, `finalize_assistant`, or
//! `discard_assistant`, so the discard-on-failure rule is a single code
//! path and the one-turn-at-a-time invariant is enforced here instead of
//! trusted to the caller.

use super::error::{ChatError, ChatResult};
use super::ids::{ConversationId, MessageId, UserId};
use super::types::{ConversationKind, Message, Role, now_ms};

/// Maximum length of a title derived from the first user message.
const MAX_DERIVED_TITLE_CHARS: usize = 60;

/// Fixed title for daily check-in conversations.
const DAILY_TITLE: &str = "Daily check-in";

/// In-memory state of the active conversation.
///
/// While an assistant turn is outstanding, the last message is an assistant
/// placeholder growing by append-only concatenation; it is either finalized
/// (and then persisted by the caller) or discarded, never left half-done.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Owning user.
    pub user_id: UserId,
    /// Daily or rewire.
    pub kind: ConversationKind,
    /// Display title.
    pub title: String,
    /// Messages in creation order.
    messages: Vec<Message>,
    /// Set between `append_user` and `finalize_assistant`/`discard_assistant`.
    turn_active: bool,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: ConversationId, user_id: UserId, kind: ConversationKind) -> Self {
        let title = match kind {
            ConversationKind::Daily => DAILY_TITLE.to_string(),
            ConversationKind::Rewire => String::new(),
        };
        Self {
            id,
            user_id,
            kind,
            title,
            messages: Vec::new(),
            turn_active: false,
        }
    }

    /// Create a conversation from messages loaded out of the store.
    #[must_use]
    pub fn with_messages(
        id: ConversationId,
        user_id: UserId,
        kind: ConversationKind,
        title: String,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            title,
            messages,
            turn_active: false,
        }
    }

    /// Messages in creation order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether an assistant turn is outstanding.
    #[must_use]
    pub const fn turn_active(&self) -> bool {
        self.turn_active
    }

    /// Append an opening assistant message (used when a conversation is
    /// created with its fixed greeting). Not part of a turn.
    pub fn push_opening(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Begin a turn: append the user's message and an empty assistant
    /// placeholder.
    ///
    /// Returns a clone of the user message so the caller can persist it
    /// immediately.
    ///
    /// # Errors
    /// `ChatError::TurnInProgress` if an assistant turn is already
    /// outstanding; overlapping sends against the same conversation would
    /// interleave deltas unpredictably, so the second send is rejected.
    pub fn append_user(&mut self, content: impl Into<String>) -> ChatResult<Message> {
        if self.turn_active {
            return Err(ChatError::TurnInProgress);
        }

        let now = now_ms();
        let user_message = Message::user(content, now);

        if self.kind == ConversationKind::Rewire && self.title.is_empty() {
            self.title = derive_title(&user_message.content);
        }

        self.messages.push(user_message.clone());
        self.messages.push(Message::assistant("", now));
        self.turn_active = true;

        Ok(user_message)
    }

    /// Append one streamed fragment to the assistant placeholder.
    ///
    /// # Errors
    /// `ChatError::NoTurnInProgress` if there is no outstanding turn.
    pub fn append_assistant_delta(&mut self, fragment: &str) -> ChatResult<()> {
        let placeholder = self.active_placeholder_mut()?;
        placeholder.content.push_str(fragment);
        Ok(())
    }

    /// Finalize the assistant turn, returning the finished message for
    /// persistence.
    ///
    /// # Errors
    /// `ChatError::NoTurnInProgress` if there is no outstanding turn.
    pub fn finalize_assistant(&mut self) -> ChatResult<Message> {
        let finished = self.active_placeholder_mut()?.clone();
        self.turn_active = false;
        Ok(finished)
    }

    /// Discard the assistant placeholder after a failed stream.
    ///
    /// The user's own message stays so they can resend without retyping.
    ///
    /// # Errors
    /// `ChatError::NoTurnInProgress` if there is no outstanding turn.
    pub fn discard_assistant(&mut self) -> ChatResult<MessageId> {
        let id = self.active_placeholder_mut()?.id;
        self.messages.pop();
        self.turn_active = false;
        Ok(id)
    }

    fn active_placeholder_mut(&mut self) -> ChatResult<&mut Message> {
        if !self.turn_active {
            return Err(ChatError::NoTurnInProgress);
        }
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => Ok(last),
            _ => Err(ChatError::NoTurnInProgress),
        }
    }
}

/// Derive a rewire conversation title from the first user message.
#[must_use]
pub fn derive_title(first_user_message: &str) -> String {
    let trimmed = first_user_message.trim();
    if trimmed.chars().count() <= MAX_DERIVED_TITLE_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_DERIVED_TITLE_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewire() -> Conversation {
        Conversation::new(ConversationId::new(), UserId::new(), ConversationKind::Rewire)
    }

    #[test]
    fn test_append_user_creates_placeholder() {
        let mut convo = rewire();
        convo.append_user("I keep doubting myself").unwrap();

        assert_eq!(convo.messages().len(), 2);
        assert_eq!(convo.messages()[0].role, Role::User);
        assert_eq!(convo.messages()[1].role, Role::Assistant);
        assert!(convo.messages()[1].content.is_empty());
        assert!(convo.turn_active());
    }

    #[test]
    fn test_second_send_rejected_while_turn_active() {
        let mut convo = rewire();
        convo.append_user("first").unwrap();

        let err = convo.append_user("second").unwrap_err();
        assert!(matches!(err, ChatError::TurnInProgress));
        assert_eq!(convo.messages().len(), 2);
    }

    #[test]
    fn test_deltas_accumulate_in_order() {
        let mut convo = rewire();
        convo.append_user("hello").unwrap();
        convo.append_assistant_delta("You ").unwrap();
        convo.append_assistant_delta("are ").unwrap();
        convo.append_assistant_delta("enough.").unwrap();

        let finished = convo.finalize_assistant().unwrap();
        assert_eq!(finished.content, "You are enough.");
        assert!(!convo.turn_active());
    }

    #[test]
    fn test_discard_removes_placeholder_keeps_user_message() {
        let mut convo = rewire();
        convo.append_user("hello").unwrap();
        convo.append_assistant_delta("partial").unwrap();
        convo.discard_assistant().unwrap();

        assert_eq!(convo.messages().len(), 1);
        assert_eq!(convo.messages()[0].role, Role::User);
        assert!(!convo.turn_active());

        // The conversation is usable again.
        convo.append_user("hello again").unwrap();
    }

    #[test]
    fn test_delta_without_turn_rejected() {
        let mut convo = rewire();
        assert!(matches!(
            convo.append_assistant_delta("x").unwrap_err(),
            ChatError::NoTurnInProgress
        ));
    }

    #[test]
    fn test_rewire_title_derived_from_first_message() {
        let mut convo = rewire();
        convo.append_user("Rethinking my relationship to money").unwrap();
        assert_eq!(convo.title, "Rethinking my relationship to money");
    }

    #[test]
    fn test_long_title_truncated() {
        let long = "a".repeat(200);
        let title = derive_title(&long);
        assert!(title.chars().count() <= MAX_DERIVED_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_daily_title_fixed() {
        let convo = Conversation::new(ConversationId::new(), UserId::new(), ConversationKind::Daily);
        assert_eq!(convo.title, "Daily check-in");
    }
}
