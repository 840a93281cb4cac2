//! System prompt table.
//!
//! A pure mapping from conversation kind to a fixed instruction text,
//! read-only after initialization. The mapping is the extension point if
//! more modes are added later.

use super::types::ConversationKind;

/// Prompt steering the daily check-in conversation.
const DAILY_PROMPT: &str = "You are a mindful wellness assistant. Help users \
with their daily check-ins, reflections, and personal growth. Be \
encouraging, insightful, and supportive.";

/// Prompt steering the thought-reframing conversation.
const REWIRE_PROMPT: &str = "You are a supportive AI coach helping users \
rewire negative thought patterns. Focus on cognitive reframing, positive \
psychology, and actionable insights. Keep responses warm, empathetic, and \
constructive.";

/// Select the fixed system prompt for a conversation kind.
#[must_use]
pub const fn system_prompt(kind: ConversationKind) -> &'static str {
    match kind {
        ConversationKind::Daily => DAILY_PROMPT,
        ConversationKind::Rewire => REWIRE_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_distinct() {
        assert_ne!(
            system_prompt(ConversationKind::Daily),
            system_prompt(ConversationKind::Rewire)
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!system_prompt(ConversationKind::Daily).is_empty());
        assert!(!system_prompt(ConversationKind::Rewire).is_empty());
    }
}
