//! Turn runner: drives one conversation turn from send to persistence.
//!
//! Ordering guarantees enforced here:
//! - the user message is persisted before the event stream is consumed;
//! - deltas are applied to the placeholder in arrival order;
//! - the assistant message is persisted at most once, only after `Done`;
//! - on `Failed`, the placeholder is discarded and nothing is persisted for
//!   the assistant turn, leaving the user's message intact.

use tokio::sync::mpsc::UnboundedReceiver;

use super::conversation::Conversation;
use super::error::{ChatError, ChatResult};
use super::session::ChatSession;
use super::store::ConversationStore;
use super::types::{ConversationKind, StreamEvent};

/// Run one turn: append the user's message, stream the assistant reply, and
/// persist the finished exchange.
///
/// Persistence failures after the user write are logged rather than
/// surfaced; the conversation keeps working in memory, favoring
/// availability of the chat over strict durability.
///
/// # Errors
/// - `ChatError::TurnInProgress` if a turn is already outstanding;
/// - `ChatError::Validation` with the failure reason if the stream fails
///   before natural termination (the placeholder is discarded first).
pub async fn run_turn<S: ConversationStore + ?Sized>(
    conversation: &mut Conversation,
    store: &S,
    session: &ChatSession,
    bearer: &str,
    user_text: &str,
) -> ChatResult<()> {
    let user_message = conversation.append_user(user_text)?;

    // The user's message is durable before the assistant stream begins and
    // is never rolled back.
    store.append_message(conversation.id, &user_message).await?;

    if conversation.kind == ConversationKind::Rewire {
        // First user message names the thread.
        if let Err(e) = store.update_title(conversation.id, &conversation.title).await {
            tracing::error!("failed to persist conversation title: {e}");
        }
    }

    // Exclude the empty placeholder from the outbound history.
    let history: Vec<_> = conversation
        .messages()
        .iter()
        .filter(|m| !m.content.is_empty())
        .cloned()
        .collect();

    let events = session.send(bearer, conversation.kind, &history);
    drive_turn(conversation, store, events).await
}

/// Consume a session event stream and apply it to the conversation.
///
/// Split out from [`run_turn`] so the event-handling path can be exercised
/// without a live relay.
///
/// # Errors
/// Returns `ChatError::Validation` with the stream's failure reason if the
/// terminal event is `Failed`.
pub async fn drive_turn<S: ConversationStore + ?Sized>(
    conversation: &mut Conversation,
    store: &S,
    mut events: UnboundedReceiver<StreamEvent>,
) -> ChatResult<()> {
    while let Some(event) = events.recv().await {
        match event {
            StreamEvent::Delta(fragment) => {
                conversation.append_assistant_delta(&fragment)?;
            }
            StreamEvent::Done => {
                let finished = conversation.finalize_assistant()?;
                if let Err(e) = store.append_message(conversation.id, &finished).await {
                    tracing::error!("failed to persist assistant message: {e}");
                }
                return Ok(());
            }
            StreamEvent::Failed(reason) => {
                conversation.discard_assistant()?;
                return Err(ChatError::Validation(reason));
            }
        }
    }

    // Channel closed without a terminal event; treat as transport failure.
    conversation.discard_assistant()?;
    Err(ChatError::MissingBody)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ids::{ConversationId, UserId};
    use crate::chat::store::SqliteConversationStore;
    use crate::chat::types::{Message, Role};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio_rusqlite::Connection;

    async fn store() -> SqliteConversationStore {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        SqliteConversationStore::new(conn).await.unwrap()
    }

    async fn conversation_with_user_message(
        store: &SqliteConversationStore,
    ) -> (Conversation, Message) {
        let meta = store.create_rewire(UserId::new()).await.unwrap();
        let mut convo = Conversation::with_messages(
            meta.id,
            meta.user_id,
            meta.kind,
            meta.title.clone(),
            store.messages(meta.id).await.unwrap(),
        );
        let user_message = convo.append_user("I want to reframe this").unwrap();
        store.append_message(convo.id, &user_message).await.unwrap();
        (convo, user_message)
    }

    #[tokio::test]
    async fn test_completed_stream_persists_assistant_once() {
        let store = store().await;
        let (mut convo, _) = conversation_with_user_message(&store).await;

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Delta("You are ".to_string())).unwrap();
        tx.send(StreamEvent::Delta("doing fine.".to_string())).unwrap();
        tx.send(StreamEvent::Done).unwrap();
        drop(tx);

        drive_turn(&mut convo, &store, rx).await.unwrap();

        let persisted = store.messages(convo.id).await.unwrap();
        let assistant: Vec<_> = persisted
            .iter()
            .filter(|m| m.role == Role::Assistant && !m.content.is_empty())
            .collect();
        // Opening message plus the streamed reply.
        assert_eq!(assistant.len(), 2);
        assert_eq!(assistant[1].content, "You are doing fine.");
        assert!(!convo.turn_active());
    }

    #[tokio::test]
    async fn test_failed_stream_persists_no_assistant_turn() {
        let store = store().await;
        let (mut convo, user_message) = conversation_with_user_message(&store).await;
        let before = store.messages(convo.id).await.unwrap().len();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Delta("partial ".to_string())).unwrap();
        tx.send(StreamEvent::Failed("upstream 529".to_string())).unwrap();
        drop(tx);

        let err = drive_turn(&mut convo, &store, rx).await.unwrap_err();
        assert!(err.to_string().contains("529"));

        // The failed turn leaves no persisted trace; the user message stays.
        let persisted = store.messages(convo.id).await.unwrap();
        assert_eq!(persisted.len(), before);
        assert!(persisted.iter().any(|m| m.id == user_message.id));
        assert!(!convo.turn_active());
    }

    #[tokio::test]
    async fn test_closed_channel_without_terminal_discards_placeholder() {
        let store = store().await;
        let (mut convo, _) = conversation_with_user_message(&store).await;

        let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();
        drop(tx);

        assert!(drive_turn(&mut convo, &store, rx).await.is_err());
        assert!(!convo.turn_active());
        assert_eq!(convo.messages().last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_deltas_applied_in_order() {
        let store = store().await;
        let (mut convo, _) = conversation_with_user_message(&store).await;

        let (tx, rx) = mpsc::unbounded_channel();
        for part in ["a", "b", "c", "d"] {
            tx.send(StreamEvent::Delta(part.to_string())).unwrap();
        }
        tx.send(StreamEvent::Done).unwrap();
        drop(tx);

        drive_turn(&mut convo, &store, rx).await.unwrap();
        assert_eq!(convo.messages().last().unwrap().content, "abcd");
    }

    #[tokio::test]
    async fn test_run_turn_rejects_overlapping_send() {
        // Conversation with a turn already active: run_turn must fail before
        // touching the store or the network.
        let store = store().await;
        let mut convo =
            Conversation::new(ConversationId::new(), UserId::new(), ConversationKind::Rewire);
        convo.append_user("first").unwrap();

        let session = ChatSession::new(reqwest::Client::new(), "http://127.0.0.1:1/api/chat");
        let err = run_turn(&mut convo, &store, &session, "token", "second")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::TurnInProgress));
    }
}
