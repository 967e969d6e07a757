use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use pactum_core::AssistTurn;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConversationKey {
    contract_id: Uuid,
    clause_id: Uuid,
    session_id: String,
}

struct Conversation {
    turns: Vec<AssistTurn>,
    touched_at: DateTime<Utc>,
}

// Q&A history per (contract, clause, caller session). Bounded: stale
// sessions expire after `ttl` and each conversation keeps at most
// `max_turns` turns.
pub struct ConversationStore {
    conversations: RwLock<HashMap<ConversationKey, Conversation>>,
    ttl: Duration,
    max_turns: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        ConversationStore::new(Duration::minutes(30), 32)
    }
}

impl ConversationStore {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        ConversationStore {
            conversations: RwLock::new(HashMap::new()),
            ttl,
            max_turns,
        }
    }

    fn key(contract_id: Uuid, clause_id: Uuid, session_id: &str) -> ConversationKey {
        ConversationKey {
            contract_id,
            clause_id,
            session_id: session_id.to_string(),
        }
    }

    pub async fn history(
        &self,
        contract_id: Uuid,
        clause_id: Uuid,
        session_id: &str,
    ) -> Vec<AssistTurn> {
        let now = Utc::now();
        let conversations = self.conversations.read().await;
        match conversations.get(&Self::key(contract_id, clause_id, session_id)) {
            Some(conversation) if now - conversation.touched_at < self.ttl => {
                conversation.turns.clone()
            }
            _ => Vec::new(),
        }
    }

    pub async fn record(
        &self,
        contract_id: Uuid,
        clause_id: Uuid,
        session_id: &str,
        question: &str,
        answer: &str,
    ) {
        let now = Utc::now();
        let ttl = self.ttl;
        let mut conversations = self.conversations.write().await;
        // Expired sessions are swept on every write.
        conversations.retain(|_, conversation| now - conversation.touched_at < ttl);

        let conversation = conversations
            .entry(Self::key(contract_id, clause_id, session_id))
            .or_insert_with(|| Conversation {
                turns: Vec::new(),
                touched_at: now,
            });
        conversation.turns.push(AssistTurn::user(question));
        conversation.turns.push(AssistTurn::assistant(answer));
        if conversation.turns.len() > self.max_turns {
            let excess = conversation.turns.len() - self.max_turns;
            conversation.turns.drain(..excess);
        }
        conversation.touched_at = now;
    }

    pub async fn forget_clause(&self, contract_id: Uuid, clause_id: Uuid) {
        self.conversations.write().await.retain(|key, _| {
            key.contract_id != contract_id || key.clause_id != clause_id
        });
    }

    pub async fn forget_contract(&self, contract_id: Uuid) {
        self.conversations
            .write()
            .await
            .retain(|key, _| key.contract_id != contract_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_is_scoped_per_session() {
        let store = ConversationStore::default();
        let contract_id = Uuid::new_v4();
        let clause_id = Uuid::new_v4();

        store
            .record(contract_id, clause_id, "session-a", "q1", "a1")
            .await;

        let mine = store.history(contract_id, clause_id, "session-a").await;
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].role, "user");
        assert_eq!(mine[1].role, "assistant");

        let theirs = store.history(contract_id, clause_id, "session-b").await;
        assert!(theirs.is_empty());
    }

    #[tokio::test]
    async fn stale_sessions_expire() {
        let store = ConversationStore::new(Duration::milliseconds(5), 32);
        let contract_id = Uuid::new_v4();
        let clause_id = Uuid::new_v4();

        store
            .record(contract_id, clause_id, "session", "q", "a")
            .await;
        std::thread::sleep(std::time::Duration::from_millis(20));

        assert!(store.history(contract_id, clause_id, "session").await.is_empty());
    }

    #[tokio::test]
    async fn long_conversations_keep_only_the_tail() {
        let store = ConversationStore::new(Duration::minutes(30), 4);
        let contract_id = Uuid::new_v4();
        let clause_id = Uuid::new_v4();

        for i in 0..5 {
            store
                .record(
                    contract_id,
                    clause_id,
                    "session",
                    &format!("q{i}"),
                    &format!("a{i}"),
                )
                .await;
        }

        let turns = store.history(contract_id, clause_id, "session").await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "q3");
        assert_eq!(turns[3].content, "a4");
    }

    #[tokio::test]
    async fn forget_drops_matching_conversations() {
        let store = ConversationStore::default();
        let contract_id = Uuid::new_v4();
        let first_clause = Uuid::new_v4();
        let second_clause = Uuid::new_v4();

        store
            .record(contract_id, first_clause, "session", "q", "a")
            .await;
        store
            .record(contract_id, second_clause, "session", "q", "a")
            .await;

        store.forget_clause(contract_id, first_clause).await;
        assert!(store.history(contract_id, first_clause, "session").await.is_empty());
        assert_eq!(
            store.history(contract_id, second_clause, "session").await.len(),
            2
        );

        store.forget_contract(contract_id).await;
        assert!(store.history(contract_id, second_clause, "session").await.is_empty());
    }
}
