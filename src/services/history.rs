use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::RwLock;

use crate::models::{AssistantReply, DbId};

/// Messages kept per user; older ones are dropped first
pub const HISTORY_LIMIT: usize = 50;

/// Each user's conversation with the assistant, oldest message first
#[derive(Clone, Default)]
pub struct ConversationLog {
    inner: Arc<RwLock<HashMap<DbId, VecDeque<AssistantReply>>>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, user_id: DbId, messages: impl IntoIterator<Item = AssistantReply>) {
        let mut log = self.inner.write().await;
        let entries = log.entry(user_id).or_default();

        entries.extend(messages);
        while entries.len() > HISTORY_LIMIT {
            entries.pop_front();
        }
    }

    pub async fn for_user(&self, user_id: DbId) -> Vec<AssistantReply> {
        self.inner
            .read()
            .await
            .get(&user_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn message(role: Role, content: &str) -> AssistantReply {
        AssistantReply {
            role,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_history_is_per_user() {
        let log = ConversationLog::new();
        log.record(
            1,
            [message(Role::User, "Genres: Action"), message(Role::Assistant, "{}")],
        )
        .await;
        log.record(2, [message(Role::User, "Genres: Drama")]).await;

        assert_eq!(log.for_user(1).await.len(), 2);
        assert_eq!(
            log.for_user(2).await,
            vec![message(Role::User, "Genres: Drama")]
        );
        assert!(log.for_user(3).await.is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_newest_messages() {
        let log = ConversationLog::new();
        let messages = (0..HISTORY_LIMIT + 5).map(|i| message(Role::User, &i.to_string()));
        log.record(1, messages).await;

        let history = log.for_user(1).await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].content, "5");
        assert_eq!(history[HISTORY_LIMIT - 1].content, (HISTORY_LIMIT + 4).to_string());
    }
}
