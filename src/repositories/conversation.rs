//! # Conversation Repository
//!
//! Append-only conversation turn storage (C9 memory, C10 contract), capped
//! at `conversation.max_turns_retained` per conversation — the cap is
//! enforced here, not in the schema, matching the teacher's repository
//! pagination conventions.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::conversation::{ActiveModel, Column, ConversationRole, Entity as ConversationTurns, Model};

pub struct ConversationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ConversationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the last `limit` turns for `conversation_id`, oldest first
    /// (ready to feed directly into a prompt).
    pub async fn recent_turns(&self, conversation_id: Uuid, limit: u64) -> Result<Vec<Model>, RepositoryError> {
        let mut turns = ConversationTurns::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .order_by_desc(Column::TurnIndex)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        turns.reverse();
        Ok(turns)
    }

    /// Appends one turn, computing the next `turn_index` from what's
    /// already stored for this conversation.
    pub async fn append_turn(
        &self,
        conversation_id: Uuid,
        role: ConversationRole,
        content: String,
    ) -> Result<Model, RepositoryError> {
        let next_index = ConversationTurns::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .order_by_desc(Column::TurnIndex)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .map(|m| m.turn_index + 1)
            .unwrap_or(0);

        let active = ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            conversation_id: Set(conversation_id),
            turn_index: Set(next_index),
            role: Set(role),
            content: Set(content),
            created_at: Set(chrono::Utc::now().into()),
        };
        active.insert(self.db).await.map_err(RepositoryError::database_error)
    }

    /// Deletes turns beyond `max_turns_retained`, keeping the most recent.
    pub async fn enforce_retention(&self, conversation_id: Uuid, max_turns_retained: u64) -> Result<(), RepositoryError> {
        let all = ConversationTurns::find()
            .filter(Column::ConversationId.eq(conversation_id))
            .order_by_desc(Column::TurnIndex)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        for stale in all.into_iter().skip(max_turns_retained as usize) {
            ConversationTurns::delete_by_id(stale.id)
                .exec(self.db)
                .await
                .map_err(RepositoryError::database_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn turns_are_returned_oldest_first_in_order() {
        let db = test_db().await;
        let repo = ConversationRepository::new(&db);
        let conversation_id = Uuid::new_v4();

        repo.append_turn(conversation_id, ConversationRole::User, "hello".to_string()).await.unwrap();
        repo.append_turn(conversation_id, ConversationRole::Assistant, "hi there".to_string()).await.unwrap();

        let turns = repo.recent_turns(conversation_id, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].content, "hi there");
    }

    #[tokio::test]
    async fn retention_drops_oldest_turns_beyond_the_cap() {
        let db = test_db().await;
        let repo = ConversationRepository::new(&db);
        let conversation_id = Uuid::new_v4();

        for i in 0..5 {
            repo.append_turn(conversation_id, ConversationRole::User, format!("turn {i}")).await.unwrap();
        }
        repo.enforce_retention(conversation_id, 3).await.unwrap();

        let turns = repo.recent_turns(conversation_id, 10).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "turn 2");
    }
}
