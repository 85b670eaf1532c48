//! Conversation turn entity (C9 memory, C10 persistence).
//!
//! Turns are partitioned and serialized per `conversation_id`; persistence is
//! append-only with a retention cap enforced by the repository, not by the
//! schema.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "conversation_turns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub conversation_id: Uuid,
    pub turn_index: i32,
    pub role: ConversationRole,
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ConversationRole {
    #[sea_orm(string_value = "user")]
    #[serde(rename = "user")]
    User,
    #[sea_orm(string_value = "assistant")]
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A single turn as used by the conversation engine, decoupled from the
/// storage row so callers don't need a database id to build a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub content: String,
    #[schema(value_type = String)]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Model> for ConversationTurn {
    fn from(model: Model) -> Self {
        Self {
            role: model.role,
            content: model.content,
            created_at: model.created_at.with_timezone(&chrono::Utc),
        }
    }
}
