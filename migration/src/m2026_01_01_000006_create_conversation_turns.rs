//! Creates the `conversation_turns` table (C9 memory, C10 persistence).
//! Append-only; retention cap is enforced by the repository, not the schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConversationTurns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConversationTurns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConversationTurns::ConversationId).uuid().not_null())
                    .col(ColumnDef::new(ConversationTurns::TurnIndex).integer().not_null())
                    .col(ColumnDef::new(ConversationTurns::Role).text().not_null())
                    .col(ColumnDef::new(ConversationTurns::Content).text().not_null())
                    .col(
                        ColumnDef::new(ConversationTurns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_conversation_turns_conversation_id")
                    .table(ConversationTurns::Table)
                    .col(ConversationTurns::ConversationId)
                    .col(ConversationTurns::TurnIndex)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConversationTurns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ConversationTurns {
    Table,
    Id,
    ConversationId,
    TurnIndex,
    Role,
    Content,
    CreatedAt,
}
