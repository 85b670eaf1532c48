//! Creates the optional `signals` cache table (C10 "hot cache" contract) —
//! a deployment may skip populating this and keep signals purely in-memory.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Signals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Signals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Signals::Platform).text().not_null())
                    .col(ColumnDef::new(Signals::AuthorRef).text().not_null())
                    .col(
                        ColumnDef::new(Signals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Signals::IngestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Signals::Title).text().not_null())
                    .col(ColumnDef::new(Signals::Body).text().not_null())
                    .col(ColumnDef::new(Signals::Engagement).json_binary().not_null())
                    .col(ColumnDef::new(Signals::Url).text().null())
                    .col(ColumnDef::new(Signals::DedupeKey).text().not_null())
                    .col(ColumnDef::new(Signals::QualityScore).json_binary().not_null())
                    .col(ColumnDef::new(Signals::SemanticScore).json_binary().not_null())
                    .col(ColumnDef::new(Signals::PainAssessment).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signals_dedupe_key")
                    .table(Signals::Table)
                    .col(Signals::DedupeKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Signals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Signals {
    Table,
    Id,
    Platform,
    AuthorRef,
    CreatedAt,
    IngestedAt,
    Title,
    Body,
    Engagement,
    Url,
    DedupeKey,
    QualityScore,
    SemanticScore,
    PainAssessment,
}
