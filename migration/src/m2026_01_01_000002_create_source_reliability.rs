//! Creates the `source_reliability` table (C3), primary-keyed on
//! `(platform, author_ref)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SourceReliability::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SourceReliability::Platform).text().not_null())
                    .col(ColumnDef::new(SourceReliability::AuthorRef).text().not_null())
                    .col(
                        ColumnDef::new(SourceReliability::SignalsSeen)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SourceReliability::SignalsVerifiedTrue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SourceReliability::SignalsVerifiedFalse)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SourceReliability::EmaAccuracy).float().not_null())
                    .col(
                        ColumnDef::new(SourceReliability::LastObservedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(SourceReliability::Platform)
                            .col(SourceReliability::AuthorRef),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SourceReliability::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SourceReliability {
    Table,
    Platform,
    AuthorRef,
    SignalsSeen,
    SignalsVerifiedTrue,
    SignalsVerifiedFalse,
    EmaAccuracy,
    LastObservedAt,
}
