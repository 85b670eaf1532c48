//! Creates the `platform_credibility` table (C3): one row per platform,
//! primary-keyed on `platform`, seeded at warm start and updated via EMA as
//! verification outcomes arrive.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PlatformCredibility::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlatformCredibility::Platform)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlatformCredibility::Overall).float().not_null())
                    .col(ColumnDef::new(PlatformCredibility::Reliability).float().not_null())
                    .col(ColumnDef::new(PlatformCredibility::Freshness).float().not_null())
                    .col(ColumnDef::new(PlatformCredibility::Influence).float().not_null())
                    .col(ColumnDef::new(PlatformCredibility::Consistency).float().not_null())
                    .col(ColumnDef::new(PlatformCredibility::Verification).float().not_null())
                    .col(
                        ColumnDef::new(PlatformCredibility::WeightMultiplier)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlatformCredibility::SampleSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlatformCredibility::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlatformCredibility::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PlatformCredibility {
    Table,
    Platform,
    Overall,
    Reliability,
    Freshness,
    Influence,
    Consistency,
    Verification,
    WeightMultiplier,
    SampleSize,
    UpdatedAt,
}
