//! Creates the `opportunity_history` table (C8 output, C10 persistence).
//! Append-only by convention: regenerating an opportunity for the same
//! cluster overwrites the row for its content-derived `opportunity_id`
//! rather than inserting a duplicate.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OpportunityHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OpportunityHistory::OpportunityId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OpportunityHistory::Title).text().not_null())
                    .col(ColumnDef::new(OpportunityHistory::Summary).text().not_null())
                    .col(ColumnDef::new(OpportunityHistory::ClusterRef).text().not_null())
                    .col(
                        ColumnDef::new(OpportunityHistory::CompositeScore)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentSemantic)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentTemporalMomentum)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentInnovation)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentEmergenceProbability)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentCredibility)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::ComponentPainIntensity)
                            .float()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OpportunityHistory::MarketTiming).text().not_null())
                    .col(
                        ColumnDef::new(OpportunityHistory::RiskFactors)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::SupportingSignals)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OpportunityHistory::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_opportunity_history_generated_at")
                    .table(OpportunityHistory::Table)
                    .col(OpportunityHistory::GeneratedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OpportunityHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OpportunityHistory {
    Table,
    OpportunityId,
    Title,
    Summary,
    ClusterRef,
    CompositeScore,
    ComponentSemantic,
    ComponentTemporalMomentum,
    ComponentInnovation,
    ComponentEmergenceProbability,
    ComponentCredibility,
    ComponentPainIntensity,
    MarketTiming,
    RiskFactors,
    SupportingSignals,
    GeneratedAt,
}
