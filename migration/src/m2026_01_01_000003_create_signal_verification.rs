//! Creates the append-only `signal_verification` table (C3), primary-keyed on
//! `(signal_id, verified_at)` so a signal may be re-verified over time
//! without overwriting history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SignalVerification::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SignalVerification::SignalId).uuid().not_null())
                    .col(ColumnDef::new(SignalVerification::Platform).text().not_null())
                    .col(
                        ColumnDef::new(SignalVerification::PredictedPain)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SignalVerification::PredictedIntensity)
                            .float()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SignalVerification::VerifiedPain)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SignalVerification::VerifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SignalVerification::SignalId)
                            .col(SignalVerification::VerifiedAt),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_signal_verification_platform")
                    .table(SignalVerification::Table)
                    .col(SignalVerification::Platform)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SignalVerification::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SignalVerification {
    Table,
    SignalId,
    Platform,
    PredictedPain,
    PredictedIntensity,
    VerifiedPain,
    VerifiedAt,
}
