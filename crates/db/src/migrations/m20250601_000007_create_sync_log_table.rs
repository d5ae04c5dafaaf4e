//! Create sync log table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncLog::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(SyncLog::Job).string_len(16).not_null())
                    .col(
                        ColumnDef::new(SyncLog::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncLog::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SyncLog::Success).boolean().not_null().default(false))
                    .col(ColumnDef::new(SyncLog::FetchedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(SyncLog::CreatedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(SyncLog::UpdatedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(SyncLog::ErrorMessage).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_log_job_started_at")
                    .table(SyncLog::Table)
                    .col(SyncLog::Job)
                    .col(SyncLog::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SyncLog {
    Table,
    Id,
    Job,
    StartedAt,
    FinishedAt,
    Success,
    FetchedCount,
    CreatedCount,
    UpdatedCount,
    ErrorMessage,
}
