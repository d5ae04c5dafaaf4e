//! Create watch status table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WatchStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WatchStatus::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WatchStatus::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(WatchStatus::AnimeId).string_len(32).not_null())
                    .col(ColumnDef::new(WatchStatus::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(WatchStatus::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(WatchStatus::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watch_status_user")
                            .from(WatchStatus::Table, WatchStatus::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watch_status_anime")
                            .from(WatchStatus::Table, WatchStatus::AnimeId)
                            .to(Anime::Table, Anime::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, anime_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_watch_status_user_anime")
                    .table(WatchStatus::Table)
                    .col(WatchStatus::UserId)
                    .col(WatchStatus::AnimeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: anime_id (friend signal aggregation)
        manager
            .create_index(
                Index::create()
                    .name("idx_watch_status_anime_id")
                    .table(WatchStatus::Table)
                    .col(WatchStatus::AnimeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WatchStatus::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WatchStatus {
    Table,
    Id,
    UserId,
    AnimeId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Anime {
    Table,
    Id,
}
