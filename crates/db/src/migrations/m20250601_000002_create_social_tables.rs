//! Create user follow and user ban tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserFollow::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserFollow::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserFollow::FollowerId).string_len(32).not_null())
                    .col(ColumnDef::new(UserFollow::FollowingId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserFollow::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_follow_follower")
                            .from(UserFollow::Table, UserFollow::FollowerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_follow_following")
                            .from(UserFollow::Table, UserFollow::FollowingId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (follower_id, following_id) - prevent duplicate follows
        manager
            .create_index(
                Index::create()
                    .name("idx_user_follow_pair")
                    .table(UserFollow::Table)
                    .col(UserFollow::FollowerId)
                    .col(UserFollow::FollowingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: following_id (for listing followers)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_follow_following_id")
                    .table(UserFollow::Table)
                    .col(UserFollow::FollowingId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserBan::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserBan::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(UserBan::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UserBan::AdminId).string_len(32).not_null())
                    .col(ColumnDef::new(UserBan::Reason).text().not_null())
                    .col(
                        ColumnDef::new(UserBan::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(UserBan::ExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserBan::LiftedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserBan::LiftedBy).string_len(32))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_ban_user")
                            .from(UserBan::Table, UserBan::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_ban_user_id")
                    .table(UserBan::Table)
                    .col(UserBan::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBan::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserFollow::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserFollow {
    Table,
    Id,
    FollowerId,
    FollowingId,
    CreatedAt,
}

#[derive(Iden)]
enum UserBan {
    Table,
    Id,
    UserId,
    AdminId,
    Reason,
    CreatedAt,
    ExpiresAt,
    LiftedAt,
    LiftedBy,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
