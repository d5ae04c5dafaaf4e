//! Create anime, episode, character and person tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Anime::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Anime::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Anime::ExternalId).string_len(128))
                    .col(ColumnDef::new(Anime::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Anime::TitleOriginal).string_len(256))
                    .col(ColumnDef::new(Anime::Synopsis).text())
                    .col(ColumnDef::new(Anime::CoverUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Anime::Genres)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Anime::EpisodeCount).integer())
                    .col(ColumnDef::new(Anime::AirDate).date())
                    .col(ColumnDef::new(Anime::Weekday).small_integer())
                    .col(ColumnDef::new(Anime::Rating).double().not_null().default(0.0))
                    .col(ColumnDef::new(Anime::RatingCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Anime::Popularity).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Anime::IsAdmin).boolean().not_null().default(true))
                    .col(ColumnDef::new(Anime::CreatedBy).string_len(32))
                    .col(ColumnDef::new(Anime::IsSeason).boolean().not_null().default(false))
                    .col(ColumnDef::new(Anime::IsWeekly).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Anime::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Anime::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_anime_created_by")
                            .from(Anime::Table, Anime::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_external_id")
                    .table(Anime::Table)
                    .col(Anime::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (is_admin, popularity) for catalog listing and recommendations
        manager
            .create_index(
                Index::create()
                    .name("idx_anime_kind_popularity")
                    .table(Anime::Table)
                    .col(Anime::IsAdmin)
                    .col(Anime::Popularity)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Episode::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Episode::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Episode::AnimeId).string_len(32).not_null())
                    .col(ColumnDef::new(Episode::Number).integer().not_null())
                    .col(ColumnDef::new(Episode::Title).string_len(256))
                    .col(ColumnDef::new(Episode::AirDate).date())
                    .col(
                        ColumnDef::new(Episode::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_episode_anime")
                            .from(Episode::Table, Episode::AnimeId)
                            .to(Anime::Table, Anime::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (anime_id, number)
        manager
            .create_index(
                Index::create()
                    .name("idx_episode_anime_number")
                    .table(Episode::Table)
                    .col(Episode::AnimeId)
                    .col(Episode::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Character::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Character::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Character::AnimeId).string_len(32).not_null())
                    .col(ColumnDef::new(Character::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Character::Description).text())
                    .col(ColumnDef::new(Character::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Character::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_character_anime")
                            .from(Character::Table, Character::AnimeId)
                            .to(Anime::Table, Anime::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_character_anime_id")
                    .table(Character::Table)
                    .col(Character::AnimeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Person::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Person::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Person::Description).text())
                    .col(ColumnDef::new(Person::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Person::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Person::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Character::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Episode::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Anime::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Anime {
    Table,
    Id,
    ExternalId,
    Title,
    TitleOriginal,
    Synopsis,
    CoverUrl,
    Genres,
    EpisodeCount,
    AirDate,
    Weekday,
    Rating,
    RatingCount,
    Popularity,
    IsAdmin,
    CreatedBy,
    IsSeason,
    IsWeekly,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Episode {
    Table,
    Id,
    AnimeId,
    Number,
    Title,
    AirDate,
    CreatedAt,
}

#[derive(Iden)]
enum Character {
    Table,
    Id,
    AnimeId,
    Name,
    Description,
    ImageUrl,
    CreatedAt,
}

#[derive(Iden)]
enum Person {
    Table,
    Id,
    Name,
    Description,
    ImageUrl,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
