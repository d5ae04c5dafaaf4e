//! Add full-text search indexes for the anime catalog.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 'simple' configuration: titles mix Japanese, Chinese and English
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_anime_search
                ON anime
                USING GIN (
                    to_tsvector(
                        'simple',
                        COALESCE(title, '') || ' ' || COALESCE(title_original, '') || ' ' || COALESCE(synopsis, '')
                    )
                );
                ",
            )
            .await?;

        // Genre containment filter (genres @> '["fantasy"]')
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_anime_genres
                ON anime
                USING GIN (genres);
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r"
                DROP INDEX IF EXISTS idx_anime_search;
                DROP INDEX IF EXISTS idx_anime_genres;
                ",
            )
            .await?;

        Ok(())
    }
}
