//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_tables;
mod m20250601_000002_create_social_tables;
mod m20250601_000003_create_catalog_tables;
mod m20250601_000004_create_comment_tables;
mod m20250601_000005_create_watch_status_table;
mod m20250601_000006_create_moderation_tables;
mod m20250601_000007_create_sync_log_table;
mod m20250601_000008_add_fulltext_search;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_tables::Migration),
            Box::new(m20250601_000002_create_social_tables::Migration),
            Box::new(m20250601_000003_create_catalog_tables::Migration),
            Box::new(m20250601_000004_create_comment_tables::Migration),
            Box::new(m20250601_000005_create_watch_status_table::Migration),
            Box::new(m20250601_000006_create_moderation_tables::Migration),
            Box::new(m20250601_000007_create_sync_log_table::Migration),
            Box::new(m20250601_000008_add_fulltext_search::Migration),
        ]
    }
}
