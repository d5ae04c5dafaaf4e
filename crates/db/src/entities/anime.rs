//! Anime entity.
//!
//! Curated anime (`is_admin = true`) and user-submitted items share this
//! table. `rating` and `rating_count` are derived from anime-level comment
//! scores; `popularity` is the heat counter.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "anime")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Identifier in the external catalog, used by sync upserts
    #[sea_orm(unique, nullable)]
    pub external_id: Option<String>,

    pub title: String,

    #[sea_orm(nullable)]
    pub title_original: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub synopsis: Option<String>,

    #[sea_orm(nullable)]
    pub cover_url: Option<String>,

    /// Genre tags (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub genres: Json,

    #[sea_orm(nullable)]
    pub episode_count: Option<i32>,

    #[sea_orm(nullable)]
    pub air_date: Option<Date>,

    /// 0 = Monday .. 6 = Sunday
    #[sea_orm(nullable)]
    pub weekday: Option<i16>,

    #[sea_orm(default_value = 0.0)]
    pub rating: f64,

    #[sea_orm(default_value = 0)]
    pub rating_count: i32,

    #[sea_orm(default_value = 0)]
    pub popularity: i64,

    /// Curated by an administrator (false for user-submitted items)
    #[sea_orm(default_value = true)]
    pub is_admin: bool,

    #[sea_orm(nullable)]
    pub created_by: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_season: bool,

    #[sea_orm(default_value = false)]
    pub is_weekly: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Genre tags as strings. Non-string entries are skipped.
    #[must_use]
    pub fn genre_list(&self) -> Vec<String> {
        self.genres
            .as_array()
            .map(|genres| {
                genres
                    .iter()
                    .filter_map(|g| g.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,

    #[sea_orm(has_many = "super::episode::Entity")]
    Episodes,

    #[sea_orm(has_many = "super::character::Entity")]
    Characters,

    #[sea_orm(has_many = "super::watch_status::Entity")]
    WatchStatuses,
}

impl Related<super::episode::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episodes.def()
    }
}

impl Related<super::character::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Characters.def()
    }
}

impl Related<super::watch_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchStatuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
