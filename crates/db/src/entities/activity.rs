//! Activity entity (append-only user timeline).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ActivityVerb {
    #[sea_orm(string_value = "commented")]
    Commented,
    #[sea_orm(string_value = "rated")]
    Rated,
    #[sea_orm(string_value = "replied")]
    Replied,
    #[sea_orm(string_value = "liked")]
    Liked,
    #[sea_orm(string_value = "followed")]
    Followed,
    #[sea_orm(string_value = "watch_status_changed")]
    WatchStatusChanged,
    #[sea_orm(string_value = "item_created")]
    ItemCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ActivityTarget {
    #[sea_orm(string_value = "anime")]
    Anime,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "reply")]
    Reply,
    #[sea_orm(string_value = "user")]
    User,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    pub verb: ActivityVerb,

    pub target_type: ActivityTarget,

    pub target_id: String,

    /// Denormalized display data (title, score, excerpt)
    #[sea_orm(column_type = "JsonBinary")]
    pub summary: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
