//! Comment entity (score and text attached to a catalog object).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of object a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    #[sea_orm(string_value = "anime")]
    Anime,
    #[sea_orm(string_value = "episode")]
    Episode,
    #[sea_orm(string_value = "character")]
    Character,
    #[sea_orm(string_value = "person")]
    Person,
}

/// Context a comment is written in.
///
/// `Anime` and `Item` both attach to a row of the anime table; they differ in
/// whether that row is curated or user-submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CommentScope {
    #[sea_orm(string_value = "anime")]
    Anime,
    #[sea_orm(string_value = "item")]
    Item,
    #[sea_orm(string_value = "episode")]
    Episode,
    #[sea_orm(string_value = "character")]
    Character,
    #[sea_orm(string_value = "person")]
    Person,
}

impl CommentScope {
    /// Target table a comment with this scope points at.
    #[must_use]
    pub const fn target(self) -> CommentTarget {
        match self {
            Self::Anime | Self::Item => CommentTarget::Anime,
            Self::Episode => CommentTarget::Episode,
            Self::Character => CommentTarget::Character,
            Self::Person => CommentTarget::Person,
        }
    }

    /// Whether scores in this scope feed the anime rating.
    #[must_use]
    pub const fn rates_anime(self) -> bool {
        matches!(self, Self::Anime | Self::Item)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    pub target_type: CommentTarget,

    pub target_id: String,

    pub scope: CommentScope,

    /// 1..=10, optional for text-only comments
    #[sea_orm(nullable)]
    pub score: Option<i16>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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

    #[sea_orm(has_many = "super::reply::Entity")]
    Replies,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::reply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Replies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
