//! Privacy setting entity (per-facet visibility tiers).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who may see a facet of a user's data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone, including anonymous viewers.
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    /// Only the owner.
    #[sea_orm(string_value = "only_self")]
    #[serde(rename = "self")]
    OnlySelf,
    /// The owner and users the owner follows.
    #[sea_orm(string_value = "friends")]
    Friends,
    /// The owner and users who follow each other with the owner.
    #[sea_orm(string_value = "mutual")]
    Mutual,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "privacy_setting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    pub followings: Visibility,

    pub followers: Visibility,

    pub watchlist: Visibility,

    pub activities: Visibility,

    pub updated_at: DateTimeWithTimeZone,
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

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveEnum;

    #[test]
    fn test_only_self_storage_and_wire_names() {
        assert_eq!(Visibility::OnlySelf.to_value(), "only_self");
        assert_eq!(
            Visibility::try_from_value(&"only_self".to_string()).unwrap(),
            Visibility::OnlySelf
        );
        assert_eq!(
            serde_json::to_value(Visibility::OnlySelf).unwrap(),
            serde_json::json!("self")
        );
        assert_eq!(
            serde_json::from_value::<Visibility>(serde_json::json!("self")).unwrap(),
            Visibility::OnlySelf
        );
    }
}
