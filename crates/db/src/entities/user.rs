//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    /// Login and verification address
    #[sea_orm(unique, nullable)]
    pub email: Option<String>,

    /// Argon2 hash; accounts created through code login may not have one
    #[serde(skip_serializing)]
    #[sea_orm(nullable)]
    pub password_hash: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// Deactivated accounts cannot sign in
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_value = false)]
    pub is_banned: bool,

    #[sea_orm(nullable)]
    pub ban_reason: Option<String>,

    /// NULL with `is_banned` = permanent ban
    #[sea_orm(nullable)]
    pub banned_until: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub last_login_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether a ban is in force at `now`.
    #[must_use]
    pub fn is_ban_active(&self, now: DateTimeWithTimeZone) -> bool {
        self.is_banned && self.banned_until.is_none_or(|until| until > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_profile::Entity")]
    Profile,

    #[sea_orm(has_one = "super::privacy_setting::Entity")]
    PrivacySetting,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::watch_status::Entity")]
    WatchStatuses,
}

impl Related<super::user_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::privacy_setting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PrivacySetting.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::watch_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchStatuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(is_banned: bool, banned_until: Option<DateTimeWithTimeZone>) -> Model {
        Model {
            id: "u1".to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            email: None,
            password_hash: None,
            is_admin: false,
            is_active: true,
            is_banned,
            ban_reason: None,
            banned_until,
            last_login_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_ban_activity() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        assert!(!user(false, None).is_ban_active(now));
        assert!(user(true, None).is_ban_active(now));
        assert!(user(true, Some(now + Duration::hours(1))).is_ban_active(now));
        assert!(!user(true, Some(now - Duration::hours(1))).is_ban_active(now));
    }
}
