//! User ban entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ban history row, one per ban issued by an administrator.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_ban")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The banned user.
    pub user_id: String,
    /// The admin who issued the ban.
    pub admin_id: String,
    /// Reason shown to the user.
    pub reason: String,
    /// When the ban was issued.
    pub created_at: DateTimeWithTimeZone,
    /// When the ban expires (None = permanent).
    pub expires_at: Option<DateTimeWithTimeZone>,
    /// When the ban was lifted (if lifted early or by expiry).
    pub lifted_at: Option<DateTimeWithTimeZone>,
    /// Admin who lifted the ban (None when lifted by expiry).
    pub lifted_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
