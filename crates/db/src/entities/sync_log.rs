//! Sync log entity, one row per external sync run.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SyncJob {
    #[sea_orm(string_value = "season")]
    Season,
    #[sea_orm(string_value = "weekly")]
    Weekly,
}

impl SyncJob {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Season => "season",
            Self::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncJob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "season" => Ok(Self::Season),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown sync job: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub job: SyncJob,

    pub started_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub finished_at: Option<DateTimeWithTimeZone>,

    pub success: bool,

    pub fetched_count: i32,

    pub created_count: i32,

    pub updated_count: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_parse() {
        assert_eq!("season".parse::<SyncJob>(), Ok(SyncJob::Season));
        assert_eq!("weekly".parse::<SyncJob>(), Ok(SyncJob::Weekly));
        assert!("daily".parse::<SyncJob>().is_err());
        assert_eq!(SyncJob::Weekly.to_string(), "weekly");
    }
}
