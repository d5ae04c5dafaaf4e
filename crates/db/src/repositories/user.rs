//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};
use serde::Serialize;

/// A user ranked by how many anime they share with someone else.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct SharedWatchUser {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Anime both users have a watch status on.
    pub mutual_watch_count: i64,
}

#[derive(FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Active, unbanned users other than `$1` that `$1` does not follow.
const SUGGESTABLE_USERS: &str = r"
    u.id <> $1
        AND u.is_active
        AND NOT u.is_banned
        AND u.id NOT IN (SELECT following_id FROM user_follow WHERE follower_id = $1)
";

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username or email.
    pub async fn find_by_login(&self, login: &str) -> AppResult<Option<user::Model>> {
        let login = login.to_lowercase();
        User::find()
            .filter(
                Condition::any()
                    .add(user::Column::UsernameLower.eq(login.clone()))
                    .add(user::Column::Email.eq(login)),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Clear the ban flags on a user.
    pub async fn clear_ban(&self, user: user::Model) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = user.into();
        active.is_banned = Set(false);
        active.ban_reason = Set(None);
        active.banned_until = Set(None);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.update(active).await
    }

    /// Search active, unbanned users by username.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<user::Model>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        User::find()
            .filter(user::Column::UsernameLower.like(&pattern))
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::IsBanned.eq(false))
            .order_by_asc(user::Column::UsernameLower)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List banned users, newest ban first.
    pub async fn find_banned(&self, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::IsBanned.eq(true))
            .order_by_desc(user::Column::UpdatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count banned users.
    pub async fn count_banned(&self) -> AppResult<u64> {
        User::find()
            .filter(user::Column::IsBanned.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users `user_id` might follow, most shared watch statuses first.
    ///
    /// Users sharing nothing are still listed with a count of zero. Equal
    /// counts come back in random order.
    pub async fn find_by_shared_watch(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<SharedWatchUser>> {
        let sql = format!(
            r#"
            SELECT u.id, u.username, p.avatar_url, COUNT(w.anime_id) AS mutual_watch_count
            FROM "user" u
            LEFT JOIN user_profile p ON p.user_id = u.id
            LEFT JOIN watch_status w
                ON w.user_id = u.id
                AND w.anime_id IN (SELECT anime_id FROM watch_status WHERE user_id = $1)
            WHERE {SUGGESTABLE_USERS}
            GROUP BY u.id, u.username, p.avatar_url
            ORDER BY mutual_watch_count DESC, random()
            LIMIT $2 OFFSET $3
            "#
        );

        SharedWatchUser::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user_id.into(),
                (limit as i64).into(),
                (offset as i64).into(),
            ],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// How many users [`Self::find_by_shared_watch`] can return in total.
    pub async fn count_suggestable(&self, user_id: &str) -> AppResult<u64> {
        let sql = format!(r#"SELECT COUNT(*) AS count FROM "user" u WHERE {SUGGESTABLE_USERS}"#);

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [user_id.into()],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map_or(0, |r| r.count.unsigned_abs()))
    }
}

/// Escape `%` and `_` for use inside a LIKE pattern.
#[must_use]
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
