//! Like repository.

use std::sync::Arc;

use crate::entities::{Comment, Like, Reply, comment, like, reply};
use anitrack_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};

fn db_err(e: sea_orm::DbErr) -> AppError {
    AppError::Database(e.to_string())
}

/// Add `delta` to the liked row's counter, never going below zero.
async fn adjust_like_count<C: ConnectionTrait>(
    conn: &C,
    target_type: like::LikeTarget,
    target_id: &str,
    delta: i32,
) -> AppResult<()> {
    let value = Expr::cust_with_values("GREATEST(like_count + $1, 0)", [delta]);
    match target_type {
        like::LikeTarget::Comment => {
            Comment::update_many()
                .col_expr(comment::Column::LikeCount, value)
                .filter(comment::Column::Id.eq(target_id))
                .exec(conn)
                .await
        }
        like::LikeTarget::Reply => {
            Reply::update_many()
                .col_expr(reply::Column::LikeCount, value)
                .filter(reply::Column::Id.eq(target_id))
                .exec(conn)
                .await
        }
    }
    .map_err(db_err)?;
    Ok(())
}

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Active likes of a user among the given targets.
    pub async fn find_active_by_targets(
        &self,
        user_id: &str,
        target_type: like::LikeTarget,
        target_ids: &[String],
    ) -> AppResult<Vec<like::Model>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        Like::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::TargetType.eq(target_type))
            .filter(like::Column::TargetId.is_in(target_ids.to_vec()))
            .filter(like::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Flip an inactive like to `is_active`, or create an active one, and
    /// move the target's counter in the same transaction.
    ///
    /// The flip is conditional on the current state and the insert ignores
    /// conflicts on `(user, target)`, so concurrent calls change the counter
    /// once. Returns whether anything changed.
    pub async fn set_state(
        &self,
        user_id: &str,
        target_type: like::LikeTarget,
        target_id: &str,
        is_active: bool,
        new_id: String,
    ) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let flipped = Like::update_many()
            .col_expr(like::Column::IsActive, Expr::value(is_active))
            .col_expr(like::Column::UpdatedAt, Expr::value(now))
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::TargetType.eq(target_type))
            .filter(like::Column::TargetId.eq(target_id))
            .filter(like::Column::IsActive.eq(!is_active))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;

        let changed = if flipped > 0 {
            true
        } else if is_active {
            let model = like::ActiveModel {
                id: Set(new_id),
                user_id: Set(user_id.to_string()),
                target_type: Set(target_type),
                target_id: Set(target_id.to_string()),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(None),
            };
            let inserted = Like::insert(model)
                .on_conflict(
                    OnConflict::columns([
                        like::Column::UserId,
                        like::Column::TargetType,
                        like::Column::TargetId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;
            inserted > 0
        } else {
            false
        };

        if changed {
            let delta = if is_active { 1 } else { -1 };
            adjust_like_count(&txn, target_type, target_id, delta).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::executed_sql;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_reactivating_like_bumps_counter_in_one_transaction() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
        );

        let repo = LikeRepository::new(Arc::clone(&db));
        let changed = repo
            .set_state("u1", like::LikeTarget::Comment, "c1", true, "l2".to_string())
            .await
            .unwrap();
        assert!(changed);
        drop(repo);

        let log = executed_sql(db);
        assert_eq!(log.len(), 1);
        let txn = log[0].join("\n");
        assert!(txn.contains(r#"UPDATE "like""#));
        assert!(txn.contains(r#"UPDATE "comment""#));
        assert!(!txn.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_like_lost_race_leaves_counter_alone() {
        // Flip matched nothing and the insert hit the unique index
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0)])
                .into_connection(),
        );

        let repo = LikeRepository::new(Arc::clone(&db));
        let changed = repo
            .set_state("u1", like::LikeTarget::Reply, "r1", true, "l2".to_string())
            .await
            .unwrap();
        assert!(!changed);
        drop(repo);

        let sql = executed_sql(db).concat().join("\n");
        assert!(sql.contains("ON CONFLICT"));
        assert!(!sql.contains(r#"UPDATE "reply""#));
    }

    #[tokio::test]
    async fn test_unlike_twice_decrements_once() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(0)])
                .into_connection(),
        );

        let repo = LikeRepository::new(Arc::clone(&db));
        assert!(repo
            .set_state("u1", like::LikeTarget::Comment, "c1", false, "unused".to_string())
            .await
            .unwrap());
        assert!(!repo
            .set_state("u1", like::LikeTarget::Comment, "c1", false, "unused".to_string())
            .await
            .unwrap());

        drop(repo);

        let log = executed_sql(db);
        assert_eq!(log.len(), 2);
        let sql = log.concat().join("\n");
        assert_eq!(sql.matches(r#"UPDATE "comment""#).count(), 1);
        assert!(!sql.contains("INSERT"));
    }
}
