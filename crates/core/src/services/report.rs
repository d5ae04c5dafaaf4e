//! Report service: user reports and their admin handling.

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        report::{self, ReportStatus, ReportTarget},
        user,
    },
    repositories::{
        AnimeRepository, CommentRepository, ReplyRepository, ReportRepository, UserRepository,
    },
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::paging::PageParams;

/// Input for filing a report.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportInput {
    pub target_type: ReportTarget,
    #[validate(length(min = 1, max = 64))]
    pub target_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Outcome chosen by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Resolve,
    Reject,
}

/// Admin decision on a pending report.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HandleReportInput {
    pub action: ReportAction,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    /// On resolve, also delete the reported comment or reply.
    #[serde(default)]
    pub delete_target: bool,
}

/// Report list filter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<ReportStatus>,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    anime_repo: AnimeRepository,
    comment_repo: CommentRepository,
    reply_repo: ReplyRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        anime_repo: AnimeRepository,
        comment_repo: CommentRepository,
        reply_repo: ReplyRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            report_repo,
            anime_repo,
            comment_repo,
            reply_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn ensure_target(&self, target_type: ReportTarget, target_id: &str) -> AppResult<()> {
        match target_type {
            ReportTarget::Anime => self.anime_repo.get_by_id(target_id).await.map(|_| ()),
            ReportTarget::Comment => self.comment_repo.get_by_id(target_id).await.map(|_| ()),
            ReportTarget::Reply => self.reply_repo.get_by_id(target_id).await.map(|_| ()),
            ReportTarget::User => self.user_repo.get_by_id(target_id).await.map(|_| ()),
        }
    }

    /// File a report.
    pub async fn create(&self, reporter_id: &str, input: CreateReportInput) -> AppResult<report::Model> {
        input.validate()?;

        if input.target_type == ReportTarget::User && input.target_id == reporter_id {
            return Err(AppError::BadRequest("Cannot report yourself".to_string()));
        }

        self.ensure_target(input.target_type, &input.target_id).await?;

        if self
            .report_repo
            .has_pending(reporter_id, input.target_type, &input.target_id)
            .await?
        {
            return Err(AppError::Conflict(
                "You already have a pending report on this target".to_string(),
            ));
        }

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            target_type: Set(input.target_type),
            target_id: Set(input.target_id),
            reason: Set(input.reason.trim().to_string()),
            status: Set(ReportStatus::Pending),
            handled_by: Set(None),
            handle_note: Set(None),
            created_at: Set(Utc::now().into()),
            handled_at: Set(None),
        };
        let saved = self.report_repo.create(model).await?;

        tracing::info!(
            report_id = %saved.id,
            target_type = ?saved.target_type,
            target_id = %saved.target_id,
            "Report filed"
        );
        Ok(saved)
    }

    /// Reports by status, newest first (admin).
    pub async fn list(&self, query: ReportQuery, page: PageParams) -> AppResult<Vec<report::Model>> {
        self.report_repo
            .find_by_status(query.status, page.limit(), page.offset())
            .await
    }

    /// Resolve or reject a pending report (admin).
    pub async fn handle(
        &self,
        admin: &user::Model,
        id: &str,
        input: HandleReportInput,
    ) -> AppResult<report::Model> {
        input.validate()?;

        let report = self.report_repo.get_by_id(id).await?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::Conflict("Report already handled".to_string()));
        }

        if input.delete_target {
            if input.action != ReportAction::Resolve {
                return Err(AppError::BadRequest(
                    "Only a resolved report can delete its target".to_string(),
                ));
            }
            self.delete_target(&report).await?;
        }

        let status = match input.action {
            ReportAction::Resolve => ReportStatus::Resolved,
            ReportAction::Reject => ReportStatus::Rejected,
        };

        let mut active: report::ActiveModel = report.into();
        active.status = Set(status);
        active.handled_by = Set(Some(admin.id.clone()));
        active.handle_note = Set(input.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
        active.handled_at = Set(Some(Utc::now().into()));
        let saved = self.report_repo.update(active).await?;

        tracing::info!(report_id = %saved.id, admin_id = %admin.id, status = ?status, "Report handled");
        Ok(saved)
    }

    async fn delete_target(&self, report: &report::Model) -> AppResult<()> {
        match report.target_type {
            ReportTarget::Comment => {
                if let Some(comment) = self.comment_repo.find_by_id(&report.target_id).await? {
                    self.comment_repo.delete(comment).await?;
                }
                Ok(())
            }
            ReportTarget::Reply => {
                if let Some(reply) = self.reply_repo.find_by_id(&report.target_id).await? {
                    self.reply_repo.delete(reply).await?;
                }
                Ok(())
            }
            ReportTarget::Anime | ReportTarget::User => Err(AppError::BadRequest(
                "Only comments and replies can be deleted from a report".to_string(),
            )),
        }
    }
}
