//! People (staff and cast).

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{person, user},
    repositories::PersonRepository,
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::paging::PageParams;

/// Input for adding a person.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePersonInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct PersonService {
    person_repo: PersonRepository,
    id_gen: IdGenerator,
}

impl PersonService {
    #[must_use]
    pub const fn new(person_repo: PersonRepository) -> Self {
        Self {
            person_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a person (admin only).
    pub async fn create(&self, actor: &user::Model, input: CreatePersonInput) -> AppResult<person::Model> {
        if !actor.is_admin {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }
        input.validate()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let model = person::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            image_url: Set(input.image_url.filter(|u| !u.trim().is_empty())),
            created_at: Set(Utc::now().into()),
        };
        self.person_repo.create(model).await
    }

    pub async fn get(&self, id: &str) -> AppResult<person::Model> {
        self.person_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Person {id}")))
    }

    pub async fn list(&self, page: PageParams) -> AppResult<Vec<person::Model>> {
        self.person_repo.list(page.limit(), page.offset()).await
    }
}
