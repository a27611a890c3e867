use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{Job, JobChanges, JobFilter, JobPage, User};

/// Persistence for registered identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A taken email yields `DuplicateIdentity`.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    /// Look up by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

/// Persistence for jobs. Every read and write is scoped to `owner_id`.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &Job) -> Result<(), AppError>;
    async fn list_jobs(&self, owner_id: &str, filter: &JobFilter) -> Result<JobPage, AppError>;
    async fn find_job(&self, id: &str, owner_id: &str) -> Result<Option<Job>, AppError>;
    /// Returns the updated job, or `None` if no job with `id` belongs to `owner_id`.
    async fn update_job(
        &self,
        id: &str,
        owner_id: &str,
        changes: &JobChanges,
    ) -> Result<Option<Job>, AppError>;
    /// Returns `false` if nothing was removed.
    async fn delete_job(&self, id: &str, owner_id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait Store: UserStore + JobStore {
    async fn health_check(&self) -> Result<(), AppError>;
}

pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already registered";

pub fn duplicate_email() -> AppError {
    AppError::DuplicateIdentity(DUPLICATE_EMAIL_MESSAGE.to_string())
}
