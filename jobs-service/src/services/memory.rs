//! In-process store backend for local development and tests.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use service_core::error::AppError;

use super::store::{duplicate_email, JobStore, Store, UserStore};
use crate::models::{Job, JobChanges, JobFilter, JobPage, JobSort, User};

#[derive(Default)]
pub struct MemoryStore {
    /// Keyed by normalized email.
    users: DashMap<String, User>,
    jobs: DashMap<String, Job>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(duplicate_email()),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<(), AppError> {
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn list_jobs(&self, owner_id: &str, filter: &JobFilter) -> Result<JobPage, AppError> {
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .filter(|entry| filter.status.map_or(true, |s| entry.status == s))
            .filter(|entry| {
                search
                    .as_ref()
                    .map_or(true, |s| entry.title.to_lowercase().contains(s))
            })
            .map(|entry| entry.value().clone())
            .collect();

        match filter.sort {
            JobSort::Latest => jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            JobSort::Oldest => jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            JobSort::TitleAsc => jobs.sort_by(|a, b| a.title.cmp(&b.title)),
            JobSort::TitleDesc => jobs.sort_by(|a, b| b.title.cmp(&a.title)),
        }

        let total = jobs.len() as u64;
        let jobs = jobs
            .into_iter()
            .skip(usize::try_from(filter.skip()).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .collect();

        Ok(JobPage { jobs, total })
    }

    async fn find_job(&self, id: &str, owner_id: &str) -> Result<Option<Job>, AppError> {
        Ok(self
            .jobs
            .get(id)
            .filter(|job| job.owner_id == owner_id)
            .map(|job| job.value().clone()))
    }

    async fn update_job(
        &self,
        id: &str,
        owner_id: &str,
        changes: &JobChanges,
    ) -> Result<Option<Job>, AppError> {
        match self.jobs.get_mut(id) {
            Some(mut job) if job.owner_id == owner_id => {
                job.apply(changes);
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_job(&self, id: &str, owner_id: &str) -> Result<bool, AppError> {
        Ok(self
            .jobs
            .remove_if(id, |_, job| job.owner_id == owner_id)
            .is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
