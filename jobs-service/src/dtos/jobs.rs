use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{Job, JobChanges, JobFilter, JobSort, JobStatus};

pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(alias = "position")]
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 50, message = "Company must be 1 to 50 characters"))]
    pub company: String,

    #[serde(default)]
    pub status: Option<JobStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJobRequest {
    #[serde(alias = "position")]
    #[validate(length(min = 1, max = 100, message = "Title must be 1 to 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Company must be 1 to 50 characters"))]
    pub company: Option<String>,

    pub status: Option<JobStatus>,
}

impl UpdateJobRequest {
    /// An empty patch is a validation failure.
    pub fn into_changes(self) -> Result<JobChanges, AppError> {
        let changes = JobChanges {
            title: self.title,
            company: self.company,
            status: self.status,
        };
        if changes.is_empty() {
            return Err(AppError::validation(
                "body",
                "Provide at least one of title, company or status",
            ));
        }
        Ok(changes)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListJobsParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<JobSort>,
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListJobsParams {
    pub fn into_filter(self) -> Result<JobFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(s) => Some(
                s.parse::<JobStatus>()
                    .map_err(|e| AppError::validation("status", e))?,
            ),
        };

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(JobFilter {
            status,
            search,
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub company: String,
    pub status: JobStatus,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            status: job.status,
            owner_id: job.owner_id,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub count: usize,
    pub total_jobs: u64,
    pub num_of_pages: u64,
}

impl JobListResponse {
    pub fn new(jobs: Vec<Job>, total_jobs: u64, limit: u64) -> Self {
        let jobs: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();
        Self {
            count: jobs.len(),
            jobs,
            total_jobs,
            num_of_pages: total_jobs.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteJobResponse {
    pub message: String,
    pub id: String,
}
