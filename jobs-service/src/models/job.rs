use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Interview,
    Declined,
    #[default]
    Pending,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Interview => "interview",
            JobStatus::Declined => "declined",
            JobStatus::Pending => "pending",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interview" => Ok(JobStatus::Interview),
            "declined" => Ok(JobStatus::Declined),
            "pending" => Ok(JobStatus::Pending),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// A job application tracked by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub company: String,
    pub status: JobStatus,
    pub owner_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(owner_id: String, title: String, company: String, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            company,
            status,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the provided fields and bump `updated_at`.
    pub fn apply(&mut self, changes: &JobChanges) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(company) = &changes.company {
            self.company = company.clone();
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a job. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub company: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.company.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub enum JobSort {
    #[default]
    #[serde(rename = "latest")]
    Latest,
    #[serde(rename = "oldest")]
    Oldest,
    #[serde(rename = "a-z")]
    TitleAsc,
    #[serde(rename = "z-a")]
    TitleDesc,
}

/// Owner-scoped listing query.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    pub sort: JobSort,
    pub page: u64,
    pub limit: u64,
}

impl JobFilter {
    /// Documents to skip; saturates at the largest offset the store accepts.
    pub fn skip(&self) -> u64 {
        (self.page.max(1) - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            sort: JobSort::Latest,
            page: 1,
            limit: 10,
        }
    }
}

/// One page of jobs plus the total matching the filter.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: u64,
}
