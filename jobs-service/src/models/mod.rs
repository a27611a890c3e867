pub mod job;
pub mod user;

pub use job::{Job, JobChanges, JobFilter, JobPage, JobSort, JobStatus};
pub use user::{normalize_email, User};
