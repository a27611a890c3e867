//! HTTP handlers for jobs-service.

pub mod auth;
pub mod health;
pub mod jobs;
pub mod metrics;
