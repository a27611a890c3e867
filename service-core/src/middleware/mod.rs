pub mod body_limit;
pub mod metrics;
pub mod panic;
pub mod pipeline;
pub mod rate_limit;
pub mod sanitize;
pub mod security_headers;
pub mod tracing;

pub use pipeline::{apply_pipeline, cors_layer, PipelineConfig};
