//! Business logic and persistence for jobs-service.

mod auth;
mod database;
mod jwt;
mod memory;
pub mod metrics;
mod store;

pub use auth::AuthService;
pub use database::MongoDb;
pub use jwt::{AccessTokenClaims, JwtService};
pub use memory::MemoryStore;
pub use store::{JobStore, Store, UserStore};
