// Infrastructure layer modules
pub mod config;
pub mod logging;
pub mod review_repository;

// Re-exports
pub use config::{ReviewsConfig, ReviewsConfigError};
pub use logging::init_logging;
pub use review_repository::{
    DynamoReviewRepository, KeyCondition, RepositoryError, ReviewFilter, ReviewRepository,
    ReviewUpdate, UpdateResult,
};
