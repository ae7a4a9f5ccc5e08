// Domain layer modules
pub mod request_validator;
pub mod review;

// Re-exports
pub use request_validator::{
    MinRatingParams, RawRequest, RequestValidator, TranslationParams, UpdateReviewParams,
    ValidationError, YearParams,
};
pub use review::{Review, ReviewKey};
