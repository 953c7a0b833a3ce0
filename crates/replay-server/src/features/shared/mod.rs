//! Helpers shared by feature slices

pub mod pagination;
pub mod validation;

pub use pagination::{PaginationMetadata, PaginationParams};
pub use validation::ValidationError;
