pub mod response;
pub mod validation;

pub use response::{ApiError, ApiResponse};
pub use validation::{is_duplicate_key_error, validate_email};
