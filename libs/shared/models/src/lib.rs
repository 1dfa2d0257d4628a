pub mod error;
pub mod extract;
pub mod response;

pub use error::AppError;
pub use extract::{AppJson, AppPath, AppQuery};
pub use response::ApiResponse;
