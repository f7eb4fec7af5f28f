mod error;
mod reports;
mod service;

pub use error::AppError;
pub use reports::*;
pub use service::*;
