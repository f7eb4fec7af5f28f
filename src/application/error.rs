use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Owner already exists: {0}")]
    OwnerAlreadyExists(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Customer already exists: {0}")]
    CustomerAlreadyExists(String),

    #[error("No customers found for owner: {0}")]
    NoCustomersFound(String),

    #[error("Customer {username} does not belong to owner {owner}")]
    OwnerMismatch { username: String, owner: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Upstream fetch failed for {username}: {message}")]
    Upstream { username: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
