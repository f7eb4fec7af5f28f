pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;
pub mod upstream;

pub use domain::*;
pub use storage::Repository;
