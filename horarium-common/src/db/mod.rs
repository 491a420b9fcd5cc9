//! Database models and shared queries

pub mod init;
pub mod models;
pub mod parishes;
pub mod records;
pub mod reports;
pub mod settings;

pub use init::*;
pub use models::*;
