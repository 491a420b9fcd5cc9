//! # Horarium Common Library
//!
//! Shared code for the Horarium microservices including:
//! - Schedule domain types (day of week, service times, schedule entries)
//! - Database initialization, models and shared queries
//! - Event types (HorariumEvent enum) and EventBus
//! - Configuration resolution
//! - Common error types

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod schedule;

pub use error::{Error, Result};
pub use schedule::{DayOfWeek, ScheduleEntry};
