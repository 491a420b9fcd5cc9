//! HTTP API for horarium-se

mod health;
mod reports;
mod sse;
mod trigger;

pub use health::health;
pub use reports::submit_report;
pub use sse::event_stream;
pub use trigger::trigger_extraction;
