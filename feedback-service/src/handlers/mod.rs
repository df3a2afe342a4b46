//! HTTP handlers for the feedback service.

pub mod feedback;
pub mod health;

pub use feedback::{method_not_allowed, submit_feedback};
pub use health::health_check;
