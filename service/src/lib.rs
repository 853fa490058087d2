//! Forced deletion and the maintenance operations built on top of it.

pub mod best_effort;
pub mod cache_clearing;
pub mod cancellation;
pub mod error;
pub mod forced_deletion;
pub mod pipeline;
pub mod settings;
pub mod settings_service;
