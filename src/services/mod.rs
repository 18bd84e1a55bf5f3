//! Business logic services

pub mod credits;
pub mod email_sender;
pub mod mailing;
pub mod rate_limiter;
pub mod recipients;
pub mod renderer;
pub mod template_store;
