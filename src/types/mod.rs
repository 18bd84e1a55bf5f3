//! Type definitions

pub mod mail;
pub mod messages;
pub mod template;

pub use mail::*;
pub use messages::*;
pub use template::*;
