//! Gmail API module
//!
//! Authentication, the API client, and the two mail operations built on them.

pub mod auth;
pub mod client;
pub mod reply;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
