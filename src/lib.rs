//! Email MCP Server Library
//!
//! A Model Context Protocol (MCP) server that lets an assistant list unread
//! Gmail messages and create threaded draft replies.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{ErrorKind, GmailMcpError, Result};
