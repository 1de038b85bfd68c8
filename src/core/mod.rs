//! Core Server Framework Module
//!
//! This module contains the core server implementation including:
//! - server.rs: MCP server implementation over STDIO, tool registry and dispatcher
//! - error.rs: Transport and tool error types
//! - utils.rs: Configuration loaded from the environment

pub mod error;
pub mod server;
pub mod utils;
