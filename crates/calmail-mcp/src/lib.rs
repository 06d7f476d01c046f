//! calmail: Google Calendar and Gmail tools for AI assistants over MCP.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
pub mod initialize;
pub mod protocol;
pub mod server;
pub mod tools;
