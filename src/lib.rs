//! MCP gateway exposing e-commerce admin API operations as tools over stdio and streamable HTTP.

pub mod api;
pub mod cli;
pub mod clients;
pub mod core;
pub mod infra;
pub mod tools;
