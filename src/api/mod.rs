pub mod dispatcher;
pub mod mcp;
