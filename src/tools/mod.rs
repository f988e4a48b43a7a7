pub mod catalog;
pub mod registry;
pub mod resource;

use std::time::Duration;

use crate::clients::admin_api::AdminApiClient;
use registry::ToolRegistry;

/// Registry over the built-in commerce catalogue.
pub fn builtin_registry(client: Option<AdminApiClient>, ttl: Duration) -> ToolRegistry {
    ToolRegistry::new(catalog::builtin_sources(client), ttl)
}
