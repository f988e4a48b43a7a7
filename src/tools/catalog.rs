//! The fixed set of commerce tools this gateway exposes.

use crate::clients::admin_api::AdminApiClient;
use crate::tools::registry::ToolSource;
use crate::tools::resource::{Action, ResourceSpec};

const ALL: &[Action] = &[Action::List, Action::Get, Action::Create, Action::Update, Action::Delete];

pub static PRODUCTS: ResourceSpec = ResourceSpec {
    tool: "products",
    description: "List, inspect, create, update or delete catalogue products",
    path: "/products",
    actions: ALL,
};

pub static ORDERS: ResourceSpec = ResourceSpec {
    tool: "orders",
    description: "List, inspect, create or update orders. Orders are never deleted",
    path: "/orders",
    actions: &[Action::List, Action::Get, Action::Create, Action::Update],
};

pub static CUSTOMERS: ResourceSpec = ResourceSpec {
    tool: "customers",
    description: "Manage customer accounts",
    path: "/customers",
    actions: ALL,
};

pub static INVENTORY: ResourceSpec = ResourceSpec {
    tool: "inventory",
    description: "Read and adjust stock levels per inventory item",
    path: "/inventory/items",
    actions: &[Action::List, Action::Get, Action::Update],
};

pub static PRICE_RULES: ResourceSpec = ResourceSpec {
    tool: "price_rules",
    description: "Manage discount and pricing rules",
    path: "/price-rules",
    actions: ALL,
};

pub static CATALOG: [&ResourceSpec; 5] = [&PRODUCTS, &ORDERS, &CUSTOMERS, &INVENTORY, &PRICE_RULES];

/// One source per catalogue entry, in listing order.
pub fn builtin_sources(client: Option<AdminApiClient>) -> Vec<ToolSource> {
    CATALOG
        .iter()
        .map(|&spec| {
            let client = client.clone();
            ToolSource::new(spec.tool, move || spec.descriptor(client.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolRegistry;
    use std::time::Duration;

    #[tokio::test]
    async fn every_catalogue_tool_loads_without_a_client() {
        let reg = ToolRegistry::new(builtin_sources(None), Duration::from_secs(300));
        let snap = reg.discover(false).await;
        let names: Vec<_> = snap.mcp_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["products", "orders", "customers", "inventory", "price_rules"]);
        for tool in snap.mcp_tools() {
            assert_eq!(tool.input_schema["required"], serde_json::json!(["action"]));
        }
    }

    #[test]
    fn orders_cannot_be_deleted() {
        assert!(!ORDERS.actions.contains(&Action::Delete));
        assert!(!INVENTORY.actions.contains(&Action::Create));
    }
}
