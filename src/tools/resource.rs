use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value as JsonValue};

use crate::clients::admin_api::AdminApiClient;
use crate::core::error::{ToolError, ToolLoadError};
use crate::core::mcp::JsonObject;
use crate::core::tool::{ParameterSchema, ToolDescriptor, ToolHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Action::List),
            "get" => Some(Action::Get),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn needs_id(self) -> bool {
        matches!(self, Action::Get | Action::Update | Action::Delete)
    }

    pub fn needs_data(self) -> bool {
        matches!(self, Action::Create | Action::Update)
    }

    pub fn method(self) -> Method {
        match self {
            Action::List | Action::Get => Method::GET,
            Action::Create => Method::POST,
            Action::Update => Method::PUT,
            Action::Delete => Method::DELETE,
        }
    }
}

/// Static description of one admin API resource exposed as a tool.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub tool: &'static str,
    pub description: &'static str,
    pub path: &'static str,
    pub actions: &'static [Action],
}

impl ResourceSpec {
    pub fn schema(&self) -> ParameterSchema {
        let actions: Vec<&str> = self.actions.iter().map(|a| a.as_str()).collect();
        ParameterSchema::object()
            .property(
                "action",
                json!({"type": "string", "enum": actions, "description": "Operation to perform"}),
            )
            .property(
                "id",
                json!({"type": ["string", "integer"], "description": "Record id (get, update, delete)"}),
            )
            .property(
                "query",
                json!({"type": "object", "description": "Filters and paging for list, sent as query parameters"}),
            )
            .property(
                "data",
                json!({"type": "object", "description": "Record fields (create, update)"}),
            )
            .require("action")
    }

    pub fn descriptor(&'static self, client: Option<AdminApiClient>) -> Result<ToolDescriptor, ToolLoadError> {
        ToolDescriptor::new(
            self.tool,
            self.description,
            self.schema(),
            Arc::new(ResourceTool { spec: self, client }),
        )
    }
}

/// A validated tool call, ready to be sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<JsonObject>,
    pub body: Option<JsonValue>,
}

pub struct ResourceTool {
    spec: &'static ResourceSpec,
    client: Option<AdminApiClient>,
}

impl ResourceTool {
    pub fn plan(spec: &ResourceSpec, args: &JsonObject) -> Result<ResourceRequest, ToolError> {
        let raw = args
            .get("action")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ToolError::InvalidArgument("`action` must be a string".into()))?;
        let action = Action::parse(raw)
            .filter(|a| spec.actions.contains(a))
            .ok_or_else(|| {
                ToolError::InvalidArgument(format!("`{}` does not support action `{raw}`", spec.tool))
            })?;

        let mut path = spec.path.to_owned();
        if action.needs_id() {
            let id = match args.get("id") {
                Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
                Some(JsonValue::Number(n)) => n.to_string(),
                _ => {
                    return Err(ToolError::InvalidArgument(format!(
                        "`id` is required for action `{raw}`"
                    )))
                }
            };
            if !is_path_segment(&id) {
                return Err(ToolError::InvalidArgument(format!(
                    "`id` must be a single path segment, got `{id}`"
                )));
            }
            path = format!("{path}/{id}");
        }

        let query = match args.get("query") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Object(q)) if action == Action::List => Some(q.clone()),
            Some(JsonValue::Object(_)) => None,
            Some(_) => return Err(ToolError::InvalidArgument("`query` must be an object".into())),
        };

        let body = if action.needs_data() {
            match args.get("data") {
                Some(data @ JsonValue::Object(_)) => Some(data.clone()),
                _ => {
                    return Err(ToolError::InvalidArgument(format!(
                        "`data` object is required for action `{raw}`"
                    )))
                }
            }
        } else {
            None
        };

        Ok(ResourceRequest { method: action.method(), path, query, body })
    }
}

/// An id is spliced into the URL verbatim, so it must not be able to leave its resource.
fn is_path_segment(id: &str) -> bool {
    id != "."
        && id != ".."
        && !id.chars().any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

#[async_trait]
impl ToolHandler for ResourceTool {
    async fn invoke(&self, args: JsonObject) -> Result<JsonValue, ToolError> {
        let req = Self::plan(self.spec, &args)?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ToolError::NotConfigured(self.spec.tool.to_owned()))?;
        let out = client.send(req.method, &req.path, req.query.as_ref(), req.body.as_ref()).await?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    static WIDGETS: ResourceSpec = ResourceSpec {
        tool: "widgets",
        description: "Manage widgets",
        path: "/widgets",
        actions: &[Action::List, Action::Get, Action::Create, Action::Update],
    };

    fn args(v: JsonValue) -> JsonObject {
        match v {
            JsonValue::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn plans_each_action() {
        let r = ResourceTool::plan(&WIDGETS, &args(json!({"action":"list","query":{"limit":2}}))).unwrap();
        assert_eq!(r.method, Method::GET);
        assert_eq!(r.path, "/widgets");
        assert_eq!(r.query.unwrap()["limit"], 2);

        let r = ResourceTool::plan(&WIDGETS, &args(json!({"action":"get","id":42}))).unwrap();
        assert_eq!(r.path, "/widgets/42");

        let r = ResourceTool::plan(&WIDGETS, &args(json!({"action":"update","id":"w-1","data":{"name":"x"}})))
            .unwrap();
        assert_eq!(r.method, Method::PUT);
        assert_eq!(r.body, Some(json!({"name":"x"})));
    }

    #[test]
    fn rejects_bad_arguments() {
        let cases = [
            json!({"action": 3}),
            json!({"action":"delete","id":1}),
            json!({"action":"get"}),
            json!({"action":"create"}),
            json!({"action":"list","query":"limit=2"}),
            json!({"action":"get","id":"../orders/1"}),
            json!({"action":"get","id":".."}),
            json!({"action":"update","id":"w-1?force=true","data":{}}),
            json!({"action":"get","id":"w-1#frag"}),
            json!({"action":"get","id":"%2e%2e"}),
        ];
        for c in cases {
            let err = ResourceTool::plan(&WIDGETS, &args(c.clone())).unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgument(_)), "{c}: {err:?}");
        }
    }

    #[tokio::test]
    async fn unconfigured_client_loads_but_refuses_calls() {
        let tool = WIDGETS.descriptor(None).unwrap();
        assert_eq!(tool.parameter_schema.required, vec!["action".to_string()]);
        let err = tool.invoke(args(json!({"action":"list"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(ref t) if t == "widgets"));
    }

    #[tokio::test]
    async fn forwards_to_the_admin_api() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/widgets").json_body(json!({"name":"gear"}));
            then.status(201).json_body(json!({"id": 7, "name": "gear"}));
        });
        let client = AdminApiClient::new(server.base_url()).unwrap();
        let tool = WIDGETS.descriptor(Some(client)).unwrap();
        let out = tool.invoke(args(json!({"action":"create","data":{"name":"gear"}}))).await.unwrap();
        m.assert();
        assert_eq!(out["id"], 7);
    }

    #[tokio::test]
    async fn ids_cannot_reach_other_resources() {
        let server = MockServer::start();
        let orders = server.mock(|when, then| {
            when.path("/orders/1");
            then.status(200).json_body(json!({"id": 1}));
        });
        let client = AdminApiClient::new(server.base_url()).unwrap();
        let tool = WIDGETS.descriptor(Some(client)).unwrap();
        let err = tool.invoke(args(json!({"action":"get","id":"../orders/1"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
        orders.assert_hits(0);
    }

    #[tokio::test]
    async fn upstream_failures_surface_as_tool_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/widgets/9");
            then.status(404).body("missing");
        });
        let client = AdminApiClient::new(server.base_url()).unwrap();
        let tool = WIDGETS.descriptor(Some(client)).unwrap();
        let err = tool.invoke(args(json!({"action":"get","id":9}))).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().contains("404"));
    }
}
