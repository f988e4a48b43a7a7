//! Standard tool-result envelope: `{"content":[{"type":"text","text":...}]}`.

use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }] }
    }
}

/// Strings pass through untouched; anything else is pretty-printed JSON.
impl From<JsonValue> for ToolContent {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::String(s) => Self::text(s),
            other => Self::text(serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_not_requoted() {
        let c = ToolContent::from(json!("done"));
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({"content":[{"type":"text","text":"done"}]}));
    }

    #[test]
    fn structured_values_are_stringified() {
        let c = ToolContent::from(json!({"id": 5, "status": "paid"}));
        let ContentBlock::Text { text } = &c.content[0];
        let back: JsonValue = serde_json::from_str(text).unwrap();
        assert_eq!(back, json!({"id": 5, "status": "paid"}));
    }
}
