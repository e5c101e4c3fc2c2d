use rewind_core::{AttributeMap, RawAttributes, RetentionPolicy, Rewindable};
use serde_json::{json, Value};

/// Minimal record persisted through the SQLite repository
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub attributes: AttributeMap,
    pub policy: Option<RetentionPolicy>,
}

#[allow(dead_code)]
impl Page {
    pub fn new(id: &str, heading: &str) -> Self {
        let mut attributes = AttributeMap::new();
        attributes.insert("slug".to_string(), json!(id));
        attributes.insert("heading".to_string(), json!(heading));
        attributes.insert("views".to_string(), json!(0));
        Self {
            attributes,
            policy: None,
        }
    }

    pub fn heading(&self) -> Option<&str> {
        self.attributes.get("heading").and_then(Value::as_str)
    }

    pub fn set_heading(&mut self, heading: &str) {
        self.attributes.insert("heading".to_string(), json!(heading));
    }

    pub fn views(&self) -> Option<i64> {
        self.attributes.get("views").and_then(Value::as_i64)
    }

    pub fn set_views(&mut self, views: i64) {
        self.attributes.insert("views".to_string(), json!(views));
    }
}

impl RawAttributes for Page {
    fn raw_attributes(&self) -> AttributeMap {
        self.attributes.clone()
    }

    fn set_raw_attributes(&mut self, attributes: AttributeMap) {
        self.attributes = attributes;
    }
}

impl Rewindable for Page {
    const OWNER_TYPE: &'static str = "page";

    fn owner_id(&self) -> String {
        self.attributes
            .get("slug")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn new_instance() -> Self {
        Page::default()
    }

    fn retention_policy(&self) -> RetentionPolicy {
        self.policy.unwrap_or_default()
    }
}
