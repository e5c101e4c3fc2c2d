use rewind_core::{
    AttributeMap, RawAttributes, RecordingSink, RetentionPolicy, RewindContext, Rewindable,
};
use serde_json::{json, Value};

/// Test record: an article with an id, a title and a body
///
/// Retention and hook predicates are plain fields so each test can configure
/// them without declaring a new type.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub attributes: AttributeMap,
    pub policy: RetentionPolicy,
    pub keep_first: bool,
    pub on_create: bool,
    pub on_update: bool,
    pub prune_on_update: bool,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            attributes: AttributeMap::new(),
            policy: RetentionPolicy::default(),
            keep_first: false,
            on_create: true,
            on_update: true,
            prune_on_update: true,
        }
    }
}

#[allow(dead_code)]
impl Article {
    pub fn new(id: i64, title: &str) -> Self {
        let mut attributes = AttributeMap::new();
        attributes.insert("id".to_string(), json!(id));
        attributes.insert("title".to_string(), json!(title));
        attributes.insert("body".to_string(), json!(format!("body of {title}")));
        Self {
            attributes,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: impl Into<RetentionPolicy>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(Value::as_str)
    }

    pub fn body(&self) -> Option<&str> {
        self.attributes.get("body").and_then(Value::as_str)
    }

    pub fn set_title(&mut self, title: &str) {
        self.attributes.insert("title".to_string(), json!(title));
    }

    pub fn set_body(&mut self, body: &str) {
        self.attributes.insert("body".to_string(), json!(body));
    }

    pub fn set_attribute(&mut self, key: &str, value: Value) {
        self.attributes.insert(key.to_string(), value);
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }
}

impl RawAttributes for Article {
    fn raw_attributes(&self) -> AttributeMap {
        self.attributes.clone()
    }

    fn set_raw_attributes(&mut self, attributes: AttributeMap) {
        self.attributes = attributes;
    }
}

impl Rewindable for Article {
    const OWNER_TYPE: &'static str = "article";

    fn owner_id(&self) -> String {
        self.attributes
            .get("id")
            .map(Value::to_string)
            .unwrap_or_default()
    }

    fn new_instance() -> Self {
        Article::default()
    }

    fn retention_policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn snapshot_on_create(&self) -> bool {
        self.on_create
    }

    fn snapshot_on_update(&self) -> bool {
        self.on_update
    }

    fn prune_on_update(&self) -> bool {
        self.prune_on_update
    }

    fn keep_first_snapshot(&self) -> bool {
        self.keep_first
    }
}

/// Record with its own import hook: it keeps only the id of whatever it is
/// handed and marks itself as redacted, remembering each map it received
#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Redacted {
    pub attributes: AttributeMap,
    pub imported: Vec<AttributeMap>,
}

#[allow(dead_code)]
impl Redacted {
    pub fn new(id: i64, secret: &str) -> Self {
        let mut attributes = AttributeMap::new();
        attributes.insert("id".to_string(), json!(id));
        attributes.insert("secret".to_string(), json!(secret));
        Self {
            attributes,
            imported: Vec::new(),
        }
    }
}

impl RawAttributes for Redacted {
    fn raw_attributes(&self) -> AttributeMap {
        self.attributes.clone()
    }

    fn set_raw_attributes(&mut self, attributes: AttributeMap) {
        self.attributes = attributes;
    }
}

impl Rewindable for Redacted {
    const OWNER_TYPE: &'static str = "redacted";

    fn owner_id(&self) -> String {
        self.attributes
            .get("id")
            .map(Value::to_string)
            .unwrap_or_default()
    }

    fn new_instance() -> Self {
        Redacted::default()
    }

    fn import_attributes(&mut self, attributes: AttributeMap) {
        let mut kept = AttributeMap::new();
        if let Some(id) = attributes.get("id") {
            kept.insert("id".to_string(), id.clone());
        }
        kept.insert("redacted".to_string(), json!(true));
        self.imported.push(attributes);
        self.attributes = kept;
    }
}

/// Context whose notifications land in the returned sink
#[allow(dead_code)]
pub fn recording_context() -> (RewindContext, RecordingSink) {
    let sink = RecordingSink::new();
    let ctx = RewindContext::new().with_sink(sink.clone());
    (ctx, sink)
}
