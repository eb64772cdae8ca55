//! Fluent builder for model documents.
//!
//! Produces the JSON form accepted by `Registry::update_model`, so tests can
//! declare just the parts of a model they care about.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    attributes: Map<String, Value>,
    groups: Map<String, Value>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a Registry-level attribute. `name` is filled in.
    pub fn attribute(mut self, name: &str, mut declaration: Value) -> Self {
        declaration["name"] = json!(name);
        self.attributes.insert(name.to_string(), declaration);
        self
    }

    pub fn group(mut self, plural: &str, singular: &str) -> Self {
        self.groups.insert(
            plural.to_string(),
            json!({ "plural": plural, "singular": singular }),
        );
        self
    }

    /// Declare a Group-level attribute on an already declared group.
    pub fn group_attribute(mut self, group: &str, name: &str, mut declaration: Value) -> Self {
        declaration["name"] = json!(name);
        self.groups[group]["attributes"][name] = declaration;
        self
    }

    pub fn resource(self, group: &str, plural: &str, singular: &str) -> Self {
        self.resource_with(group, plural, singular, json!({}))
    }

    /// Declare a Resource type with extra model fields such as `maxversions`.
    pub fn resource_with(mut self, group: &str, plural: &str, singular: &str, extra: Value) -> Self {
        let mut resource = json!({ "plural": plural, "singular": singular });
        if let Value::Object(extra) = extra {
            for (key, value) in extra {
                resource[key] = value;
            }
        }
        self.groups[group]["resources"][plural] = resource;
        self
    }

    pub fn build(self) -> Value {
        let mut doc = json!({ "groups": Value::Object(self.groups) });
        if !self.attributes.is_empty() {
            doc["attributes"] = Value::Object(self.attributes);
        }
        doc
    }
}
