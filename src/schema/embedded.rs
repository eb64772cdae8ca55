//! Built-in attribute declarations.
//!
//! Every entity level carries a fixed set of system attributes that models
//! extend. The model document itself is described by [`model_schema`], an
//! attribute set in the same format user models use, so model uploads are
//! checked by the ordinary attribute validator.

use super::types::{Attribute, AttributeType, Attributes, GroupModel, Item, ResourceModel, attributes};
use serde_json::{Value, json};

/// Allowed values of the Meta `compatibility` attribute.
pub const COMPATIBILITY_VALUES: [&str; 7] = [
    "none",
    "backward",
    "backward_transitive",
    "forward",
    "forward_transitive",
    "full",
    "full_transitive",
];

/// Returns the attribute set describing a model document, as a JSON string.
///
/// Attribute declarations themselves are typed `any` here; their structure is
/// enforced when the document is deserialized and verified.
pub fn model_schema() -> &'static str {
    r#"{
  "attributes": {
    "name": "attributes",
    "type": "any"
  },
  "groups": {
    "name": "groups",
    "type": "map",
    "item": {
      "type": "object",
      "attributes": {
        "plural": { "name": "plural", "type": "string", "required": true },
        "singular": { "name": "singular", "type": "string", "required": true },
        "description": { "name": "description", "type": "string" },
        "labels": {
          "name": "labels",
          "type": "map",
          "item": { "type": "string" }
        },
        "attributes": { "name": "attributes", "type": "any" },
        "resources": {
          "name": "resources",
          "type": "map",
          "item": {
            "type": "object",
            "attributes": {
              "plural": { "name": "plural", "type": "string", "required": true },
              "singular": { "name": "singular", "type": "string", "required": true },
              "description": { "name": "description", "type": "string" },
              "labels": {
                "name": "labels",
                "type": "map",
                "item": { "type": "string" }
              },
              "maxversions": { "name": "maxversions", "type": "integer" },
              "setversionid": { "name": "setversionid", "type": "boolean" },
              "setdefaultversionsticky": { "name": "setdefaultversionsticky", "type": "boolean" },
              "hasdocument": { "name": "hasdocument", "type": "boolean" },
              "attributes": { "name": "attributes", "type": "any" },
              "metaattributes": { "name": "metaattributes", "type": "any" }
            }
          }
        }
      }
    }
  }
}"#
}

fn string(name: &str) -> Attribute {
    Attribute::new(name, AttributeType::String)
}

/// Attributes shared by the Registry, Groups and Versions.
fn common() -> Vec<Attribute> {
    vec![
        Attribute::new("self", AttributeType::Url).readonly(),
        Attribute::new("xid", AttributeType::Xid).readonly(),
        Attribute::new("epoch", AttributeType::UInteger).readonly(),
        string("name"),
        string("description"),
        Attribute::new("documentation", AttributeType::Url),
        Attribute::new("labels", AttributeType::Map).with_item(Item::new(AttributeType::String)),
        Attribute::new("createdat", AttributeType::Timestamp).required(),
        Attribute::new("modifiedat", AttributeType::Timestamp).required(),
    ]
}

/// System attributes of the Registry entity.
pub fn registry_attributes() -> Attributes {
    let mut list = common();
    list.push(string("specversion").readonly());
    list.push(string("registryid").required().immutable());
    attributes(list)
}

/// System attributes of a Group of type `group`.
pub fn group_attributes(group: &GroupModel) -> Attributes {
    let mut list = common();
    list.push(string(&group.id_attribute()).required().immutable());
    for resource in group.resources.values() {
        list.push(Attribute::new(format!("{}url", resource.plural), AttributeType::Url).readonly());
        list.push(
            Attribute::new(format!("{}count", resource.plural), AttributeType::UInteger).readonly(),
        );
    }
    attributes(list)
}

/// System attributes of a Version of `resource`.
pub fn version_attributes(resource: &ResourceModel) -> Attributes {
    let mut list = common();
    list.push(string(&resource.id_attribute()).required().immutable());
    list.push(string("versionid").required().immutable());
    list.push(Attribute::new("isdefault", AttributeType::Boolean).readonly());
    list.push(string("ancestor").required());
    list.push(string("contenttype"));
    if resource.hasdocument {
        list.push(Attribute::new(format!("{}url", resource.singular), AttributeType::Url));
        list.push(string(&format!("{}base64", resource.singular)));
    }
    attributes(list)
}

/// System attributes of the Meta sub-entity of `resource`.
pub fn meta_attributes(resource: &ResourceModel) -> Attributes {
    let compatibility: Vec<Value> = COMPATIBILITY_VALUES.iter().map(|value| json!(value)).collect();
    let deprecated = attributes([
        Attribute::new("effective", AttributeType::Timestamp),
        Attribute::new("removal", AttributeType::Timestamp),
        Attribute::new("alternative", AttributeType::Url),
        Attribute::new("documentation", AttributeType::Url),
        Attribute::new("*", AttributeType::Any),
    ]);

    attributes([
        string(&resource.id_attribute()).required().immutable(),
        Attribute::new("self", AttributeType::Url).readonly(),
        Attribute::new("xid", AttributeType::Xid).readonly(),
        Attribute::new("epoch", AttributeType::UInteger).readonly(),
        Attribute::new("createdat", AttributeType::Timestamp).required(),
        Attribute::new("modifiedat", AttributeType::Timestamp).required(),
        Attribute::new("readonly", AttributeType::Boolean).readonly(),
        string("compatibility")
            .with_enum(compatibility)
            .with_default(json!("none")),
        Attribute::new("deprecated", AttributeType::Object).with_attributes(deprecated),
        string("defaultversionid").required(),
        Attribute::new("defaultversionurl", AttributeType::Url).readonly(),
        Attribute::new("defaultversionsticky", AttributeType::Boolean).required(),
    ])
}
