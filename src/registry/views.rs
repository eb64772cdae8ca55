//! JSON views of stored entities, as clients read them.

use crate::config::RegistryConfig;
use crate::entity::{AttributeMap, Group, GroupKey, RegistryRecord, Resource, ResourceKey, Version};
use crate::schema::ResourceModel;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use std::collections::BTreeMap;

pub(super) struct Views<'a> {
    config: &'a RegistryConfig,
}

impl<'a> Views<'a> {
    pub(super) fn new(config: &'a RegistryConfig) -> Self {
        Self { config }
    }

    fn envelope(&self, xid: &str, epoch: u64, mut attributes: AttributeMap) -> AttributeMap {
        attributes.insert("xid".to_string(), Value::String(xid.to_string()));
        attributes.insert("self".to_string(), Value::String(self.config.self_url(xid)));
        attributes.insert("epoch".to_string(), Value::from(epoch));
        attributes
    }

    fn collections(&self, view: &mut AttributeMap, parent: &str, counts: &BTreeMap<String, usize>) {
        for (plural, count) in counts {
            let xid = format!("{}/{}", parent.trim_end_matches('/'), plural);
            view.insert(format!("{}url", plural), Value::String(self.config.self_url(&xid)));
            view.insert(format!("{}count", plural), Value::from(*count));
        }
    }

    pub(super) fn registry(&self, record: &RegistryRecord, group_counts: &BTreeMap<String, usize>) -> Value {
        let mut view = self.envelope("/", record.epoch, record.attributes.clone());
        view.insert(
            "specversion".to_string(),
            Value::String(self.config.spec_version.clone()),
        );
        self.collections(&mut view, "/", group_counts);
        Value::Object(view)
    }

    pub(super) fn group(&self, key: &GroupKey, group: &Group, resource_counts: &BTreeMap<String, usize>) -> Value {
        let xid = key.xid();
        let mut view = self.envelope(&xid, group.epoch, group.attributes.clone());
        self.collections(&mut view, &xid, resource_counts);
        Value::Object(view)
    }

    fn attach_document(view: &mut AttributeMap, model: &ResourceModel, version: &Version) {
        if let Some(document) = &version.document {
            view.insert(
                format!("{}base64", model.singular),
                Value::String(STANDARD.encode(document)),
            );
        }
    }

    pub(super) fn version(
        &self,
        key: &ResourceKey,
        model: &ResourceModel,
        resource: &Resource,
        version: &Version,
    ) -> Value {
        let xid = key.version_xid(&version.id);
        let mut view = self.envelope(&xid, version.epoch, version.full_attributes());
        view.insert(
            "isdefault".to_string(),
            Value::Bool(resource.meta.default_version_id == version.id),
        );
        Self::attach_document(&mut view, model, version);
        Value::Object(view)
    }

    /// The Resource as its default Version plus navigation links.
    pub(super) fn resource(&self, key: &ResourceKey, model: &ResourceModel, resource: &Resource) -> Value {
        let xid = key.xid();
        let mut view = match resource.default_version() {
            Some(version) => {
                let mut view = self.envelope(&xid, version.epoch, version.full_attributes());
                Self::attach_document(&mut view, model, version);
                view
            }
            None => self.envelope(&xid, resource.meta.epoch, AttributeMap::new()),
        };
        view.insert(
            "metaurl".to_string(),
            Value::String(self.config.self_url(&key.meta_xid())),
        );
        view.insert(
            "versionsurl".to_string(),
            Value::String(self.config.self_url(&key.versions_xid())),
        );
        view.insert(
            "versionscount".to_string(),
            Value::from(resource.versions.len()),
        );
        Value::Object(view)
    }

    pub(super) fn meta(&self, key: &ResourceKey, resource: &Resource) -> Value {
        let meta = &resource.meta;
        let mut view = self.envelope(&key.meta_xid(), meta.epoch, meta.full_attributes());
        view.insert(
            "defaultversionurl".to_string(),
            Value::String(self.config.self_url(&key.version_xid(&meta.default_version_id))),
        );
        Value::Object(view)
    }
}
