//! The registry service.
//!
//! [`Registry`] runs every request through the same pipeline: merge the
//! request with the stored entity, validate the result against the current
//! model snapshot, let the default-version resolver settle the Resource's
//! pointer and retention, then commit to storage. Mutating requests are
//! serialised through one write lock; reads never take it.
//!
//! # Example Usage
//!
//! ```rust
//! use xregistry_server::{RegistryBuilder, WriteOptions};
//! use xregistry_server::entity::ResourceKey;
//! use xregistry_server::storage::InMemoryStorage;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new(InMemoryStorage::new())
//!     .with_model(json!({
//!         "groups": {
//!             "dirs": {
//!                 "plural": "dirs", "singular": "dir",
//!                 "resources": { "files": { "plural": "files", "singular": "file" } }
//!             }
//!         }
//!     }))
//!     .build()
//!     .await?;
//!
//! registry
//!     .upsert_group("dirs", Some("d1"), json!({}), WriteOptions::replace())
//!     .await?;
//! let file = ResourceKey::new("dirs", "d1", "files", "f1");
//! let created = registry
//!     .upsert_resource(&file, json!({"name": "first"}), WriteOptions::replace())
//!     .await?;
//!
//! assert!(created.is_new);
//! assert_eq!(created.entity["versionid"], "1");
//! # Ok(())
//! # }
//! ```

mod groups;
mod model_update;
mod options;
mod resources;
mod views;


pub use options::{LevelPath, WriteMode, WriteOptions, WriteOutcome};

use crate::config::RegistryConfig;
use crate::entity::{GroupKey, RegistryRecord, Resource};
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{EntityLevel, Model};
use crate::storage::{StorageKey, StoragePrefix, StorageProvider};
use crate::topology::{Topology, TopologySnapshot};
use crate::validation::{EntityContext, Validator, format_timestamp};
use chrono::Utc;
use log::{debug, info, trace, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use views::Views;

/// Attributes the server computes on every read; stripped from requests.
const COMPUTED_ATTRIBUTES: [&str; 4] = ["self", "xid", "epoch", "isdefault"];

/// A registry over a pluggable storage backend.
pub struct Registry<S: StorageProvider> {
    storage: S,
    config: RegistryConfig,
    model: RwLock<Arc<Model>>,
    write_lock: Mutex<()>,
}

impl<S: StorageProvider> Registry<S> {
    /// Open the registry stored in `storage`, creating its root record
    /// when the storage is empty.
    pub(crate) async fn open(storage: S, config: RegistryConfig) -> RegistryResult<Self> {
        let stored = storage
            .get(StorageKey::registry())
            .await
            .map_err(storage_failure("/", "open"))?;

        let record: RegistryRecord = match stored {
            Some(value) => {
                let record: RegistryRecord = decode(value, "/")?;
                info!(
                    "Opened registry with {} group type(s)",
                    record.model.groups.len()
                );
                record
            }
            None => {
                let record = new_registry_record(&config)?;
                storage
                    .put(StorageKey::registry(), encode(&record, "/")?)
                    .await
                    .map_err(storage_failure("/", "create"))?;
                info!("Created registry '{}'", config.registry_id);
                record
            }
        };

        let mut model = record.model;
        model.set_generation(1);
        Ok(Self {
            storage,
            config,
            model: RwLock::new(Arc::new(model)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The current model snapshot.
    pub async fn model(&self) -> Arc<Model> {
        self.model.read().await.clone()
    }

    /// Read the Registry entity.
    pub async fn get_registry(&self) -> RegistryResult<Value> {
        debug!("Getting registry");
        let model = self.model().await;
        let record = self.load_registry().await?;
        let counts = self.group_counts(&model).await?;
        Ok(Views::new(&self.config).registry(&record, &counts))
    }

    /// Update the Registry's own attributes.
    pub async fn update_registry(&self, data: Value, opts: WriteOptions) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        info!("Updating registry '{}'", self.config.registry_id);
        trace!("Registry data: {}", data);

        let mut record = self.load_registry().await?;
        let mut input = into_object(data, "/")?;
        self.check_epoch("/", &input, record.epoch, &opts)?;

        let mut extra = vec!["specversion".to_string()];
        for plural in model.groups.keys() {
            extra.push(format!("{}url", plural));
            extra.push(format!("{}count", plural));
        }
        strip_computed(&mut input, &extra);

        let client_modified = has_value(&input, "modifiedat");
        let mut merged = combine(opts.mode, Some(&record.attributes), input);
        merged
            .entry("registryid")
            .or_insert_with(|| Value::String(self.config.registry_id.clone()));
        stamp_timestamps(
            &mut merged,
            client_modified,
            record.attributes.get("createdat"),
            &now(),
        );

        let data = Value::Object(merged);
        let topology = self.topology_for(&model, &data).await?;
        let ctx = EntityContext::new()
            .with_existing(Some(&record.attributes))
            .expect_id("registryid", &self.config.registry_id);
        let attributes =
            Validator::new(&model, &topology).validate_entity(&EntityLevel::Registry, "/", &data, &ctx)?;

        record.attributes = attributes;
        record.epoch += 1;
        self.storage
            .put(StorageKey::registry(), encode(&record, "/")?)
            .await
            .map_err(storage_failure("/", "update"))?;
        info!("Registry updated to epoch {}", record.epoch);

        let counts = self.group_counts(&model).await?;
        Ok(WriteOutcome {
            entity: Views::new(&self.config).registry(&record, &counts),
            is_new: false,
        })
    }

    /// Validate entity data at `level` without storing it.
    ///
    /// Returns the normalized attributes.
    pub async fn validate_entity(
        &self,
        level: &LevelPath,
        subject: &str,
        data: &Value,
    ) -> RegistryResult<Map<String, Value>> {
        let model = self.model().await;
        let topology = self.topology_for(&model, data).await?;
        let level = match level {
            LevelPath::Registry => EntityLevel::Registry,
            LevelPath::Group(group_type) => EntityLevel::group(&model, group_type)?,
            LevelPath::Version(group_type, resource_type) => {
                EntityLevel::version(&model, group_type, resource_type)?
            }
            LevelPath::Meta(group_type, resource_type) => {
                EntityLevel::meta(&model, group_type, resource_type)?
            }
        };
        debug!("Validating entity data for {}", subject);
        Validator::new(&model, &topology).validate_entity(&level, subject, data, &EntityContext::new())
    }

    async fn load<T: DeserializeOwned>(&self, key: StorageKey, subject: &str) -> RegistryResult<Option<T>> {
        let stored = self
            .storage
            .get(key)
            .await
            .map_err(storage_failure(subject, "get"))?;
        stored.map(|value| decode(value, subject)).transpose()
    }

    async fn load_registry(&self) -> RegistryResult<RegistryRecord> {
        self.load(StorageKey::registry(), "/")
            .await?
            .ok_or_else(|| RegistryError::server_error("/", "The Registry record is missing"))
    }

    async fn list_all(&self, prefix: StoragePrefix, subject: &str) -> RegistryResult<Vec<(StorageKey, Value)>> {
        self.storage
            .list(prefix, 0, usize::MAX)
            .await
            .map_err(storage_failure(subject, "list"))
    }

    async fn count(&self, prefix: StoragePrefix, subject: &str) -> RegistryResult<usize> {
        self.storage
            .count(prefix)
            .await
            .map_err(storage_failure(subject, "count"))
    }

    async fn group_counts(&self, model: &Model) -> RegistryResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for plural in model.groups.keys() {
            let count = self.count(StoragePrefix::groups(plural), "/").await?;
            counts.insert(plural.clone(), count);
        }
        Ok(counts)
    }

    /// Index the Groups, Resources and Versions named by path-like strings
    /// anywhere in `data`.
    ///
    /// Only those entities are looked up, so the cost of a write depends on
    /// the references it carries rather than on the size of the Registry.
    async fn topology_for(&self, model: &Model, data: &Value) -> RegistryResult<TopologySnapshot> {
        let mut topology = TopologySnapshot::new();
        let mut groups_seen = BTreeSet::new();
        let mut resources_seen = BTreeSet::new();

        for candidate in reference_candidates(data) {
            let mut segments = candidate[1..].split('/');
            let (Some(group_type), Some(group_id)) = (segments.next(), segments.next()) else {
                continue;
            };
            let Some(group_model) = model.group(group_type) else {
                continue;
            };
            if group_id.is_empty() {
                continue;
            }
            let group = GroupKey::new(group_type, group_id);
            if groups_seen.insert(group.clone()) {
                let found = self
                    .storage
                    .exists(StorageKey::group(&group))
                    .await
                    .map_err(storage_failure(&candidate, "exists"))?;
                if found {
                    topology.add_group(group_type, group_id);
                }
            }
            if !topology.find_group(group_type, group_id) {
                continue;
            }

            let (Some(resource_type), Some(resource_id)) = (segments.next(), segments.next()) else {
                continue;
            };
            if group_model.resource(resource_type).is_none() || resource_id.is_empty() {
                continue;
            }
            let key = group.resource(resource_type, resource_id);
            if !resources_seen.insert(key.clone()) {
                continue;
            }
            let stored = self
                .storage
                .get(StorageKey::resource(&key))
                .await
                .map_err(storage_failure(&candidate, "get"))?;
            match stored.map(serde_json::from_value::<Resource>) {
                Some(Ok(resource)) => topology.add_resource(key, resource.versions.keys().cloned()),
                Some(Err(e)) => warn!("Skipping unreadable resource {}: {}", key.xid(), e),
                None => {}
            }
        }
        trace!(
            "Topology: {} group(s), {} resource(s) referenced",
            topology.group_count(),
            topology.resource_count()
        );
        Ok(topology)
    }

    /// Index every stored Group, Resource and Version the model knows about.
    ///
    /// Used when a model update re-validates the whole Registry.
    async fn topology(&self, model: &Model) -> RegistryResult<TopologySnapshot> {
        let mut topology = TopologySnapshot::new();
        for (group_type, group_model) in &model.groups {
            for (key, _) in self.list_all(StoragePrefix::groups(group_type), "/").await? {
                let Some(group_id) = key.id() else {
                    continue;
                };
                let group = GroupKey::new(group_type, group_id);
                topology.add_group(group_type, group_id);

                for resource_type in group_model.resources.keys() {
                    let prefix = StoragePrefix::resources(&group, resource_type);
                    for (key, value) in self.list_all(prefix, "/").await? {
                        match serde_json::from_value::<Resource>(value) {
                            Ok(resource) => topology.add_resource(
                                group.resource(resource_type, &resource.id),
                                resource.versions.keys().cloned(),
                            ),
                            Err(e) => warn!("Skipping unreadable resource {}: {}", key, e),
                        }
                    }
                }
            }
        }
        trace!(
            "Topology: {} group(s), {} resource(s)",
            topology.group_count(),
            topology.resource_count()
        );
        Ok(topology)
    }

    /// Reject a client epoch that differs from the stored one.
    fn check_epoch(
        &self,
        subject: &str,
        input: &Map<String, Value>,
        existing: u64,
        opts: &WriteOptions,
    ) -> RegistryResult<()> {
        let supplied = match input.get("epoch") {
            None | Some(Value::Null) => return Ok(()),
            Some(value) => value.as_u64().ok_or_else(|| {
                RegistryError::invalid_attribute(subject, "Attribute \"epoch\" must be a uinteger")
            })?,
        };
        if supplied == existing {
            return Ok(());
        }
        if opts.force && self.config.epoch_override {
            debug!("Ignoring stale epoch {} on {} (forced)", supplied, subject);
            return Ok(());
        }
        Err(RegistryError::mismatched_epoch(subject, supplied, existing))
    }

    /// Reject `id` when a sibling differs from it only by case.
    async fn check_sibling_case(
        &self,
        prefix: StoragePrefix,
        id: &str,
        singular: &str,
        subject: &str,
    ) -> RegistryResult<()> {
        let siblings = self.list_all(prefix, subject).await?;
        let clash = siblings
            .iter()
            .filter_map(|(key, _)| key.id())
            .find(|other| *other != id && other.eq_ignore_ascii_case(id));
        match clash {
            Some(other) => Err(case_clash(subject, singular, id, other)),
            None => Ok(()),
        }
    }
}

fn new_registry_record(config: &RegistryConfig) -> RegistryResult<RegistryRecord> {
    let model = Model::default();
    let stamp = now();
    let mut data = Map::new();
    data.insert("registryid".to_string(), Value::String(config.registry_id.clone()));
    data.insert("createdat".to_string(), Value::String(stamp.clone()));
    data.insert("modifiedat".to_string(), Value::String(stamp));

    let topology = TopologySnapshot::new();
    let attributes = Validator::new(&model, &topology).internal().validate_entity(
        &EntityLevel::Registry,
        "/",
        &Value::Object(data),
        &EntityContext::new(),
    )?;
    Ok(RegistryRecord {
        epoch: 1,
        attributes,
        model,
    })
}

fn now() -> String {
    format_timestamp(&Utc::now())
}

/// Strings in `data` that could be `xid` values: they start with `/` and
/// name at least a Group type.
fn reference_candidates(data: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut pending = vec![data];
    while let Some(value) = pending.pop() {
        match value {
            Value::String(text) if text.len() > 1 && text.starts_with('/') => {
                found.insert(text.clone());
            }
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.values()),
            _ => {}
        }
    }
    found
}

fn storage_failure<'a, E: std::fmt::Display>(
    subject: &'a str,
    action: &'static str,
) -> impl FnOnce(E) -> RegistryError + 'a {
    move |err| RegistryError::server_error(subject, format!("Storage error during {}: {}", action, err))
}

fn decode<T: DeserializeOwned>(value: Value, subject: &str) -> RegistryResult<T> {
    serde_json::from_value(value).map_err(|e| {
        RegistryError::server_error(subject, format!("Failed to deserialize stored entity: {}", e))
    })
}

fn encode<T: Serialize>(record: &T, subject: &str) -> RegistryResult<Value> {
    serde_json::to_value(record)
        .map_err(|e| RegistryError::server_error(subject, format!("Failed to serialize entity: {}", e)))
}

fn into_object(data: Value, subject: &str) -> RegistryResult<Map<String, Value>> {
    match data {
        Value::Object(obj) => Ok(obj),
        _ => Err(RegistryError::invalid_attribute(
            subject,
            format!("The data for \"{}\" must be an object", subject),
        )),
    }
}

fn has_value(data: &Map<String, Value>, name: &str) -> bool {
    data.get(name).is_some_and(|value| !value.is_null())
}

fn strip_computed(data: &mut Map<String, Value>, extra: &[String]) {
    for name in COMPUTED_ATTRIBUTES {
        data.remove(name);
    }
    for name in extra {
        data.remove(name);
    }
}

/// Combine request data with the stored attributes according to `mode`.
fn combine(
    mode: WriteMode,
    existing: Option<&Map<String, Value>>,
    input: Map<String, Value>,
) -> Map<String, Value> {
    match (mode, existing) {
        (WriteMode::Merge, Some(existing)) => {
            let mut merged = existing.clone();
            for (name, value) in input {
                if value.is_null() {
                    merged.remove(&name);
                } else {
                    merged.insert(name, value);
                }
            }
            merged
        }
        _ => input,
    }
}

/// Fill `createdat` from the stored entity (or now) and bump `modifiedat`
/// unless the client set it.
fn stamp_timestamps(
    data: &mut Map<String, Value>,
    client_modified: bool,
    created: Option<&Value>,
    now: &str,
) {
    if !has_value(data, "createdat") {
        let created = created
            .cloned()
            .unwrap_or_else(|| Value::String(now.to_string()));
        data.insert("createdat".to_string(), created);
    }
    if !client_modified {
        data.insert("modifiedat".to_string(), Value::String(now.to_string()));
    }
}

fn case_clash(subject: &str, singular: &str, id: &str, existing: &str) -> RegistryError {
    RegistryError::bad_request(
        subject,
        format!(
            "Attempting to create a {} with an id of \"{}\" when one already exists as \"{}\"",
            singular, id, existing
        ),
    )
}
