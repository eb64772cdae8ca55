//! Resource, Version and Meta operations.
//!
//! A Resource is stored as one record holding its Meta and every Version,
//! so a write, the default-version decision it triggers and any evictions
//! land in storage together.

use super::views::Views;
use super::{
    Registry, WriteMode, WriteOptions, WriteOutcome, case_clash, combine, decode, encode,
    has_value, into_object, now, stamp_timestamps, storage_failure, strip_computed,
};
use crate::entity::{GroupKey, Meta, Resource, ResourceKey, Version};
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{EntityLevel, GroupModel, Model, ResourceModel};
use crate::storage::{StorageKey, StorageOp, StoragePrefix, StorageProvider};
use crate::topology::TopologySnapshot;
use crate::validation::{EntityContext, Validator, parse_timestamp};
use crate::versioning::{
    Ancestor, DefaultHint, DefaultPointer, DefaultVersionResolver, Resolution, VersionChange,
    check_ancestors,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{debug, info, trace};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Resource-level keys that are navigation, not attributes.
const RESOURCE_COMPUTED: [&str; 5] = ["metaurl", "versionsurl", "versionscount", "meta", "versions"];

/// Which Version a write lands on.
enum VersionTarget {
    /// Named in the request path
    Path(String),
    /// The body's `versionid`, else the current default, else a new id
    Default,
    /// The body's `versionid`, else a new id
    New,
}

/// Which view a write responds with.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ResponseView {
    Resource,
    Version,
}

fn resource_types<'m>(model: &'m Model, key: &ResourceKey) -> RegistryResult<(&'m GroupModel, &'m ResourceModel)> {
    let group = model
        .group(key.group_type())
        .ok_or_else(|| RegistryError::not_found(format!("/{}", key.group_type())))?;
    let resource = group.resource(&key.resource_type).ok_or_else(|| {
        RegistryError::not_found(format!("{}/{}", key.group.xid(), key.resource_type))
    })?;
    Ok((group, resource))
}

impl<S: StorageProvider> Registry<S> {
    /// Create or update a Resource through its default Version.
    ///
    /// A missing Resource is created together with its first Version.
    pub async fn upsert_resource(
        &self,
        key: &ResourceKey,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        info!("Upserting resource '{}'", key);
        self.write_version(key, VersionTarget::Default, data, &opts, ResponseView::Resource)
            .await
    }

    /// Create a Resource whose id comes from the body, or a generated UUID.
    pub async fn create_resource(
        &self,
        group: &GroupKey,
        resource_type: &str,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let model = self.model().await;
        let singular = model
            .resource(&group.group_type, resource_type)
            .map(|resource| resource.id_attribute())
            .ok_or_else(|| RegistryError::not_found(format!("{}/{}", group.xid(), resource_type)))?;
        let id = match data.get(&singular) {
            Some(Value::String(id)) => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };
        let key = group.resource(resource_type, id);

        let _guard = self.write_lock.lock().await;
        info!("Creating resource '{}'", key);
        self.write_version(&key, VersionTarget::Default, data, &opts, ResponseView::Resource)
            .await
    }

    /// Add a Version; its id comes from the body or is generated.
    pub async fn create_version(
        &self,
        key: &ResourceKey,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        info!("Creating version of '{}'", key);
        self.write_version(key, VersionTarget::New, data, &opts, ResponseView::Version)
            .await
    }

    /// Create or update the Version `version_id`.
    pub async fn upsert_version(
        &self,
        key: &ResourceKey,
        version_id: &str,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        info!("Upserting version '{}'", key.version_xid(version_id));
        self.write_version(
            key,
            VersionTarget::Path(version_id.to_string()),
            data,
            &opts,
            ResponseView::Version,
        )
        .await
    }

    /// Shared write path. The caller holds the write lock.
    async fn write_version(
        &self,
        key: &ResourceKey,
        target: VersionTarget,
        data: Value,
        opts: &WriteOptions,
        response: ResponseView,
    ) -> RegistryResult<WriteOutcome> {
        let model = self.model().await;
        let (group_model, resource_model) = resource_types(&model, key)?;
        let resource_subject = key.xid();
        let mut input = into_object(data, &resource_subject)?;
        trace!("Version data: {}", Value::Object(input.clone()));

        let group_exists = self
            .storage
            .exists(StorageKey::group(&key.group))
            .await
            .map_err(storage_failure(&resource_subject, "get"))?;
        if !group_exists {
            return Err(RegistryError::not_found(key.group.xid()));
        }

        let existing: Option<Resource> = self
            .load(StorageKey::resource(key), &resource_subject)
            .await?;
        let is_new_resource = existing.is_none();
        let mut resource = match existing {
            Some(resource) if resource.meta.readonly => {
                return Err(RegistryError::readonly(resource_subject));
            }
            Some(resource) => resource,
            None => {
                self.check_sibling_case(
                    StoragePrefix::resources(&key.group, &key.resource_type),
                    &key.resource_id,
                    &resource_model.singular,
                    &resource_subject,
                )
                .await?;
                Resource::new(&key.resource_id)
            }
        };

        let body_version = match input.get("versionid") {
            Some(Value::String(id)) => Some(id.clone()),
            _ => None,
        };
        let (version_id, client_chosen) = match (target, body_version) {
            (VersionTarget::Path(id), _) => (id, true),
            (_, Some(id)) => (id, true),
            (VersionTarget::Default, None) => match resource.default_version() {
                Some(version) => (version.id.clone(), false),
                None => (resource.next_version_id(), false),
            },
            (VersionTarget::New, None) => (resource.next_version_id(), false),
        };
        let subject = key.version_xid(&version_id);

        let prior = resource.versions.get(&version_id).cloned();
        match &prior {
            Some(version) => self.check_epoch(&subject, &input, version.epoch, opts)?,
            None => {
                if client_chosen && !resource_model.setversionid {
                    return Err(RegistryError::bad_request(
                        &subject,
                        format!(
                            "Resource \"{}\" doesn't allow \"versionid\" to be set",
                            resource_model.plural
                        ),
                    ));
                }
                if let Some(other) = resource.version_ignoring_case(&version_id) {
                    return Err(case_clash(&subject, "version", &version_id, &other.id));
                }
            }
        }

        let extra: Vec<String> = RESOURCE_COMPUTED.iter().map(|name| name.to_string()).collect();
        strip_computed(&mut input, &extra);

        let base64_key = format!("{}base64", resource_model.singular);
        let clear_document = matches!(input.get(&base64_key), Some(Value::Null));
        let client_modified = has_value(&input, "modifiedat");
        let prior_attributes = prior.as_ref().map(Version::full_attributes);
        let mut merged = combine(opts.mode, prior_attributes.as_ref(), input);

        merged
            .entry(resource_model.id_attribute())
            .or_insert_with(|| Value::String(key.resource_id.clone()));
        merged
            .entry("versionid")
            .or_insert_with(|| Value::String(version_id.clone()));
        if !has_value(&merged, "ancestor") {
            // New Versions derive from the current default.
            let ancestor = match (&prior, resource.default_version()) {
                (Some(version), _) => version.ancestor.to_attribute(&version_id),
                (None, Some(default)) => default.id.clone(),
                (None, None) => version_id.clone(),
            };
            merged.insert("ancestor".to_string(), Value::String(ancestor));
        }
        let stamp = now();
        stamp_timestamps(
            &mut merged,
            client_modified,
            prior_attributes.as_ref().and_then(|attrs| attrs.get("createdat")),
            &stamp,
        );

        let data = Value::Object(merged);
        let mut topology = self.topology_for(&model, &data).await?;
        topology.add_version(key, &version_id);
        let ctx = EntityContext::new()
            .with_existing(prior_attributes.as_ref())
            .expect_id(resource_model.id_attribute(), &key.resource_id)
            .expect_id("versionid", &version_id);
        let mut attributes = Validator::new(&model, &topology).validate_entity(
            &EntityLevel::Version(group_model, resource_model),
            &subject,
            &data,
            &ctx,
        )?;

        let ancestor = match attributes.remove("ancestor") {
            Some(Value::String(parent)) => Ancestor::from_attribute(&version_id, &parent),
            _ => Ancestor::Root,
        };
        let document = match attributes.remove(&base64_key) {
            Some(Value::String(encoded)) => Some(STANDARD.decode(encoded.as_bytes()).map_err(|_| {
                RegistryError::invalid_attribute(
                    &subject,
                    format!("Attribute \"{}\" is not valid base64", base64_key),
                )
            })?),
            _ if clear_document || opts.mode == WriteMode::Replace => None,
            _ => prior.as_ref().and_then(|version| version.document.clone()),
        };
        let created_at = attributes
            .get("createdat")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .ok_or_else(|| RegistryError::server_error(&subject, "Version has no valid \"createdat\""))?;

        let version = Version {
            id: version_id.clone(),
            epoch: prior.as_ref().map_or(1, |version| version.epoch + 1),
            ancestor,
            created_at,
            attributes,
            document,
        };
        resource.versions.insert(version_id.clone(), version);
        check_ancestors(&resource.ancestors(), &subject)?;

        let resolver = DefaultVersionResolver::new(resource_model.policy(), &resource_subject);
        let resolution = resolver.resolve(
            &resource.meta.pointer,
            &resource.stamps(),
            &VersionChange::Upserted {
                processed: vec![version_id.clone()],
                hint: opts.set_default_version.clone(),
            },
        )?;
        let level = EntityLevel::Meta(group_model, resource_model);
        self.apply_resolution(&model, &level, key, &mut resource, &resolution, &stamp)?;

        self.storage
            .put(StorageKey::resource(key), encode(&resource, &resource_subject)?)
            .await
            .map_err(storage_failure(&resource_subject, "upsert"))?;

        info!(
            "{} version '{}' (default '{}', {} version(s) retained)",
            if prior.is_none() { "Created" } else { "Updated" },
            subject,
            resource.meta.default_version_id,
            resource.versions.len()
        );

        let views = Views::new(&self.config);
        let outcome = match (response, resource.versions.get(&version_id)) {
            (ResponseView::Version, Some(version)) => WriteOutcome {
                entity: views.version(key, resource_model, &resource, version),
                is_new: prior.is_none(),
            },
            _ => WriteOutcome {
                entity: views.resource(key, resource_model, &resource),
                is_new: is_new_resource,
            },
        };
        Ok(outcome)
    }

    /// Apply evictions and the new default pointer to `resource`.
    ///
    /// The Meta is created on the Resource's first write.
    fn apply_resolution(
        &self,
        model: &Model,
        meta_level: &EntityLevel<'_>,
        key: &ResourceKey,
        resource: &mut Resource,
        resolution: &Resolution,
        stamp: &str,
    ) -> RegistryResult<()> {
        if !resolution.evicted.is_empty() {
            debug!(
                "Evicting {} version(s) from '{}': {}",
                resolution.evicted.len(),
                key,
                resolution.evicted.join(",")
            );
            let rerooted = resource.remove_versions(&resolution.evicted);
            if !rerooted.is_empty() {
                debug!("Re-rooted version(s) {}", rerooted.join(","));
            }
        }

        let default_id = resolution
            .default_version_id
            .clone()
            .ok_or_else(|| RegistryError::server_error(key.xid(), "No default Version remains"))?;

        if resource.meta.epoch == 0 {
            resource.meta = create_meta(model, meta_level, key, &default_id, &resolution.pointer, stamp)?;
        } else if resource.meta.pointer != resolution.pointer
            || resource.meta.default_version_id != default_id
        {
            debug!(
                "Default of '{}' moves to '{}' ({})",
                key,
                default_id,
                if resolution.sticky() { "sticky" } else { "floating" }
            );
            resource.meta.pointer = resolution.pointer.clone();
            resource.meta.default_version_id = default_id;
            resource.meta.epoch += 1;
            resource
                .meta
                .attributes
                .insert("modifiedat".to_string(), Value::String(stamp.to_string()));
        }
        Ok(())
    }

    async fn load_resource(&self, key: &ResourceKey) -> RegistryResult<Resource> {
        let subject = key.xid();
        self.load(StorageKey::resource(key), &subject)
            .await?
            .ok_or_else(|| RegistryError::not_found(subject))
    }

    async fn store_resource(&self, key: &ResourceKey, resource: &Resource) -> RegistryResult<()> {
        let subject = key.xid();
        self.storage
            .put(StorageKey::resource(key), encode(resource, &subject)?)
            .await
            .map_err(storage_failure(&subject, "update"))?;
        Ok(())
    }

    /// The Resource view: its default Version plus navigation links.
    pub async fn get_resource(&self, key: &ResourceKey) -> RegistryResult<Value> {
        let model = self.model().await;
        let (_, resource_model) = resource_types(&model, key)?;
        debug!("Getting resource '{}'", key);
        let resource = self.load_resource(key).await?;
        Ok(Views::new(&self.config).resource(key, resource_model, &resource))
    }

    /// All Resources of `resource_type` in `group`, ordered by id.
    pub async fn list_resources(&self, group: &GroupKey, resource_type: &str) -> RegistryResult<Vec<Value>> {
        let model = self.model().await;
        let subject = format!("{}/{}", group.xid(), resource_type);
        let resource_model = model
            .resource(&group.group_type, resource_type)
            .ok_or_else(|| RegistryError::not_found(&subject))?;
        debug!("Listing {}", subject);

        let views = Views::new(&self.config);
        let mut listed = Vec::new();
        for (_, value) in self
            .list_all(StoragePrefix::resources(group, resource_type), &subject)
            .await?
        {
            let resource: Resource = decode(value, &subject)?;
            let key = group.resource(resource_type, &resource.id);
            listed.push(views.resource(&key, resource_model, &resource));
        }
        Ok(listed)
    }

    /// Delete a Resource with all of its Versions.
    ///
    /// `epoch`, when given, must match the Resource's (i.e. its default
    /// Version's) epoch.
    pub async fn delete_resource(&self, key: &ResourceKey, epoch: Option<u64>) -> RegistryResult<()> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        resource_types(&model, key)?;
        let subject = key.xid();

        let resource = self.load_resource(key).await?;
        if resource.meta.readonly {
            return Err(RegistryError::readonly(subject));
        }
        if let (Some(epoch), Some(default)) = (epoch, resource.default_version()) {
            if epoch != default.epoch {
                return Err(RegistryError::mismatched_epoch(&subject, epoch, default.epoch));
            }
        }

        self.storage
            .commit(vec![StorageOp::Delete(StorageKey::resource(key))])
            .await
            .map_err(storage_failure(&subject, "delete"))?;
        info!("Deleted resource '{}'", subject);
        Ok(())
    }

    pub async fn get_version(&self, key: &ResourceKey, version_id: &str) -> RegistryResult<Value> {
        let model = self.model().await;
        let (_, resource_model) = resource_types(&model, key)?;
        debug!("Getting version '{}'", key.version_xid(version_id));
        let resource = self.load_resource(key).await?;
        let version = resource
            .versions
            .get(version_id)
            .ok_or_else(|| RegistryError::not_found(key.version_xid(version_id)))?;
        Ok(Views::new(&self.config).version(key, resource_model, &resource, version))
    }

    /// All Versions of a Resource, ordered by id.
    pub async fn list_versions(&self, key: &ResourceKey) -> RegistryResult<Vec<Value>> {
        let model = self.model().await;
        let (_, resource_model) = resource_types(&model, key)?;
        debug!("Listing versions of '{}'", key);
        let resource = self.load_resource(key).await?;
        let views = Views::new(&self.config);
        Ok(resource
            .versions
            .values()
            .map(|version| views.version(key, resource_model, &resource, version))
            .collect())
    }

    /// Delete one Version, optionally naming the next default.
    ///
    /// Returns `true` when the last Version went and the Resource with it.
    pub async fn delete_version(
        &self,
        key: &ResourceKey,
        version_id: &str,
        next_default: Option<&str>,
        epoch: Option<u64>,
    ) -> RegistryResult<bool> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        let (group_model, resource_model) = resource_types(&model, key)?;
        let resource_subject = key.xid();
        let subject = key.version_xid(version_id);

        let mut resource = self.load_resource(key).await?;
        if resource.meta.readonly {
            return Err(RegistryError::readonly(resource_subject));
        }
        let version = resource
            .versions
            .get(version_id)
            .ok_or_else(|| RegistryError::not_found(&subject))?;
        if let Some(epoch) = epoch {
            if epoch != version.epoch {
                return Err(RegistryError::mismatched_epoch(&subject, epoch, version.epoch));
            }
        }

        let resolver = DefaultVersionResolver::new(resource_model.policy(), &resource_subject);
        let resolution = resolver.resolve(
            &resource.meta.pointer,
            &resource.stamps(),
            &VersionChange::Deleted {
                deleted: vec![version_id.to_string()],
                next_default: next_default.map(str::to_string),
            },
        )?;

        if resolution.resource_deleted() {
            self.storage
                .commit(vec![StorageOp::Delete(StorageKey::resource(key))])
                .await
                .map_err(storage_failure(&resource_subject, "delete"))?;
            info!("Deleted last version '{}', resource removed", subject);
            return Ok(true);
        }

        let rerooted = resource.remove_versions(&[version_id.to_string()]);
        if !rerooted.is_empty() {
            debug!("Re-rooted version(s) {}", rerooted.join(","));
        }
        let level = EntityLevel::Meta(group_model, resource_model);
        self.apply_resolution(&model, &level, key, &mut resource, &resolution, &now())?;
        self.store_resource(key, &resource).await?;
        info!(
            "Deleted version '{}', default is now '{}'",
            subject, resource.meta.default_version_id
        );
        Ok(false)
    }

    pub async fn get_meta(&self, key: &ResourceKey) -> RegistryResult<Value> {
        let model = self.model().await;
        resource_types(&model, key)?;
        debug!("Getting meta of '{}'", key);
        let resource = self.load_resource(key).await?;
        Ok(Views::new(&self.config).meta(key, &resource))
    }

    /// Update a Resource's Meta: default pointer, compatibility,
    /// deprecation and extensions.
    ///
    /// `defaultversionsticky: false` (or null) unsticks; a
    /// `defaultversionid` pins to that Version; `defaultversionsticky:
    /// true` alone pins the current default. `opts.set_default_version`
    /// takes precedence over both.
    pub async fn update_meta(
        &self,
        key: &ResourceKey,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        let (group_model, resource_model) = resource_types(&model, key)?;
        let subject = key.meta_xid();
        info!("Updating meta '{}'", subject);
        trace!("Meta data: {}", data);

        let mut resource = self.load_resource(key).await?;
        if resource.meta.readonly {
            return Err(RegistryError::readonly(key.xid()));
        }
        let mut input = into_object(data, &subject)?;
        self.check_epoch(&subject, &input, resource.meta.epoch, &opts)?;
        strip_computed(&mut input, &["defaultversionurl".to_string()]);

        let hint = match opts.set_default_version.clone() {
            Some(hint) => Some(hint),
            None => meta_hint(&input, &resource.meta, &subject)?,
        };
        let (pointer, default_id) = match hint {
            Some(hint) => {
                let resolver = DefaultVersionResolver::new(resource_model.policy(), &subject);
                let resolution = resolver.resolve(
                    &resource.meta.pointer,
                    &resource.stamps(),
                    &VersionChange::Hint(hint),
                )?;
                let default_id = resolution
                    .default_version_id
                    .ok_or_else(|| RegistryError::server_error(&subject, "No default Version remains"))?;
                (resolution.pointer, default_id)
            }
            None => (
                resource.meta.pointer.clone(),
                resource.meta.default_version_id.clone(),
            ),
        };

        let stored = resource.meta.full_attributes();
        let client_modified = has_value(&input, "modifiedat");
        let mut merged = combine(opts.mode, Some(&stored), input);
        merged.insert("defaultversionid".to_string(), Value::String(default_id.clone()));
        merged.insert(
            "defaultversionsticky".to_string(),
            Value::Bool(pointer.is_sticky()),
        );
        merged
            .entry(resource_model.id_attribute())
            .or_insert_with(|| Value::String(key.resource_id.clone()));
        stamp_timestamps(&mut merged, client_modified, stored.get("createdat"), &now());

        let data = Value::Object(merged);
        let topology = self.topology_for(&model, &data).await?;
        let ctx = EntityContext::new()
            .with_existing(Some(&stored))
            .expect_id(resource_model.id_attribute(), &key.resource_id);
        let validated = Validator::new(&model, &topology).validate_entity(
            &EntityLevel::Meta(group_model, resource_model),
            &subject,
            &data,
            &ctx,
        )?;

        resource.meta.pointer = pointer;
        resource.meta.default_version_id = default_id;
        resource.meta.epoch += 1;
        resource.meta.absorb(validated);
        self.store_resource(key, &resource).await?;
        info!(
            "Meta '{}' updated, default '{}' ({})",
            subject,
            resource.meta.default_version_id,
            if resource.meta.pointer.is_sticky() { "sticky" } else { "floating" }
        );

        Ok(WriteOutcome {
            entity: Views::new(&self.config).meta(key, &resource),
            is_new: false,
        })
    }

    /// Move the default pointer without touching any Version.
    pub async fn set_default_version(&self, key: &ResourceKey, hint: DefaultHint) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        let (group_model, resource_model) = resource_types(&model, key)?;
        let subject = key.xid();
        info!("Setting default version of '{}' ({:?})", subject, hint);

        let mut resource = self.load_resource(key).await?;
        if resource.meta.readonly {
            return Err(RegistryError::readonly(subject));
        }
        let resolver = DefaultVersionResolver::new(resource_model.policy(), &subject);
        let resolution = resolver.resolve(
            &resource.meta.pointer,
            &resource.stamps(),
            &VersionChange::Hint(hint),
        )?;
        let level = EntityLevel::Meta(group_model, resource_model);
        self.apply_resolution(&model, &level, key, &mut resource, &resolution, &now())?;
        self.store_resource(key, &resource).await?;

        Ok(WriteOutcome {
            entity: Views::new(&self.config).meta(key, &resource),
            is_new: false,
        })
    }

    /// Mark a Resource read-only, or writable again. This is a system
    /// write and is not subject to the read-only check itself.
    pub async fn set_resource_readonly(&self, key: &ResourceKey, readonly: bool) -> RegistryResult<Value> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        resource_types(&model, key)?;

        let mut resource = self.load_resource(key).await?;
        if resource.meta.readonly != readonly {
            resource.meta.readonly = readonly;
            resource.meta.epoch += 1;
            resource
                .meta
                .attributes
                .insert("modifiedat".to_string(), Value::String(now()));
            self.store_resource(key, &resource).await?;
        }
        info!("Resource '{}' readonly={}", key, readonly);
        Ok(Views::new(&self.config).meta(key, &resource))
    }
}

/// The Meta a Resource gets on its first write, filled with defaults.
fn create_meta(
    model: &Model,
    meta_level: &EntityLevel<'_>,
    key: &ResourceKey,
    default_id: &str,
    pointer: &DefaultPointer,
    stamp: &str,
) -> RegistryResult<Meta> {
    let id_attribute = match meta_level {
        EntityLevel::Meta(_, resource) => resource.id_attribute(),
        _ => return Err(RegistryError::server_error(key.meta_xid(), "Not a Meta level")),
    };
    let mut data = Map::new();
    data.insert(id_attribute, Value::String(key.resource_id.clone()));
    data.insert("createdat".to_string(), Value::String(stamp.to_string()));
    data.insert("modifiedat".to_string(), Value::String(stamp.to_string()));
    data.insert("defaultversionid".to_string(), Value::String(default_id.to_string()));
    data.insert(
        "defaultversionsticky".to_string(),
        Value::Bool(pointer.is_sticky()),
    );
    data.insert("readonly".to_string(), Value::Bool(false));

    let topology = TopologySnapshot::new();
    let validated = Validator::new(model, &topology).internal().validate_entity(
        meta_level,
        &key.meta_xid(),
        &Value::Object(data),
        &EntityContext::new(),
    )?;

    let mut meta = Meta {
        epoch: 1,
        pointer: pointer.clone(),
        default_version_id: default_id.to_string(),
        readonly: false,
        attributes: Map::new(),
    };
    meta.absorb(validated);
    Ok(meta)
}

/// Derive a default-pointer change from Meta request data.
fn meta_hint(input: &Map<String, Value>, meta: &Meta, subject: &str) -> RegistryResult<Option<DefaultHint>> {
    let sticky = match input.get("defaultversionsticky") {
        None => None,
        Some(Value::Null) => Some(false),
        Some(Value::Bool(sticky)) => Some(*sticky),
        Some(_) => {
            return Err(RegistryError::invalid_attribute(
                subject,
                "Attribute \"defaultversionsticky\" must be a boolean",
            ));
        }
    };
    let default_id = match input.get("defaultversionid") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => {
            return Err(RegistryError::invalid_attribute(
                subject,
                "Attribute \"defaultversionid\" must be a string",
            ));
        }
    };

    let hint = match (sticky, default_id) {
        (Some(false), _) => Some(DefaultHint::Unstick),
        (_, Some(id)) => Some(DefaultHint::Set(id)),
        (Some(true), None) => Some(DefaultHint::Set(meta.default_version_id.clone())),
        (None, None) if matches!(input.get("defaultversionid"), Some(Value::Null)) => {
            Some(DefaultHint::Unstick)
        }
        (None, None) => None,
    };
    Ok(hint)
}
