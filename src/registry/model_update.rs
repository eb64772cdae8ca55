//! Installing a new model.
//!
//! Every stored entity whose type survives is re-validated against the new
//! model (and rewritten with its normalized attributes); entities whose
//! Group or Resource type was removed are deleted. All of it commits in one
//! batch, so a rejected model leaves storage untouched.

use super::{Registry, encode, now, storage_failure};
use crate::entity::{Group, GroupKey, Resource};
use crate::error::RegistryResult;
use crate::schema::{EntityLevel, GroupModel, Model};
use crate::storage::{StorageKey, StorageOp, StoragePrefix, StorageProvider};
use crate::validation::{EntityContext, Validator};
use log::{debug, info, trace, warn};
use serde_json::Value;
use std::sync::Arc;

impl<S: StorageProvider> Registry<S> {
    /// Verify and install a model document.
    ///
    /// Returns the installed snapshot.
    pub async fn update_model(&self, doc: Value) -> RegistryResult<Arc<Model>> {
        let _guard = self.write_lock.lock().await;
        info!("Updating model");
        trace!("Model document: {}", doc);

        let mut model = Model::from_json(&doc)?;
        let current = self.model().await;
        model.set_generation(current.generation() + 1);

        let topology = self.topology(&model).await?;
        let validator = Validator::new(&model, &topology).internal();
        let mut batch = Vec::new();

        let mut record = self.load_registry().await?;
        record.attributes = validator.validate_entity(
            &EntityLevel::Registry,
            "/",
            &Value::Object(record.attributes.clone()),
            &EntityContext::new(),
        )?;

        for (group_type, old_group) in &current.groups {
            let stored = self.list_all(StoragePrefix::groups(group_type), "/").await?;
            let Some(new_group) = model.group(group_type) else {
                debug!("Group type '{}' removed, deleting {} group(s)", group_type, stored.len());
                batch.extend(stored.into_iter().map(|(key, _)| StorageOp::DeleteTree(key)));
                continue;
            };

            for (key, value) in stored {
                let mut group: Group = match serde_json::from_value(value) {
                    Ok(group) => group,
                    Err(e) => {
                        warn!("Skipping unreadable group {} during model update: {}", key, e);
                        continue;
                    }
                };
                let group_key = GroupKey::new(group_type, &group.id);
                group.attributes = validator.validate_entity(
                    &EntityLevel::Group(new_group),
                    &group_key.xid(),
                    &Value::Object(group.attributes.clone()),
                    &EntityContext::new(),
                )?;
                batch.push(StorageOp::Put(key, encode(&group, &group_key.xid())?));

                self.revalidate_resources(&validator, old_group, new_group, &group_key, &mut batch)
                    .await?;
            }
        }

        record.model = model.clone();
        record.epoch += 1;
        record
            .attributes
            .insert("modifiedat".to_string(), Value::String(now()));
        batch.push(StorageOp::Put(StorageKey::registry(), encode(&record, "/")?));

        let operations = batch.len();
        self.storage
            .commit(batch)
            .await
            .map_err(storage_failure("/model", "model update"))?;

        let model = Arc::new(model);
        *self.model.write().await = model.clone();
        info!(
            "Installed model generation {} with {} group type(s) ({} record(s) rewritten)",
            model.generation(),
            model.groups.len(),
            operations
        );
        Ok(model)
    }

    async fn revalidate_resources(
        &self,
        validator: &Validator<'_>,
        old_group: &GroupModel,
        new_group: &GroupModel,
        group_key: &GroupKey,
        batch: &mut Vec<StorageOp>,
    ) -> RegistryResult<()> {
        for resource_type in old_group.resources.keys() {
            let prefix = StoragePrefix::resources(group_key, resource_type);
            let stored = self.list_all(prefix, &group_key.xid()).await?;
            let Some(new_resource) = new_group.resource(resource_type) else {
                debug!(
                    "Resource type '{}' removed from '{}', deleting {} resource(s)",
                    resource_type,
                    group_key,
                    stored.len()
                );
                batch.extend(stored.into_iter().map(|(key, _)| StorageOp::DeleteTree(key)));
                continue;
            };

            for (key, value) in stored {
                let mut resource: Resource = match serde_json::from_value(value) {
                    Ok(resource) => resource,
                    Err(e) => {
                        warn!("Skipping unreadable resource {} during model update: {}", key, e);
                        continue;
                    }
                };
                let resource_key = group_key.resource(resource_type, &resource.id);
                let version_level = EntityLevel::Version(new_group, new_resource);
                for version in resource.versions.values_mut() {
                    let mut attributes = validator.validate_entity(
                        &version_level,
                        &resource_key.version_xid(&version.id),
                        &Value::Object(version.full_attributes()),
                        &EntityContext::new(),
                    )?;
                    attributes.remove("ancestor");
                    version.attributes = attributes;
                }

                let validated = validator.validate_entity(
                    &EntityLevel::Meta(new_group, new_resource),
                    &resource_key.meta_xid(),
                    &Value::Object(resource.meta.full_attributes()),
                    &EntityContext::new(),
                )?;
                resource.meta.absorb(validated);
                batch.push(StorageOp::Put(key, encode(&resource, &resource_key.xid())?));
            }
        }
        Ok(())
    }
}
