//! Group operations.

use super::views::Views;
use super::{
    Registry, WriteOptions, WriteOutcome, combine, encode, has_value, into_object, now,
    stamp_timestamps, storage_failure, strip_computed,
};
use crate::entity::{Group, GroupKey};
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{EntityLevel, GroupModel, Model};
use crate::storage::{StorageKey, StorageOp, StoragePrefix, StorageProvider};
use crate::validation::{EntityContext, Validator};
use log::{debug, info, trace};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

fn group_model<'m>(model: &'m Model, group_type: &str) -> RegistryResult<&'m GroupModel> {
    model
        .group(group_type)
        .ok_or_else(|| RegistryError::not_found(format!("/{}", group_type)))
}

impl<S: StorageProvider> Registry<S> {
    /// Create or update a Group.
    ///
    /// Without `group_id` the id comes from the body, or a UUID is
    /// generated.
    pub async fn upsert_group(
        &self,
        group_type: &str,
        group_id: Option<&str>,
        data: Value,
        opts: WriteOptions,
    ) -> RegistryResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        let group_model = group_model(&model, group_type)?;
        let mut input = into_object(data, &format!("/{}", group_type))?;

        let id_attribute = group_model.id_attribute();
        let id = match (group_id, input.get(&id_attribute)) {
            (Some(id), _) => id.to_string(),
            (None, Some(Value::String(id))) => id.clone(),
            (None, _) => Uuid::new_v4().to_string(),
        };
        let key = GroupKey::new(group_type, &id);
        let subject = key.xid();

        info!("Upserting {} '{}'", group_model.singular, subject);
        trace!("Group data: {}", Value::Object(input.clone()));

        let existing: Option<Group> = self.load(StorageKey::group(&key), &subject).await?;
        match &existing {
            Some(group) => self.check_epoch(&subject, &input, group.epoch, &opts)?,
            None => {
                self.check_sibling_case(
                    StoragePrefix::groups(group_type),
                    &id,
                    &group_model.singular,
                    &subject,
                )
                .await?
            }
        }

        let extra: Vec<String> = group_model
            .resources
            .keys()
            .flat_map(|plural| [format!("{}url", plural), format!("{}count", plural)])
            .collect();
        strip_computed(&mut input, &extra);

        let stored = existing.as_ref().map(|group| &group.attributes);
        let client_modified = has_value(&input, "modifiedat");
        let mut merged = combine(opts.mode, stored, input);
        merged
            .entry(id_attribute.clone())
            .or_insert_with(|| Value::String(id.clone()));
        stamp_timestamps(
            &mut merged,
            client_modified,
            stored.and_then(|attrs| attrs.get("createdat")),
            &now(),
        );

        let data = Value::Object(merged);
        let mut topology = self.topology_for(&model, &data).await?;
        topology.add_group(group_type, &id);
        let ctx = EntityContext::new()
            .with_existing(stored)
            .expect_id(&id_attribute, &id);
        let attributes = Validator::new(&model, &topology).validate_entity(
            &EntityLevel::Group(group_model),
            &subject,
            &data,
            &ctx,
        )?;

        let group = Group {
            id: id.clone(),
            epoch: existing.as_ref().map_or(1, |group| group.epoch + 1),
            attributes,
        };
        self.storage
            .put(StorageKey::group(&key), encode(&group, &subject)?)
            .await
            .map_err(storage_failure(&subject, "upsert"))?;

        let is_new = existing.is_none();
        info!(
            "{} {} '{}' at epoch {}",
            if is_new { "Created" } else { "Updated" },
            group_model.singular,
            subject,
            group.epoch
        );

        let entity = self.group_view(group_model, &key, &group).await?;
        Ok(WriteOutcome { entity, is_new })
    }

    pub async fn get_group(&self, group_type: &str, group_id: &str) -> RegistryResult<Value> {
        let model = self.model().await;
        let group_model = group_model(&model, group_type)?;
        let key = GroupKey::new(group_type, group_id);
        let subject = key.xid();
        debug!("Getting {} '{}'", group_model.singular, subject);

        let group: Group = self
            .load(StorageKey::group(&key), &subject)
            .await?
            .ok_or_else(|| RegistryError::not_found(&subject))?;
        self.group_view(group_model, &key, &group).await
    }

    /// All Groups of `group_type`, ordered by id.
    pub async fn list_groups(&self, group_type: &str) -> RegistryResult<Vec<Value>> {
        let model = self.model().await;
        let group_model = group_model(&model, group_type)?;
        let subject = format!("/{}", group_type);
        debug!("Listing {}", subject);

        let mut views = Vec::new();
        for (_, value) in self.list_all(StoragePrefix::groups(group_type), &subject).await? {
            let group: Group = super::decode(value, &subject)?;
            let key = GroupKey::new(group_type, &group.id);
            views.push(self.group_view(group_model, &key, &group).await?);
        }
        Ok(views)
    }

    /// Delete a Group and everything inside it.
    pub async fn delete_group(&self, group_type: &str, group_id: &str, epoch: Option<u64>) -> RegistryResult<()> {
        let _guard = self.write_lock.lock().await;
        let model = self.model().await;
        group_model(&model, group_type)?;
        let key = GroupKey::new(group_type, group_id);
        let subject = key.xid();

        let group: Group = self
            .load(StorageKey::group(&key), &subject)
            .await?
            .ok_or_else(|| RegistryError::not_found(&subject))?;
        if let Some(epoch) = epoch {
            if epoch != group.epoch {
                return Err(RegistryError::mismatched_epoch(&subject, epoch, group.epoch));
            }
        }

        self.storage
            .commit(vec![StorageOp::DeleteTree(StorageKey::group(&key))])
            .await
            .map_err(storage_failure(&subject, "delete"))?;
        info!("Deleted group '{}'", subject);
        Ok(())
    }

    async fn group_view(&self, group_model: &GroupModel, key: &GroupKey, group: &Group) -> RegistryResult<Value> {
        let subject = key.xid();
        let mut counts = BTreeMap::new();
        for plural in group_model.resources.keys() {
            let count = self.count(StoragePrefix::resources(key, plural), &subject).await?;
            counts.insert(plural.clone(), count);
        }
        Ok(Views::new(&self.config).group(key, group, &counts))
    }
}
