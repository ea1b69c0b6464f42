//! Persistence contract for NLU records, plus a process-local implementation.

use std::collections::HashMap;

use {
    async_trait::async_trait,
    dashmap::{DashMap, mapref::entry::Entry},
};

use crate::{
    error::{Context, Error, Result},
    model::{NluEntity, NluValue, PopulatedValue},
    sync::NluEvent,
};

#[async_trait]
pub trait NluStore: Send + Sync {
    async fn set_entity_foreign_id(&self, entity_id: &str, foreign_id: &str) -> Result<()>;
    async fn set_value_foreign_id(&self, value_id: &str, foreign_id: &str) -> Result<()>;
    async fn find_entity(&self, entity_id: &str) -> Result<Option<NluEntity>>;
    async fn find_value(&self, value_id: &str) -> Result<Option<NluValue>>;
    async fn find_value_populated(&self, value_id: &str) -> Result<Option<PopulatedValue>>;
    /// Every known entity, keyed by name.
    async fn entity_map(&self) -> Result<HashMap<String, NluEntity>>;
}

#[derive(Default)]
pub struct InMemoryNluStore {
    entities: DashMap<String, NluEntity>,
    values: DashMap<String, NluValue>,
}

impl InMemoryNluStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_entity(&self, entity: NluEntity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn put_value(&self, value: NluValue) {
        self.values.insert(value.id.clone(), value);
    }

    pub fn remove_value(&self, value_id: &str) -> Option<NluValue> {
        self.values.remove(value_id).map(|(_, v)| v)
    }

    pub fn remove_entity(&self, entity_id: &str) -> Option<NluEntity> {
        self.entities.remove(entity_id).map(|(_, e)| e)
    }

    /// Mirror a create or update locally before it is synced. A record
    /// arriving without a foreign id keeps the one already stored.
    pub fn record(&self, event: &NluEvent) {
        match event {
            NluEvent::EntityCreated(entity) | NluEvent::EntityUpdated(entity) => {
                upsert_keeping_fid(&self.entities, &entity.id, entity, |e| &mut e.foreign_id);
            },
            NluEvent::ValueCreated(value) | NluEvent::ValueUpdated(value) => {
                upsert_keeping_fid(&self.values, &value.id, value, |v| &mut v.foreign_id);
            },
            NluEvent::EntityDeleted(_) | NluEvent::ValueDeleted(_) => {},
        }
    }

    /// Drop a deleted record once its sync attempt is over.
    pub fn forget(&self, event: &NluEvent) {
        match event {
            NluEvent::EntityDeleted(entity) => {
                self.remove_entity(&entity.id);
                self.values.retain(|_, v| v.entity_id != entity.id);
            },
            NluEvent::ValueDeleted(value) => {
                self.remove_value(&value.id);
            },
            _ => {},
        }
    }

    pub fn entity(&self, entity_id: &str) -> Option<NluEntity> {
        self.entities.get(entity_id).map(|e| e.clone())
    }

    pub fn value(&self, value_id: &str) -> Option<NluValue> {
        self.values.get(value_id).map(|v| v.clone())
    }
}

/// Insert `record`, keeping a foreign id already written back by the sync
/// worker when the incoming copy has none. Runs under the entry's shard lock,
/// so a concurrent write-back is never overwritten.
fn upsert_keeping_fid<T: Clone>(
    map: &DashMap<String, T>,
    id: &str,
    record: &T,
    fid: fn(&mut T) -> &mut Option<String>,
) {
    let mut record = record.clone();
    match map.entry(id.to_string()) {
        Entry::Occupied(mut stored) => {
            if fid(&mut record).is_none() {
                *fid(&mut record) = fid(stored.get_mut()).clone();
            }
            stored.insert(record);
        },
        Entry::Vacant(slot) => {
            slot.insert(record);
        },
    }
}

#[async_trait]
impl NluStore for InMemoryNluStore {
    async fn set_entity_foreign_id(&self, entity_id: &str, foreign_id: &str) -> Result<()> {
        let mut entity = self
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| Error::not_found(format!("entity {entity_id}")))?;
        entity.foreign_id = Some(foreign_id.to_string());
        Ok(())
    }

    async fn set_value_foreign_id(&self, value_id: &str, foreign_id: &str) -> Result<()> {
        let mut value = self
            .values
            .get_mut(value_id)
            .ok_or_else(|| Error::not_found(format!("value {value_id}")))?;
        value.foreign_id = Some(foreign_id.to_string());
        Ok(())
    }

    async fn find_entity(&self, entity_id: &str) -> Result<Option<NluEntity>> {
        Ok(self.entity(entity_id))
    }

    async fn find_value(&self, value_id: &str) -> Result<Option<NluValue>> {
        Ok(self.value(value_id))
    }

    async fn find_value_populated(&self, value_id: &str) -> Result<Option<PopulatedValue>> {
        let Some(value) = self.value(value_id) else {
            return Ok(None);
        };
        let entity = self.entity(&value.entity_id).with_context(|| {
            format!("value {value_id} references unknown entity {}", value.entity_id)
        })?;
        Ok(Some(PopulatedValue { value, entity }))
    }

    async fn entity_map(&self) -> Result<HashMap<String, NluEntity>> {
        Ok(self
            .entities
            .iter()
            .map(|e| (e.name.clone(), e.value().clone()))
            .collect())
    }
}
