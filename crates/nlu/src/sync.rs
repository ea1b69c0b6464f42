//! Best-effort synchronisation of local NLU records with the default provider.

use std::sync::Arc;

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, error},
};

#[cfg(feature = "metrics")]
use parlor_metrics::{counter, labels, nlu as nlu_metrics};

use crate::{
    error::{Error, Result},
    model::{NluEntity, NluValue, ParsedEntity, ScoredEntity},
    provider::NluProviderRegistry,
    score::compute_prediction_score,
    store::NluStore,
};

/// Domain events raised by the persistence layer after a local mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum NluEvent {
    EntityCreated(NluEntity),
    EntityUpdated(NluEntity),
    EntityDeleted(NluEntity),
    ValueCreated(NluValue),
    ValueUpdated(NluValue),
    ValueDeleted(NluValue),
}

impl NluEvent {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::EntityCreated(_) => "entity_create",
            Self::EntityUpdated(_) => "entity_update",
            Self::EntityDeleted(_) => "entity_delete",
            Self::ValueCreated(_) => "value_create",
            Self::ValueUpdated(_) => "value_update",
            Self::ValueDeleted(_) => "value_delete",
        }
    }
}

pub struct NluSync {
    providers: Arc<NluProviderRegistry>,
    store: Arc<dyn NluStore>,
}

impl NluSync {
    pub fn new(providers: Arc<NluProviderRegistry>, store: Arc<dyn NluStore>) -> Self {
        Self { providers, store }
    }

    /// Apply one event. Failures are logged here and never returned.
    pub async fn handle(&self, event: NluEvent) {
        let operation = event.operation();
        match self.sync(event).await {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!(nlu_metrics::SYNC_TOTAL, labels::OPERATION => operation).increment(1);
            },
            Err(e) => {
                error!(operation, error = %e, "unable to sync nlu change");
                #[cfg(feature = "metrics")]
                counter!(nlu_metrics::SYNC_FAILURES_TOTAL, labels::OPERATION => operation)
                    .increment(1);
            },
        }
    }

    /// Score parsed entities against the currently known entity set.
    pub async fn compute_prediction_score(
        &self,
        parsed: &[ParsedEntity],
    ) -> Result<Vec<ScoredEntity>> {
        let known = self.store.entity_map().await?;
        Ok(compute_prediction_score(parsed, &known))
    }

    async fn sync(&self, event: NluEvent) -> Result<()> {
        let provider = self.providers.default_provider()?;
        match event {
            NluEvent::EntityCreated(entity) => {
                let foreign_id = provider.add_entity(&entity).await?;
                debug!(entity = %entity.name, foreign_id = %foreign_id, "new entity synced");
                self.store
                    .set_entity_foreign_id(&entity.id, &foreign_id)
                    .await
            },
            NluEvent::EntityUpdated(entity) => {
                let entity = self.with_stored_entity_fid(entity).await?;
                provider.update_entity(&entity).await?;
                debug!(entity = %entity.name, "updated entity synced");
                Ok(())
            },
            NluEvent::EntityDeleted(entity) => {
                let entity = self.with_stored_entity_fid(entity).await?;
                let foreign_id = entity
                    .foreign_id
                    .as_deref()
                    .ok_or_else(|| Error::missing_foreign_id("entity", &entity.id))?;
                provider.delete_entity(foreign_id).await?;
                debug!(entity = %entity.name, "deleted entity synced");
                Ok(())
            },
            NluEvent::ValueCreated(value) => {
                let foreign_id = provider.add_value(&value).await?;
                debug!(value = %value.value, foreign_id = %foreign_id, "new value synced");
                self.store.set_value_foreign_id(&value.id, &foreign_id).await
            },
            NluEvent::ValueUpdated(mut value) => {
                if value.foreign_id.is_none()
                    && let Some(stored) = self.store.find_value(&value.id).await?
                {
                    value.foreign_id = stored.foreign_id;
                }
                provider.update_value(&value).await?;
                debug!(value = %value.value, "updated value synced");
                Ok(())
            },
            NluEvent::ValueDeleted(value) => {
                let Some(populated) = self.store.find_value_populated(&value.id).await? else {
                    debug!(value_id = %value.id, "value already gone, nothing to sync");
                    return Ok(());
                };
                if populated.value.foreign_id.is_none() {
                    return Err(Error::missing_foreign_id("value", &value.id));
                }
                provider.delete_value(&populated).await?;
                debug!(value = %value.value, "deleted value synced");
                Ok(())
            },
        }
    }

    /// Event payloads come from clients that never see the provider's id, so
    /// the foreign id written back by the create is taken from the store.
    async fn with_stored_entity_fid(&self, mut entity: NluEntity) -> Result<NluEntity> {
        if entity.foreign_id.is_none()
            && let Some(stored) = self.store.find_entity(&entity.id).await?
        {
            entity.foreign_id = stored.foreign_id;
        }
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {
        super::*,
        crate::{model::PopulatedValue, provider::NluProvider, store::InMemoryNluStore},
        async_trait::async_trait,
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recording {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(Error::provider(
                    "recording provider",
                    std::io::Error::other("provider down"),
                ))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NluProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn add_entity(&self, entity: &NluEntity) -> Result<String> {
            self.record(format!("add_entity:{}", entity.id))?;
            Ok(format!("remote-{}", entity.id))
        }

        async fn update_entity(&self, entity: &NluEntity) -> Result<()> {
            let fid = entity.foreign_id.as_deref().unwrap_or("-");
            self.record(format!("update_entity:{fid}"))
        }

        async fn delete_entity(&self, foreign_id: &str) -> Result<()> {
            self.record(format!("delete_entity:{foreign_id}"))
        }

        async fn add_value(&self, value: &NluValue) -> Result<String> {
            self.record(format!("add_value:{}", value.id))?;
            Ok(format!("remote-{}", value.id))
        }

        async fn update_value(&self, value: &NluValue) -> Result<()> {
            let fid = value.foreign_id.as_deref().unwrap_or("-");
            self.record(format!("update_value:{fid}"))
        }

        async fn delete_value(&self, value: &PopulatedValue) -> Result<()> {
            self.record(format!("delete_value:{}", value.value.id))
        }
    }

    fn setup(provider: Arc<Recording>) -> (NluSync, Arc<InMemoryNluStore>) {
        let mut providers = NluProviderRegistry::new();
        providers.register(provider);
        let store = Arc::new(InMemoryNluStore::new());
        let sync = NluSync::new(Arc::new(providers), store.clone());
        (sync, store)
    }

    #[tokio::test]
    async fn entity_create_writes_back_foreign_id() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider.clone());
        let entity = NluEntity::new("e1", "intent");
        store.put_entity(entity.clone());

        sync.handle(NluEvent::EntityCreated(entity)).await;

        assert_eq!(provider.calls(), ["add_entity:e1"]);
        assert_eq!(
            store.entity("e1").unwrap().foreign_id.as_deref(),
            Some("remote-e1")
        );
    }

    #[tokio::test]
    async fn provider_failure_leaves_local_entity_untouched() {
        let provider = Arc::new(Recording::failing());
        let (sync, store) = setup(provider.clone());
        let entity = NluEntity::new("e1", "intent");
        store.put_entity(entity.clone());

        sync.handle(NluEvent::EntityCreated(entity.clone())).await;

        assert_eq!(provider.calls().len(), 1);
        assert_eq!(store.entity("e1").unwrap(), entity);
        assert!(matches!(
            sync.sync(NluEvent::EntityCreated(entity)).await,
            Err(Error::ProviderSyncFailure { .. })
        ));
    }

    #[tokio::test]
    async fn entity_delete_without_foreign_id_skips_provider() {
        let provider = Arc::new(Recording::default());
        let (sync, _store) = setup(provider.clone());
        let entity = NluEntity::new("e1", "intent");

        let err = sync
            .sync(NluEvent::EntityDeleted(entity.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityMissingForeignId { kind: "entity", .. }));

        sync.handle(NluEvent::EntityDeleted(entity)).await;
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn entity_delete_with_foreign_id_calls_provider() {
        let provider = Arc::new(Recording::default());
        let (sync, _store) = setup(provider.clone());

        sync.handle(NluEvent::EntityDeleted(
            NluEntity::new("e1", "intent").with_foreign_id("f-1"),
        ))
        .await;
        assert_eq!(provider.calls(), ["delete_entity:f-1"]);
    }

    #[tokio::test]
    async fn entity_update_and_delete_use_stored_foreign_id() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider.clone());
        store.put_entity(NluEntity::new("e1", "intent").with_foreign_id("f-e1"));

        sync.handle(NluEvent::EntityUpdated(
            NluEntity::new("e1", "intent").with_weight(2.0),
        ))
        .await;
        sync.handle(NluEvent::EntityDeleted(NluEntity::new("e1", "intent")))
            .await;

        assert_eq!(provider.calls(), ["update_entity:f-e1", "delete_entity:f-e1"]);
    }

    #[tokio::test]
    async fn value_update_uses_stored_foreign_id() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider.clone());
        store.put_value(NluValue::new("v1", "e1", "greeting").with_foreign_id("f-v1"));

        sync.handle(NluEvent::ValueUpdated(NluValue::new("v1", "e1", "hello")))
            .await;
        assert_eq!(provider.calls(), ["update_value:f-v1"]);
    }

    #[tokio::test]
    async fn value_delete_refetches_populated_value() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider.clone());
        store.put_entity(NluEntity::new("e1", "intent"));
        store.put_value(NluValue::new("v1", "e1", "greeting").with_foreign_id("f-v1"));

        // the event payload may be stale; the stored record decides
        sync.handle(NluEvent::ValueDeleted(NluValue::new("v1", "e1", "greeting")))
            .await;
        assert_eq!(provider.calls(), ["delete_value:v1"]);

        store.remove_value("v1");
        sync.handle(NluEvent::ValueDeleted(NluValue::new("v1", "e1", "greeting")))
            .await;
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn value_delete_without_foreign_id_is_reported() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider.clone());
        store.put_entity(NluEntity::new("e1", "intent"));
        store.put_value(NluValue::new("v1", "e1", "greeting"));

        let err = sync
            .sync(NluEvent::ValueDeleted(NluValue::new("v1", "e1", "greeting")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityMissingForeignId { kind: "value", .. }));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_default_provider_is_swallowed() {
        let store = Arc::new(InMemoryNluStore::new());
        let sync = NluSync::new(Arc::new(NluProviderRegistry::new()), store);
        sync.handle(NluEvent::ValueUpdated(NluValue::new("v1", "e1", "x")))
            .await;
    }

    #[test]
    fn events_use_tagged_json() {
        let event: NluEvent = serde_json::from_value(serde_json::json!({
            "type": "value_deleted",
            "record": { "id": "v1", "entity_id": "e1", "value": "hi" }
        }))
        .unwrap();
        assert_eq!(event, NluEvent::ValueDeleted(NluValue::new("v1", "e1", "hi")));
        assert_eq!(event.operation(), "value_delete");
    }

    #[tokio::test]
    async fn prediction_score_uses_store_weights() {
        let provider = Arc::new(Recording::default());
        let (sync, store) = setup(provider);
        store.put_entity(NluEntity::new("e1", "A").with_weight(2.0));

        let scored = sync
            .compute_prediction_score(&[ParsedEntity::new("A", 0.8), ParsedEntity::new("B", 0.5)])
            .await
            .unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].parsed.entity, "A");
        assert!((scored[0].score - 1.6).abs() < f64::EPSILON);
    }
}
