//! NLU records: a local mirror that scoring reads, plus an optional worker
//! that syncs each change with the default provider, one event at a time.

use std::sync::Arc;

use {
    parlor_nlu::{
        InMemoryNluStore, NluEvent, NluProviderRegistry, NluStore, NluSync, ParsedEntity,
        ScoredEntity, compute_prediction_score,
    },
    tokio::{
        sync::mpsc::{self, error::TrySendError},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use crate::error::Result;

/// Bounded so a stalled provider pushes back on the HTTP route instead of
/// growing memory.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("nlu sync queue is full")]
    Full,
    #[error("nlu sync worker has stopped")]
    Closed,
}

pub struct NluService {
    store: Arc<InMemoryNluStore>,
    /// `None` when no provider is configured; records are then only mirrored.
    events: Option<mpsc::Sender<NluEvent>>,
}

impl NluService {
    /// Local records and scoring only, no provider sync.
    pub fn local(store: Arc<InMemoryNluStore>) -> Self {
        Self {
            store,
            events: None,
        }
    }

    /// Create the service and start its sync worker. The worker exits once
    /// the service is dropped.
    pub fn start(
        providers: Arc<NluProviderRegistry>,
        store: Arc<InMemoryNluStore>,
    ) -> (Self, JoinHandle<()>) {
        let sync = NluSync::new(providers, store.clone());
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let worker = spawn_worker(sync, Arc::clone(&store), rx);
        (
            Self {
                store,
                events: Some(tx),
            },
            worker,
        )
    }

    pub fn store(&self) -> &Arc<InMemoryNluStore> {
        &self.store
    }

    pub fn syncs_with_provider(&self) -> bool {
        self.events.is_some()
    }

    /// Mirror `event` into the local store and queue it for provider sync.
    pub fn record(&self, event: NluEvent) -> std::result::Result<(), EnqueueError> {
        self.store.record(&event);
        let operation = event.operation();
        let Some(events) = &self.events else {
            self.store.forget(&event);
            debug!(operation, "nlu event applied locally");
            return Ok(());
        };
        match events.try_send(event) {
            Ok(()) => {
                debug!(operation, "nlu event queued");
                Ok(())
            },
            Err(TrySendError::Full(_)) => {
                warn!(operation, "nlu sync queue full, dropping event");
                Err(EnqueueError::Full)
            },
            Err(TrySendError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }

    pub async fn compute_prediction_score(
        &self,
        parsed: &[ParsedEntity],
    ) -> Result<Vec<ScoredEntity>> {
        let known = self.store.entity_map().await?;
        Ok(compute_prediction_score(parsed, &known))
    }
}

impl Default for NluService {
    fn default() -> Self {
        Self::local(Arc::new(InMemoryNluStore::new()))
    }
}

fn spawn_worker(
    sync: NluSync,
    store: Arc<InMemoryNluStore>,
    mut rx: mpsc::Receiver<NluEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            sync.handle(event.clone()).await;
            store.forget(&event);
        }
        info!("nlu sync worker stopped");
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {
        super::*,
        async_trait::async_trait,
        parlor_nlu::{NluEntity, NluProvider, NluValue, PopulatedValue},
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    #[async_trait]
    impl NluProvider for Calls {
        fn name(&self) -> &str {
            "calls"
        }

        async fn add_entity(&self, entity: &NluEntity) -> parlor_nlu::Result<String> {
            self.0.lock().unwrap().push(format!("add_entity:{}", entity.id));
            Ok(format!("f-{}", entity.id))
        }

        async fn update_entity(&self, entity: &NluEntity) -> parlor_nlu::Result<()> {
            let fid = entity.foreign_id.as_deref().unwrap_or("-");
            self.0.lock().unwrap().push(format!("update_entity:{fid}"));
            Ok(())
        }

        async fn delete_entity(&self, foreign_id: &str) -> parlor_nlu::Result<()> {
            self.0.lock().unwrap().push(format!("delete_entity:{foreign_id}"));
            Ok(())
        }

        async fn add_value(&self, value: &NluValue) -> parlor_nlu::Result<String> {
            self.0.lock().unwrap().push(format!("add_value:{}", value.id));
            Ok(format!("f-{}", value.id))
        }

        async fn update_value(&self, _value: &NluValue) -> parlor_nlu::Result<()> {
            Ok(())
        }

        async fn delete_value(&self, value: &PopulatedValue) -> parlor_nlu::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("delete_value:{}", value.value.id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_syncs_then_forgets_deleted_records() {
        let provider = Arc::new(Calls::default());
        let mut providers = NluProviderRegistry::new();
        providers.register(provider.clone());
        let store = Arc::new(InMemoryNluStore::new());
        let (service, worker) = NluService::start(Arc::new(providers), store.clone());

        service
            .record(NluEvent::EntityCreated(NluEntity::new("e1", "intent")))
            .unwrap();
        service
            .record(NluEvent::ValueCreated(NluValue::new("v1", "e1", "hi")))
            .unwrap();
        service
            .record(NluEvent::ValueDeleted(NluValue::new("v1", "e1", "hi")))
            .unwrap();
        drop(service);
        worker.await.unwrap();

        assert_eq!(
            provider.0.lock().unwrap().clone(),
            ["add_entity:e1", "add_value:v1", "delete_value:v1"]
        );
        assert_eq!(store.entity("e1").unwrap().foreign_id.as_deref(), Some("f-e1"));
        assert!(store.value("v1").is_none());
    }

    #[tokio::test]
    async fn entity_lifecycle_reuses_assigned_foreign_id() {
        let provider = Arc::new(Calls::default());
        let mut providers = NluProviderRegistry::new();
        providers.register(provider.clone());
        let store = Arc::new(InMemoryNluStore::new());
        let (service, worker) = NluService::start(Arc::new(providers), store.clone());

        // clients never learn the provider id, so later events carry none
        for event in [
            NluEvent::EntityCreated(NluEntity::new("e1", "intent")),
            NluEvent::EntityUpdated(NluEntity::new("e1", "intent").with_weight(2.0)),
            NluEvent::EntityDeleted(NluEntity::new("e1", "intent")),
        ] {
            service.record(event).unwrap();
        }
        drop(service);
        worker.await.unwrap();

        assert_eq!(
            provider.0.lock().unwrap().clone(),
            ["add_entity:e1", "update_entity:f-e1", "delete_entity:f-e1"]
        );
        assert!(store.entity("e1").is_none());
    }

    #[tokio::test]
    async fn local_service_mirrors_without_provider() {
        let service = NluService::default();
        assert!(!service.syncs_with_provider());

        service
            .record(NluEvent::EntityCreated(NluEntity::new("e1", "A")))
            .unwrap();
        service
            .record(NluEvent::EntityCreated(NluEntity::new("e2", "B")))
            .unwrap();
        service
            .record(NluEvent::EntityDeleted(NluEntity::new("e2", "B")))
            .unwrap();

        let scored = service
            .compute_prediction_score(&[ParsedEntity::new("A", 0.8), ParsedEntity::new("B", 0.9)])
            .await
            .unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].parsed.entity, "A");
        assert!((scored[0].score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn scoring_reads_mirrored_entities() {
        let store = Arc::new(InMemoryNluStore::new());
        let service = NluService::local(store);
        service
            .record(NluEvent::EntityUpdated(
                NluEntity::new("e1", "A").with_weight(0.5),
            ))
            .unwrap();

        let scored = service
            .compute_prediction_score(&[ParsedEntity::new("A", 0.8)])
            .await
            .unwrap();
        assert!((scored[0].score - 0.4).abs() < 1e-9);
    }
}
