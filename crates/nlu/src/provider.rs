use std::{collections::HashMap, sync::Arc};

use {async_trait::async_trait, tracing::debug};

use crate::{
    error::{Error, Result},
    model::{NluEntity, NluValue, PopulatedValue},
};

/// Narrow client capability of an external NLU provider.
#[async_trait]
pub trait NluProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Create the entity remotely and return its foreign id.
    async fn add_entity(&self, entity: &NluEntity) -> Result<String>;
    async fn update_entity(&self, entity: &NluEntity) -> Result<()>;
    async fn delete_entity(&self, foreign_id: &str) -> Result<()>;

    /// Create the value remotely and return its foreign id.
    async fn add_value(&self, value: &NluValue) -> Result<String>;
    async fn update_value(&self, value: &NluValue) -> Result<()>;
    async fn delete_value(&self, value: &PopulatedValue) -> Result<()>;
}

/// Named providers plus the one used for synchronisation.
#[derive(Default)]
pub struct NluProviderRegistry {
    providers: HashMap<String, Arc<dyn NluProvider>>,
    default: Option<String>,
}

impl NluProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. The first one registered becomes the default.
    pub fn register(&mut self, provider: Arc<dyn NluProvider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, "registered nlu provider");
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.providers.insert(name, provider);
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default = Some(name.into());
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NluProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn default_provider(&self) -> Result<Arc<dyn NluProvider>> {
        let name = self
            .default
            .as_deref()
            .ok_or_else(|| Error::not_found("no default nlu provider configured"))?;
        self.get(name)
            .ok_or_else(|| Error::not_found(format!("nlu provider {name} is not registered")))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    struct Dummy(&'static str);

    #[async_trait]
    impl NluProvider for Dummy {
        fn name(&self) -> &str {
            self.0
        }

        async fn add_entity(&self, _: &NluEntity) -> Result<String> {
            Ok("fid".into())
        }

        async fn update_entity(&self, _: &NluEntity) -> Result<()> {
            Ok(())
        }

        async fn delete_entity(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn add_value(&self, _: &NluValue) -> Result<String> {
            Ok("fid".into())
        }

        async fn update_value(&self, _: &NluValue) -> Result<()> {
            Ok(())
        }

        async fn delete_value(&self, _: &PopulatedValue) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_registry_has_no_default() {
        let reg = NluProviderRegistry::new();
        assert!(matches!(reg.default_provider(), Err(Error::NotFound { .. })));
    }

    #[test]
    fn first_registered_is_default_until_overridden() {
        let mut reg = NluProviderRegistry::new();
        reg.register(Arc::new(Dummy("rasa")));
        reg.register(Arc::new(Dummy("http")));
        assert_eq!(reg.default_provider().unwrap().name(), "rasa");

        reg.set_default("http");
        assert_eq!(reg.default_provider().unwrap().name(), "http");

        reg.set_default("ghost");
        assert!(reg.default_provider().is_err());
    }
}
