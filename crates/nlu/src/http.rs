//! JSON-over-HTTP NLU provider client.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /entities`, `PUT /entities/{fid}`, `DELETE /entities/{fid}`
//! - `POST /values`, `PUT /values/{fid}`, `DELETE /values/{fid}`
//!
//! Create calls answer `{"id": "<foreign id>"}`.

use std::time::Duration;

use {
    async_trait::async_trait,
    parlor_config::NluConfig,
    reqwest::{Client, RequestBuilder},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    model::{NluEntity, NluValue, PopulatedValue},
    provider::NluProvider,
};

#[derive(Deserialize)]
struct CreatedResponse {
    id: String,
}

pub struct HttpNluProvider {
    name: String,
    client: Client,
    base_url: String,
    token: Option<Secret<String>>,
}

impl HttpNluProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Secret<String>) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build from config. `None` when no endpoint is configured.
    pub fn from_config(config: &NluConfig) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|source| Error::provider("failed to build http client", source))?;
        let mut provider =
            Self::new(config.default_provider.clone(), endpoint).with_client(client);
        if let Some(token) = &config.token {
            provider = provider.with_token(Secret::new(token.expose_secret().clone()));
        }
        Ok(Some(provider))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn send(&self, context: &str, req: RequestBuilder) -> Result<reqwest::Response> {
        let resp = self
            .authorize(req)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| Error::provider(context, source))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http { status, body });
        }
        Ok(resp)
    }

    async fn create(&self, context: &str, req: RequestBuilder) -> Result<String> {
        let resp = self.send(context, req).await?;
        let created: CreatedResponse = resp
            .json()
            .await
            .map_err(|source| Error::provider(context, source))?;
        Ok(created.id)
    }
}

fn require_foreign_id<'a>(kind: &'static str, id: &str, fid: Option<&'a str>) -> Result<&'a str> {
    fid.ok_or_else(|| Error::missing_foreign_id(kind, id))
}

#[async_trait]
impl NluProvider for HttpNluProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_entity(&self, entity: &NluEntity) -> Result<String> {
        debug!(entity = %entity.name, "creating nlu entity");
        let req = self.client.post(self.url("/entities")).json(entity);
        self.create("add entity", req).await
    }

    async fn update_entity(&self, entity: &NluEntity) -> Result<()> {
        let fid = require_foreign_id("entity", &entity.id, entity.foreign_id.as_deref())?;
        let req = self
            .client
            .put(self.url(&format!("/entities/{fid}")))
            .json(entity);
        self.send("update entity", req).await.map(|_| ())
    }

    async fn delete_entity(&self, foreign_id: &str) -> Result<()> {
        let req = self
            .client
            .delete(self.url(&format!("/entities/{foreign_id}")));
        self.send("delete entity", req).await.map(|_| ())
    }

    async fn add_value(&self, value: &NluValue) -> Result<String> {
        debug!(value = %value.value, "creating nlu value");
        let req = self.client.post(self.url("/values")).json(value);
        self.create("add value", req).await
    }

    async fn update_value(&self, value: &NluValue) -> Result<()> {
        let fid = require_foreign_id("value", &value.id, value.foreign_id.as_deref())?;
        let req = self
            .client
            .put(self.url(&format!("/values/{fid}")))
            .json(value);
        self.send("update value", req).await.map(|_| ())
    }

    async fn delete_value(&self, value: &PopulatedValue) -> Result<()> {
        let fid = require_foreign_id("value", &value.value.id, value.value.foreign_id.as_deref())?;
        let req = self.client.delete(self.url(&format!("/values/{fid}")));
        self.send("delete value", req).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, mockito::Matcher};

    #[tokio::test]
    async fn add_entity_returns_foreign_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/entities")
            .match_header("authorization", "Bearer t0ken")
            .match_body(Matcher::PartialJson(serde_json::json!({ "name": "intent" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"remote-1"}"#)
            .create_async()
            .await;

        let provider =
            HttpNluProvider::new("http", server.url()).with_token(Secret::new("t0ken".into()));
        let fid = provider
            .add_entity(&NluEntity::new("e1", "intent"))
            .await
            .unwrap();
        assert_eq!(fid, "remote-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/entities/remote-1")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;

        let provider = HttpNluProvider::new("http", server.url());
        let err = provider.delete_entity("remote-1").await.unwrap_err();
        assert!(matches!(err, Error::Http { status, ref body } if status == 503 && body == "down"));
    }

    #[tokio::test]
    async fn update_value_targets_foreign_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/values/v-remote")
            .with_status(200)
            .create_async()
            .await;

        let provider = HttpNluProvider::new("http", format!("{}/", server.url()));
        let value = NluValue::new("v1", "e1", "greeting").with_foreign_id("v-remote");
        provider.update_value(&value).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_without_foreign_id_never_hits_the_wire() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = HttpNluProvider::new("http", server.url());
        let err = provider
            .update_entity(&NluEntity::new("e1", "intent"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityMissingForeignId { .. }));
        mock.assert_async().await;
    }

    #[test]
    fn from_config_without_endpoint_is_none() {
        assert!(
            HttpNluProvider::from_config(&NluConfig::default())
                .unwrap()
                .is_none()
        );

        let cfg = NluConfig {
            endpoint: Some("http://nlu.local:5005/".into()),
            ..NluConfig::default()
        };
        let provider = HttpNluProvider::from_config(&cfg).unwrap().unwrap();
        assert_eq!(provider.base_url(), "http://nlu.local:5005");
        assert_eq!(provider.name(), "http");
    }
}
