use std::sync::Arc;

use {
    anyhow::{Context, Result},
    parlor_config::{AuthConfig, ParlorConfig},
    parlor_gateway::{GatewayState, NluService, start_gateway},
    parlor_nlu::{HttpNluProvider, InMemoryNluStore, NluProviderRegistry},
    parlor_sessions::{
        InMemoryProfileStore, InMemorySessions, Principal, ProfileStore, SqliteProfileStore,
        run_migrations,
    },
    secrecy::ExposeSecret,
    tracing::{info, warn},
};

/// Wire stores, NLU sync and metrics from config, then serve.
pub async fn run(config: ParlorConfig, database_url: Option<&str>) -> Result<()> {
    let profiles: Arc<dyn ProfileStore> = match database_url {
        Some(url) => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .connect(url)
                .await
                .with_context(|| format!("failed to open database {url}"))?;
            run_migrations(&pool).await?;
            info!(url, "chat profiles stored in sqlite");
            Arc::new(SqliteProfileStore::new(pool))
        },
        None => {
            info!("chat profiles kept in memory");
            Arc::new(InMemoryProfileStore::new())
        },
    };

    let mut builder = GatewayState::builder(config.clone())
        .in_memory_sessions(operator_sessions(&config.auth))
        .profiles(profiles);

    let nlu_store = Arc::new(InMemoryNluStore::new());
    let nlu = match HttpNluProvider::from_config(&config.nlu)? {
        Some(provider) => {
            info!(provider = %config.nlu.default_provider, endpoint = provider.base_url(), "nlu sync enabled");
            let mut providers = NluProviderRegistry::new();
            providers.register(Arc::new(provider));
            providers.set_default(config.nlu.default_provider.clone());
            let (nlu, _worker) = NluService::start(Arc::new(providers), nlu_store);
            nlu
        },
        None => {
            info!("nlu provider sync disabled (no endpoint configured), scoring stays local");
            NluService::local(nlu_store)
        },
    };
    builder = builder.nlu(nlu);

    #[cfg(feature = "metrics")]
    {
        let handle = parlor_metrics::init_metrics(parlor_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: Vec::new(),
        })?;
        builder = builder.metrics_handle(handle);
    }

    start_gateway(builder.build()).await
}

/// Session table for the standalone binary: the configured operators are
/// logged in up front. Embedders with their own login flow pass a resolver
/// to `GatewayStateBuilder::sessions` instead.
fn operator_sessions(auth: &AuthConfig) -> Arc<InMemorySessions> {
    let sessions = Arc::new(InMemorySessions::default());
    for op in &auth.operators {
        let session = op.session.expose_secret();
        if session.trim().is_empty() {
            warn!(operator = %op.id, "skipping operator with an empty session id");
            continue;
        }
        sessions.login(
            session.clone(),
            Principal::new(op.id.clone(), op.first_name.clone(), op.last_name.clone()),
        );
    }
    if auth.operators.is_empty() {
        warn!("no operator sessions configured, console and room joins will be refused");
    } else {
        info!(count = auth.operators.len(), "operator sessions loaded");
    }
    sessions
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, parlor_sessions::SessionResolver};

    #[tokio::test]
    async fn configured_operators_are_logged_in() {
        let config: ParlorConfig = toml::from_str(
            r#"
            [[auth.operators]]
            session = "s-ops"
            id = "u-1"
            first_name = "Ada"

            [[auth.operators]]
            session = "  "
            id = "u-2"
            "#,
        )
        .unwrap();
        let sessions = operator_sessions(&config.auth);

        let principal = sessions.resolve("s-ops").await.unwrap();
        assert_eq!(principal.id, "u-1");
        assert_eq!(principal.first_name, "Ada");
        assert!(sessions.resolve("  ").await.is_none());
        assert!(sessions.resolve("anonymous").await.is_none());
    }
}
