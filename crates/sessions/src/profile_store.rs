//! Chat profile persistence.
//!
//! `find_or_create` is the only write path the dispatch core needs. Both
//! backends make it idempotent per foreign id, including under concurrent
//! first calls.

use {
    async_trait::async_trait,
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use parlor_metrics::{counter, sessions as session_metrics};

use crate::{
    error::{Context, Error, Result},
    model::{ChatProfile, ProfileSeed, SubscriberChannel},
};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Return the profile for `foreign_id`, creating it from `seed` if absent.
    async fn find_or_create(&self, foreign_id: &str, seed: ProfileSeed) -> Result<ChatProfile>;

    async fn find(&self, foreign_id: &str) -> Result<Option<ChatProfile>>;
}

fn record_created(foreign_id: &str) {
    debug!(foreign_id, "created chat profile");
    #[cfg(feature = "metrics")]
    counter!(session_metrics::PROFILES_CREATED_TOTAL).increment(1);
}

// ── In-memory ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, ChatProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_or_create(&self, foreign_id: &str, seed: ProfileSeed) -> Result<ChatProfile> {
        match self.profiles.entry(foreign_id.to_string()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let profile = ChatProfile::new(foreign_id, seed);
                record_created(foreign_id);
                Ok(e.insert(profile).clone())
            },
        }
    }

    async fn find(&self, foreign_id: &str) -> Result<Option<ChatProfile>> {
        Ok(self.profiles.get(foreign_id).map(|p| p.clone()))
    }
}

// ── SQLite ──────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    foreign_id: String,
    first_name: String,
    last_name: String,
    locale: String,
    language: String,
    gender: String,
    country: String,
    labels: String,
    channel_name: String,
    is_socket: bool,
    assigned_to: Option<String>,
    assigned_at: Option<i64>,
    avatar: Option<String>,
    last_visit: Option<i64>,
    retained_from: Option<i64>,
    created_at: i64,
}

impl TryFrom<ProfileRow> for ChatProfile {
    type Error = Error;

    fn try_from(r: ProfileRow) -> Result<Self> {
        let labels = serde_json::from_str(&r.labels)
            .with_context(|| format!("chat profile {} has malformed labels", r.foreign_id))?;
        Ok(Self {
            id: r.id,
            foreign_id: r.foreign_id,
            first_name: r.first_name,
            last_name: r.last_name,
            locale: r.locale,
            language: r.language,
            gender: r.gender,
            country: r.country,
            labels,
            channel: SubscriberChannel {
                name: r.channel_name,
                is_socket: r.is_socket,
            },
            assigned_to: r.assigned_to,
            assigned_at: r.assigned_at.map(|v| v as u64),
            avatar: r.avatar,
            last_visit: r.last_visit.map(|v| v as u64),
            retained_from: r.retained_from.map(|v| v as u64),
            created_at: r.created_at as u64,
        })
    }
}

const SELECT_PROFILE: &str = "SELECT id, foreign_id, first_name, last_name, locale, language, \
     gender, country, labels, channel_name, is_socket, assigned_to, assigned_at, avatar, \
     last_visit, retained_from, created_at FROM chat_profiles WHERE foreign_id = ?";

/// SQLite-backed profile store. Expects [`crate::run_migrations`] to have run.
pub struct SqliteProfileStore {
    pool: sqlx::SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn find_or_create(&self, foreign_id: &str, seed: ProfileSeed) -> Result<ChatProfile> {
        let fresh = ChatProfile::new(foreign_id, seed);
        let labels = serde_json::to_string(&fresh.labels)?;
        let inserted = sqlx::query(
            r#"INSERT INTO chat_profiles
                 (id, foreign_id, first_name, last_name, locale, language, gender, country,
                  labels, channel_name, is_socket, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(foreign_id) DO NOTHING"#,
        )
        .bind(&fresh.id)
        .bind(&fresh.foreign_id)
        .bind(&fresh.first_name)
        .bind(&fresh.last_name)
        .bind(&fresh.locale)
        .bind(&fresh.language)
        .bind(&fresh.gender)
        .bind(&fresh.country)
        .bind(labels)
        .bind(&fresh.channel.name)
        .bind(fresh.channel.is_socket)
        .bind(fresh.created_at as i64)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            record_created(foreign_id);
        }

        self.find(foreign_id)
            .await?
            .ok_or_else(|| Error::profile_missing(foreign_id))
    }

    async fn find(&self, foreign_id: &str) -> Result<Option<ChatProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(SELECT_PROFILE)
            .bind(foreign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ChatProfile::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {super::*, crate::model::Principal, rstest::rstest, std::sync::Arc};

    async fn sqlite_store() -> SqliteProfileStore {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteProfileStore::new(pool)
    }

    async fn store(kind: &str) -> Arc<dyn ProfileStore> {
        match kind {
            "memory" => Arc::new(InMemoryProfileStore::new()),
            _ => Arc::new(sqlite_store().await),
        }
    }

    fn seed(first: &str) -> ProfileSeed {
        ProfileSeed::from(&Principal::new("ignored", first, "Operator"))
    }

    #[rstest]
    #[case("memory")]
    #[case("sqlite")]
    #[tokio::test]
    async fn second_call_returns_existing_profile(#[case] kind: &str) {
        let store = store(kind).await;
        let first = store.find_or_create("u-1", seed("Ada")).await.unwrap();
        let second = store.find_or_create("u-1", seed("Grace")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.first_name, "Ada");
        assert_eq!(second.id, "u-1");
    }

    #[rstest]
    #[case("memory")]
    #[case("sqlite")]
    #[tokio::test]
    async fn find_missing_is_none(#[case] kind: &str) {
        let store = store(kind).await;
        assert!(store.find("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_first_calls_create_one_profile() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .find_or_create("u-1", seed(&format!("n{i}")))
                    .await
                    .unwrap()
            }));
        }
        let mut names = Vec::new();
        for t in tasks {
            names.push(t.await.unwrap().first_name);
        }
        names.dedup();
        assert_eq!(names.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sqlite_round_trips_channel_and_labels() {
        let store = sqlite_store().await;
        let profile = store.find_or_create("u-9", seed("Lin")).await.unwrap();
        assert!(profile.labels.is_empty());
        assert_eq!(profile.channel, SubscriberChannel::console());
        assert!(profile.assigned_at.is_none());
        assert_eq!(store.find("u-9").await.unwrap().unwrap(), profile);
    }
}
