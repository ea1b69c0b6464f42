//! Session collaborators for the dispatch core.
//!
//! Authentication itself lives outside parlor; this crate only models what the
//! gateway needs from it: who (if anyone) is behind a session id, the transient
//! per-session extension state, and the chat profiles operators get when they
//! talk to the bot through the console channel.

pub mod error;
pub mod extension;
pub mod model;
pub mod profile_store;
pub mod resolver;

pub use {
    error::{Error, Result},
    extension::{SessionExtension, SessionExtensionStore},
    model::{ChatProfile, Principal, ProfileSeed, SubscriberChannel, WebSessionState},
    profile_store::{InMemoryProfileStore, ProfileStore, SqliteProfileStore},
    resolver::{InMemorySessions, SessionResolver},
};

/// Run database migrations for the sessions crate.
///
/// Creates the `chat_profiles` table used by [`SqliteProfileStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
