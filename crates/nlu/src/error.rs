use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider rejected or failed a sync call.
    #[error("nlu provider sync failed: {context}: {source}")]
    ProviderSyncFailure {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Delete requested for a record that was never synced.
    #[error("{kind} {id} is missing foreign_id")]
    EntityMissingForeignId { kind: &'static str, id: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("nlu provider returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("nlu store error: {message}")]
    Store { message: String },
}

impl Error {
    #[must_use]
    pub fn provider(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::ProviderSyncFailure {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn missing_foreign_id(kind: &'static str, id: impl Into<String>) -> Self {
        Self::EntityMissingForeignId {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

impl parlor_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Store { message }
    }
}

parlor_common::impl_context!();
