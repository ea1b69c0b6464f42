use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("chat profile vanished after insert: {foreign_id}")]
    ProfileMissing { foreign_id: String },

    /// Context attached to a lower-level failure.
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn profile_missing(foreign_id: impl Into<String>) -> Self {
        Self::ProfileMissing {
            foreign_id: foreign_id.into(),
        }
    }
}

impl parlor_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

parlor_common::impl_context!();
