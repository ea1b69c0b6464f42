/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the handler registry and by channel handlers themselves.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No handler is registered under the requested name.
    #[error("channel not found: {name}")]
    ChannelNotFound { name: String },

    /// Request payload, query or download token was rejected.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// The caller's session may not use this channel.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The handler does not support the operation (e.g. downloads on socket channels).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },
}

impl Error {
    #[must_use]
    pub fn channel_not_found(name: impl std::fmt::Display) -> Self {
        Self::ChannelNotFound {
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl std::fmt::Display) -> Self {
        Self::Unauthorized {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }
}
