use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use parlor_protocol::{ErrorShape, error_codes};

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the dispatch and room layers.
///
/// Each variant maps to an HTTP status and a protocol error code so the HTTP
/// routes and the socket request loop answer the same way.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no notification sockets found for session {session_id}")]
    NoEligibleConnections { session_id: String },

    #[error("{0}")]
    Unavailable(String),

    /// Handler failure, propagated unchanged.
    #[error(transparent)]
    Channel(parlor_channels::Error),

    /// Chat profile find-or-create failed.
    #[error(transparent)]
    Profile(#[from] parlor_sessions::Error),

    #[error(transparent)]
    Nlu(#[from] parlor_nlu::Error),
}

impl GatewayError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    #[must_use]
    pub fn no_eligible_connections(session_id: impl Into<String>) -> Self {
        Self::NoEligibleConnections {
            session_id: session_id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ChannelNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NoEligibleConnections { .. } => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Channel(e) => match e {
                parlor_channels::Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                parlor_channels::Error::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Profile(_) | Self::Nlu(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ChannelNotFound(_) => error_codes::NOT_FOUND,
            Self::Unauthorized(_) => error_codes::UNAUTHORIZED,
            Self::InvalidArgument(_) => error_codes::INVALID_REQUEST,
            Self::NoEligibleConnections { .. } => error_codes::NO_ELIGIBLE_CONNECTIONS,
            Self::Unavailable(_) => error_codes::UNAVAILABLE,
            Self::Channel(parlor_channels::Error::InvalidInput { .. }) => {
                error_codes::INVALID_REQUEST
            },
            Self::Channel(parlor_channels::Error::Unavailable { .. }) => error_codes::UNAVAILABLE,
            Self::Channel(_) => error_codes::CHANNEL_ERROR,
            Self::Profile(_) | Self::Nlu(_) => error_codes::INTERNAL,
        }
    }

    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape::new(self.code(), self.to_string())
    }
}

impl From<parlor_channels::Error> for GatewayError {
    fn from(err: parlor_channels::Error) -> Self {
        match err {
            parlor_channels::Error::ChannelNotFound { name } => Self::ChannelNotFound(name),
            parlor_channels::Error::Unauthorized { message } => Self::Unauthorized(message),
            other => Self::Channel(other),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_error_shape() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(GatewayError::ChannelNotFound("x-channel".into()), 404, "NOT_FOUND")]
    #[case(GatewayError::unauthorized("nope"), 401, "UNAUTHORIZED")]
    #[case(GatewayError::invalid_argument("SessionId is required!"), 400, "INVALID_REQUEST")]
    #[case(GatewayError::no_eligible_connections("s1"), 409, "NO_ELIGIBLE_CONNECTIONS")]
    #[case(GatewayError::unavailable("nlu event queue is full"), 503, "UNAVAILABLE")]
    #[case(
        GatewayError::from(parlor_channels::Error::unauthorized("console only")),
        401,
        "UNAUTHORIZED"
    )]
    #[case(
        GatewayError::from(parlor_channels::Error::unavailable("no downloads")),
        503,
        "UNAVAILABLE"
    )]
    fn status_and_code(#[case] err: GatewayError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status().as_u16(), status);
        assert_eq!(err.code(), code);
    }

    #[test]
    fn channel_not_found_is_lifted_out_of_channel_errors() {
        let err = GatewayError::from(parlor_channels::Error::channel_not_found("web-channel"));
        assert!(matches!(err, GatewayError::ChannelNotFound(ref n) if n == "web-channel"));
    }
}
