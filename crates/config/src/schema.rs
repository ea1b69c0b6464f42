/// Config schema types (server, sockets, auth, nlu, channels, metrics).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlorConfig {
    pub server: ServerConfig,
    pub sockets: SocketsConfig,
    pub auth: AuthConfig,
    pub nlu: NluConfig,
    pub channels: ChannelsConfig,
    pub metrics: MetricsConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 4000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 4000,
        }
    }
}

/// Live socket transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketsConfig {
    /// Upgrade path for the socket transport.
    pub path: String,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub max_payload_bytes: usize,
    /// Origins allowed to open sockets / call webhooks. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for SocketsConfig {
    fn default() -> Self {
        Self {
            path: parlor_protocol::DEFAULT_SOCKET_PATH.into(),
            ping_interval_ms: parlor_protocol::PING_INTERVAL_MS,
            ping_timeout_ms: parlor_protocol::PING_TIMEOUT_MS,
            max_payload_bytes: parlor_protocol::MAX_PAYLOAD_BYTES,
            allowed_origins: Vec::new(),
        }
    }
}

impl SocketsConfig {
    /// Whether a browser origin may connect.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|o| o == "*" || o.eq_ignore_ascii_case(origin))
    }
}

/// Session authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
    /// Operator sessions logged in at boot. Deployments with an external
    /// login service plug their own resolver in instead.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operators: Vec<OperatorSession>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: "parlor_session".into(),
            operators: Vec::new(),
        }
    }
}

/// A pre-authenticated console operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSession {
    /// Session id the operator's browser presents in the session cookie.
    #[serde(serialize_with = "serialize_secret")]
    pub session: Secret<String>,
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// NLU provider synchronisation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// Name of the provider used for entity/value synchronisation.
    pub default_provider: String,
    /// Base URL of the HTTP provider. Synchronisation is disabled when unset.
    pub endpoint: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    pub timeout_ms: u64,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            default_provider: "http".into(),
            endpoint: None,
            token: None,
            timeout_ms: 10_000,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    value: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    value: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Built-in socket channels to register at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub enabled: Vec<String>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                parlor_protocol::channels::WEB.into(),
                parlor_protocol::channels::CONSOLE.into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg: ParlorConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.bind, "127.0.0.1");
        assert_eq!(cfg.sockets.path, "/socket");
        assert_eq!(cfg.auth.session_cookie, "parlor_session");
        assert_eq!(cfg.channels.enabled, vec!["web-channel", "console-channel"]);
        assert!(cfg.nlu.endpoint.is_none());
    }

    #[test]
    fn operator_sessions_parse_and_redact() {
        let cfg: ParlorConfig = toml::from_str(
            "[[auth.operators]]\nsession = \"s-ops\"\nid = \"u-1\"\nfirst_name = \"Ada\"\n",
        )
        .unwrap();
        let op = &cfg.auth.operators[0];
        assert_eq!(op.session.expose_secret(), "s-ops");
        assert_eq!(op.id, "u-1");
        assert_eq!(op.last_name, "");
        assert!(!format!("{op:?}").contains("s-ops"));
    }

    #[test]
    fn origin_allowlist() {
        let mut sockets = SocketsConfig::default();
        assert!(sockets.is_origin_allowed("https://anything.example"));
        sockets.allowed_origins = vec!["https://admin.example".into()];
        assert!(sockets.is_origin_allowed("https://ADMIN.example"));
        assert!(!sockets.is_origin_allowed("https://evil.example"));
    }

    #[test]
    fn nlu_token_round_trips_through_toml() {
        let cfg: ParlorConfig =
            toml::from_str("[nlu]\nendpoint = \"http://nlu:5000\"\ntoken = \"s3cret\"\n").unwrap();
        assert_eq!(cfg.nlu.token.as_ref().unwrap().expose_secret(), "s3cret");
        let out = toml::to_string(&cfg).unwrap();
        assert!(out.contains("token = \"s3cret\""));
    }
}
