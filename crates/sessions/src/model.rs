use serde::{Deserialize, Serialize};

/// The authenticated user behind a session, as issued by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// A principal with a blank id is treated as no principal at all.
    pub fn is_authenticated(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Channel descriptor stored on a chat profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberChannel {
    pub name: String,
    pub is_socket: bool,
}

impl SubscriberChannel {
    pub fn console() -> Self {
        Self {
            name: parlor_protocol::channels::CONSOLE.into(),
            is_socket: true,
        }
    }
}

/// Attributes used when a chat profile has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSeed {
    pub first_name: String,
    pub last_name: String,
    pub channel: SubscriberChannel,
}

impl From<&Principal> for ProfileSeed {
    fn from(principal: &Principal) -> Self {
        Self {
            first_name: principal.first_name.clone(),
            last_name: principal.last_name.clone(),
            channel: SubscriberChannel::console(),
        }
    }
}

/// Subscriber-like record that lets an operator chat with the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatProfile {
    pub id: String,
    pub foreign_id: String,
    pub first_name: String,
    pub last_name: String,
    pub locale: String,
    pub language: String,
    pub gender: String,
    pub country: String,
    pub labels: Vec<String>,
    pub channel: SubscriberChannel,
    pub assigned_to: Option<String>,
    pub assigned_at: Option<u64>,
    pub avatar: Option<String>,
    pub last_visit: Option<u64>,
    pub retained_from: Option<u64>,
    pub created_at: u64,
}

impl ChatProfile {
    /// Fresh profile: the foreign id doubles as the profile id, everything
    /// not seeded is blank or unset.
    pub fn new(foreign_id: impl Into<String>, seed: ProfileSeed) -> Self {
        let foreign_id = foreign_id.into();
        Self {
            id: foreign_id.clone(),
            foreign_id,
            first_name: seed.first_name,
            last_name: seed.last_name,
            locale: String::new(),
            language: String::new(),
            gender: String::new(),
            country: String::new(),
            labels: Vec::new(),
            channel: seed.channel,
            assigned_to: None,
            assigned_at: None,
            avatar: None,
            last_visit: None,
            retained_from: None,
            created_at: parlor_common::time::now_ms(),
        }
    }
}

/// Web-channel state attached to a session once its console socket is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSessionState {
    pub profile: ChatProfile,
    pub is_socket: bool,
    pub message_queue: Vec<serde_json::Value>,
    pub polling: bool,
}

impl WebSessionState {
    /// State for a socket-connected profile with nothing queued.
    pub fn socket(profile: ChatProfile) -> Self {
        Self {
            profile,
            is_socket: true,
            message_queue: Vec::new(),
            polling: false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn new_profile_defaults() {
        let principal = Principal::new("u-1", "Ada", "Lovelace");
        let profile = ChatProfile::new(&principal.id, ProfileSeed::from(&principal));
        assert_eq!(profile.id, "u-1");
        assert_eq!(profile.foreign_id, "u-1");
        assert_eq!(profile.first_name, "Ada");
        assert!(profile.locale.is_empty());
        assert!(profile.labels.is_empty());
        assert!(profile.assigned_to.is_none());
        assert!(profile.assigned_at.is_none());
        assert_eq!(profile.channel, SubscriberChannel::console());
    }

    #[test]
    fn web_state_wire_shape() {
        let profile = ChatProfile::new("u-2", ProfileSeed::from(&Principal::new("u-2", "", "")));
        let json = serde_json::to_value(WebSessionState::socket(profile)).unwrap();
        assert_eq!(json["isSocket"], true);
        assert_eq!(json["polling"], false);
        assert_eq!(json["messageQueue"], serde_json::json!([]));
        assert_eq!(json["profile"]["channel"]["name"], "console-channel");
        assert_eq!(json["profile"]["channel"]["isSocket"], true);
    }

    #[test]
    fn blank_principal_is_not_authenticated() {
        assert!(!Principal::new("  ", "a", "b").is_authenticated());
        assert!(Principal::new("u", "", "").is_authenticated());
    }
}
