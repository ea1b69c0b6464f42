use std::{borrow::Borrow, fmt};

use {
    parlor_protocol::channels,
    serde::{Deserialize, Serialize},
};

/// Registry key of a channel implementation, e.g. `web-channel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Registry key for a short channel id: `web` → `web-channel`.
    pub fn from_id(id: &str) -> Self {
        Self(format!("{id}{}", channels::SUFFIX))
    }

    pub fn web() -> Self {
        Self::new(channels::WEB)
    }

    pub fn console() -> Self {
        Self::new(channels::CONSOLE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ChannelName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ChannelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_gets_suffix() {
        assert_eq!(ChannelName::from_id("web"), ChannelName::web());
        assert_eq!(ChannelName::from_id("console"), ChannelName::console());
        assert_eq!(ChannelName::from_id("messenger").as_str(), "messenger-channel");
    }
}
