use serde::{Deserialize, Serialize};

use super::ids::PlatformId;
use super::overwrite::Overwrite;

/// Channel type; part of the channel key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Text => "text",
            ChannelKind::Voice => "voice",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific channel attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelAttrs {
    Text {
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        nsfw: bool,
        #[serde(default)]
        slowmode_secs: u32,
    },
    Voice {
        #[serde(default = "default_bitrate")]
        bitrate: u32,
        #[serde(default)]
        user_limit: u32,
    },
}

fn default_bitrate() -> u32 {
    64_000
}

impl ChannelAttrs {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelAttrs::Text { .. } => ChannelKind::Text,
            ChannelAttrs::Voice { .. } => ChannelKind::Voice,
        }
    }

    /// Plain text channel with no topic
    pub fn text() -> Self {
        ChannelAttrs::Text {
            topic: None,
            nsfw: false,
            slowmode_secs: 0,
        }
    }

    /// Voice channel with the platform's default bitrate
    pub fn voice() -> Self {
        ChannelAttrs::Voice {
            bitrate: default_bitrate(),
            user_limit: 0,
        }
    }
}

/// A named, typed channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: PlatformId,
    pub name: String,
    pub position: i32,
    /// Owning category, if any
    #[serde(default)]
    pub parent_id: Option<PlatformId>,
    #[serde(flatten)]
    pub attrs: ChannelAttrs,
    #[serde(default)]
    pub overwrites: Vec<Overwrite>,
}

impl Channel {
    pub fn kind(&self) -> ChannelKind {
        self.attrs.kind()
    }
}
