//! Mutation payloads.
//!
//! Drafts carry the full attribute set of an entity to create. Patches carry
//! only the fields an edit touches; an absent field is left alone by the
//! platform. The same patch types record the pre-change values held by edit
//! compensations.

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::channel::{Channel, ChannelAttrs};
use super::ids::{Permissions, PlatformId};
use super::overwrite::Overwrite;
use super::role::Role;

/// Full attribute set for creating a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    pub color: u32,
    pub hoist: bool,
    pub mentionable: bool,
    pub permissions: Permissions,
    /// Only set when recreating a pruned role; fresh roles are placed by the
    /// bulk reorder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl RoleDraft {
    pub fn from_role(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            color: role.color,
            hoist: role.hoist,
            mentionable: role.mentionable,
            permissions: role.permissions,
            position: None,
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Full attribute set for creating a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    /// `None` omits the field from the request entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrites: Option<Vec<Overwrite>>,
}

impl CategoryDraft {
    /// Full snapshot of an existing category, ids kept as-is
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            position: Some(category.position),
            overwrites: Some(category.overwrites.clone()),
        }
    }
}

/// Full attribute set for creating a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PlatformId>,
    #[serde(flatten)]
    pub attrs: ChannelAttrs,
    /// `None` omits the field from the request entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrites: Option<Vec<Overwrite>>,
}

impl ChannelDraft {
    /// Full snapshot of an existing channel, ids kept as-is
    pub fn from_channel(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            position: Some(channel.position),
            parent_id: channel.parent_id,
            attrs: channel.attrs.clone(),
            overwrites: Some(channel.overwrites.clone()),
        }
    }
}

/// Partial role edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.hoist.is_none()
            && self.mentionable.is_none()
            && self.permissions.is_none()
    }

    /// The current values of exactly the fields this patch touches.
    pub fn prior_of(&self, role: &Role) -> RolePatch {
        RolePatch {
            color: self.color.map(|_| role.color),
            hoist: self.hoist.map(|_| role.hoist),
            mentionable: self.mentionable.map(|_| role.mentionable),
            permissions: self.permissions.map(|_| role.permissions),
        }
    }

    pub fn apply_to(&self, role: &mut Role) {
        if let Some(color) = self.color {
            role.color = color;
        }
        if let Some(hoist) = self.hoist {
            role.hoist = hoist;
        }
        if let Some(mentionable) = self.mentionable {
            role.mentionable = mentionable;
        }
        if let Some(permissions) = self.permissions {
            role.permissions = permissions;
        }
    }
}

/// New category membership for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "id", rename_all = "snake_case")]
pub enum ParentChange {
    Set(PlatformId),
    Clear,
}

impl ParentChange {
    pub fn from_parent(parent_id: Option<PlatformId>) -> Self {
        match parent_id {
            Some(id) => ParentChange::Set(id),
            None => ParentChange::Clear,
        }
    }

    pub fn parent_id(&self) -> Option<PlatformId> {
        match self {
            ParentChange::Set(id) => Some(*id),
            ParentChange::Clear => None,
        }
    }
}

/// Partial channel edit
///
/// Kind-specific fields that do not match the channel's kind are ignored.
/// An empty `topic` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowmode_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
    /// `None` omits the field from the request entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrites: Option<Vec<Overwrite>>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
            && self.topic.is_none()
            && self.nsfw.is_none()
            && self.slowmode_secs.is_none()
            && self.bitrate.is_none()
            && self.user_limit.is_none()
            && self.overwrites.is_none()
    }

    /// The current values of exactly the fields this patch touches.
    pub fn prior_of(&self, channel: &Channel) -> ChannelPatch {
        let mut prior = ChannelPatch {
            parent: self
                .parent
                .map(|_| ParentChange::from_parent(channel.parent_id)),
            overwrites: self.overwrites.as_ref().map(|_| channel.overwrites.clone()),
            ..ChannelPatch::default()
        };
        match &channel.attrs {
            ChannelAttrs::Text {
                topic,
                nsfw,
                slowmode_secs,
            } => {
                prior.topic = self
                    .topic
                    .as_ref()
                    .map(|_| topic.clone().unwrap_or_default());
                prior.nsfw = self.nsfw.map(|_| *nsfw);
                prior.slowmode_secs = self.slowmode_secs.map(|_| *slowmode_secs);
            }
            ChannelAttrs::Voice {
                bitrate,
                user_limit,
            } => {
                prior.bitrate = self.bitrate.map(|_| *bitrate);
                prior.user_limit = self.user_limit.map(|_| *user_limit);
            }
        }
        prior
    }

    pub fn apply_to(&self, channel: &mut Channel) {
        if let Some(parent) = self.parent {
            channel.parent_id = parent.parent_id();
        }
        if let Some(overwrites) = &self.overwrites {
            channel.overwrites = overwrites.clone();
        }
        match &mut channel.attrs {
            ChannelAttrs::Text {
                topic,
                nsfw,
                slowmode_secs,
            } => {
                if let Some(new_topic) = &self.topic {
                    *topic = (!new_topic.is_empty()).then(|| new_topic.clone());
                }
                if let Some(value) = self.nsfw {
                    *nsfw = value;
                }
                if let Some(value) = self.slowmode_secs {
                    *slowmode_secs = value;
                }
            }
            ChannelAttrs::Voice {
                bitrate,
                user_limit,
            } => {
                if let Some(value) = self.bitrate {
                    *bitrate = value;
                }
                if let Some(value) = self.user_limit {
                    *user_limit = value;
                }
            }
        }
    }
}
