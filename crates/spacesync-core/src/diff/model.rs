//! Diff output types.
//!
//! Lists are ordered deterministically: create/update follow the source's
//! (position, id) order, delete follows the target's.

use serde::{Deserialize, Serialize};

use crate::keys::{Collection, DuplicateKey};

/// A comparable field that differs between source and target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    Color,
    Hoist,
    Mentionable,
    Permissions,
    Position,
    Topic,
    Nsfw,
    Slowmode,
    Category,
    Overwrites,
    Bitrate,
    UserLimit,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedField::Color => "color",
            ChangedField::Hoist => "hoist",
            ChangedField::Mentionable => "mentionable",
            ChangedField::Permissions => "permissions",
            ChangedField::Position => "position",
            ChangedField::Topic => "topic",
            ChangedField::Nsfw => "nsfw",
            ChangedField::Slowmode => "slowmode",
            ChangedField::Category => "category",
            ChangedField::Overwrites => "overwrites",
            ChangedField::Bitrate => "bitrate",
            ChangedField::UserLimit => "user_limit",
        }
    }
}

impl std::fmt::Display for ChangedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shared key whose comparable fields differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    /// Source display name
    pub name: String,
    pub fields: Vec<ChangedField>,
}

/// Create/update/delete sets for one collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDiff {
    /// Source names absent from the target
    pub create: Vec<String>,
    pub update: Vec<UpdateEntry>,
    /// Target names absent from the source
    pub delete: Vec<String>,
}

impl CollectionDiff {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn update_names(&self) -> impl Iterator<Item = &str> {
        self.update.iter().map(|u| u.name.as_str())
    }

    /// The update entry for a display name, matched case-insensitively
    pub fn update_for(&self, name: &str) -> Option<&UpdateEntry> {
        let wanted = crate::keys::normalize(name);
        self.update
            .iter()
            .find(|u| crate::keys::normalize(&u.name) == wanted)
    }
}

/// Derived totals across all four collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffTotals {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl DiffTotals {
    pub fn is_zero(&self) -> bool {
        self.create == 0 && self.update == 0 && self.delete == 0
    }
}

/// The structural difference between a source and a target space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub roles: CollectionDiff,
    pub categories: CollectionDiff,
    pub text_channels: CollectionDiff,
    pub voice_channels: CollectionDiff,
    /// Entities skipped because another entity already owns their key
    #[serde(default)]
    pub ignored_duplicates: Vec<DuplicateKey>,
}

impl DiffSummary {
    pub fn collection(&self, collection: Collection) -> &CollectionDiff {
        match collection {
            Collection::Roles => &self.roles,
            Collection::Categories => &self.categories,
            Collection::TextChannels => &self.text_channels,
            Collection::VoiceChannels => &self.voice_channels,
        }
    }

    pub fn collections(&self) -> impl Iterator<Item = (Collection, &CollectionDiff)> {
        Collection::ALL.into_iter().map(move |c| (c, self.collection(c)))
    }

    pub fn totals(&self) -> DiffTotals {
        self.collections()
            .fold(DiffTotals::default(), |mut acc, (_, diff)| {
                acc.create += diff.create.len();
                acc.update += diff.update.len();
                acc.delete += diff.delete.len();
                acc
            })
    }

    /// True when no collection has any create, update or delete
    pub fn is_empty(&self) -> bool {
        self.collections().all(|(_, d)| d.is_empty())
    }
}
