use serde::{Deserialize, Serialize};

use super::category::Category;
use super::channel::Channel;
use super::ids::PlatformId;
use super::role::Role;

/// Read-only view of one space's structure at a point in time.
///
/// Snapshots are taken once per preview or run and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub space_id: PlatformId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl SpaceSnapshot {
    pub fn new(space_id: PlatformId, name: impl Into<String>) -> Self {
        Self {
            space_id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// The implicit default role, if the platform reported one
    pub fn default_role(&self) -> Option<&Role> {
        self.roles.iter().find(|r| r.is_default)
    }

    pub fn role(&self, id: PlatformId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn category(&self, id: PlatformId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn channel(&self, id: PlatformId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Channels owned by a category, in position order
    pub fn channels_in(&self, category_id: PlatformId) -> Vec<&Channel> {
        let mut owned: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| c.parent_id == Some(category_id))
            .collect();
        owned.sort_by_key(|c| (c.position, c.id));
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshot_is_empty() {
        let space = SpaceSnapshot::new(PlatformId(7), "Reference");
        assert_eq!(space.space_id, PlatformId(7));
        assert_eq!(space.name, "Reference");
        assert!(space.roles.is_empty() && space.categories.is_empty() && space.channels.is_empty());
        assert_eq!(SpaceSnapshot::default().space_id, PlatformId(0));
    }
}
