use serde::{Deserialize, Serialize};

use super::ids::{Permissions, PlatformId};

/// Entity a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverwriteTarget {
    Role(PlatformId),
    Member(PlatformId),
}

/// Per-entity allow/deny bitmasks attached to a category or channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overwrite {
    pub target: OverwriteTarget,
    #[serde(default)]
    pub allow: Permissions,
    #[serde(default)]
    pub deny: Permissions,
}

impl Overwrite {
    pub fn role(id: PlatformId, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Role(id),
            allow,
            deny,
        }
    }

    pub fn member(id: PlatformId, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Member(id),
            allow,
            deny,
        }
    }
}
