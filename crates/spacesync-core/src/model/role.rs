use serde::{Deserialize, Serialize};

use super::ids::{Permissions, PlatformId};

/// A named permission group owned by one space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: PlatformId,
    pub name: String,
    /// RGB color, 0 meaning "no color"
    #[serde(default)]
    pub color: u32,
    /// Shown separately in the member list
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub mentionable: bool,
    #[serde(default)]
    pub permissions: Permissions,
    pub position: i32,
    /// The implicit role every member holds
    #[serde(default)]
    pub is_default: bool,
    /// Owned by an integration; cannot be created or deleted by hand
    #[serde(default)]
    pub managed: bool,
}

impl Role {
    /// Whether the engine may create, edit or delete this role.
    pub fn is_syncable(&self) -> bool {
        !self.is_default && !self.managed
    }
}
