use serde::{Deserialize, Serialize};

use super::ids::PlatformId;
use super::overwrite::Overwrite;

/// A grouping container owning zero or more channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: PlatformId,
    pub name: String,
    pub position: i32,
    #[serde(default)]
    pub overwrites: Vec<Overwrite>,
}
