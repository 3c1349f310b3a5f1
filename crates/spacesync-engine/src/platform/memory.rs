//! In-memory platform.
//!
//! Holds any number of spaces, enforces the overwrite ceiling the way the
//! real platform does, records every successful mutation with its payload
//! and can inject failures on chosen calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{PlatformClient, PlatformError, PlatformResult};
use spacesync_core::compensation::PositionEntry;
use spacesync_core::keys::normalize;
use spacesync_core::limits::OVERWRITE_CAP;
use spacesync_core::model::{
    Category, CategoryDraft, Channel, ChannelDraft, ChannelPatch, Overwrite, OverwriteTarget,
    PlatformId, Role, RoleDraft, RolePatch, SpaceSnapshot,
};

/// First id handed out for created entities
const FIRST_ALLOCATED_ID: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    CreateRole,
    EditRole,
    DeleteRole,
    ReorderRoles,
    CreateCategory,
    DeleteCategory,
    ReorderCategories,
    CreateChannel,
    EditChannel,
    DeleteChannel,
    ReorderChannels,
}

impl MutationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::CreateRole => "create_role",
            MutationOp::EditRole => "edit_role",
            MutationOp::DeleteRole => "delete_role",
            MutationOp::ReorderRoles => "reorder_roles",
            MutationOp::CreateCategory => "create_category",
            MutationOp::DeleteCategory => "delete_category",
            MutationOp::ReorderCategories => "reorder_categories",
            MutationOp::CreateChannel => "create_channel",
            MutationOp::EditChannel => "edit_channel",
            MutationOp::DeleteChannel => "delete_channel",
            MutationOp::ReorderChannels => "reorder_channels",
        }
    }
}

/// One successful mutation as the platform received it
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub op: MutationOp,
    pub space: PlatformId,
    /// Display name of the entity, empty for reorders
    pub entity: String,
    pub id: Option<PlatformId>,
    /// The request body as sent
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
enum Trigger {
    /// The n-th mutation attempt, counting from 1
    Attempt(usize),
    Op(MutationOp),
    Entity(MutationOp, String),
}

/// A failure to inject into upcoming calls
#[derive(Debug, Clone)]
pub struct Fault {
    trigger: Trigger,
    error: PlatformError,
    sticky: bool,
}

impl Fault {
    /// Fail the n-th mutation attempt (1-based)
    pub fn at_mutation(n: usize, error: PlatformError) -> Self {
        Self {
            trigger: Trigger::Attempt(n),
            error,
            sticky: false,
        }
    }

    /// Fail the next call of `op`
    pub fn on(op: MutationOp, error: PlatformError) -> Self {
        Self {
            trigger: Trigger::Op(op),
            error,
            sticky: false,
        }
    }

    /// Fail the next call of `op` on the entity named `name`
    pub fn on_entity(op: MutationOp, name: &str, error: PlatformError) -> Self {
        Self {
            trigger: Trigger::Entity(op, normalize(name)),
            error,
            sticky: false,
        }
    }

    /// Keep firing instead of being consumed by the first match
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    fn matches(&self, attempt: usize, op: MutationOp, entity: &str) -> bool {
        match &self.trigger {
            Trigger::Attempt(n) => *n == attempt,
            Trigger::Op(wanted) => *wanted == op,
            Trigger::Entity(wanted, name) => *wanted == op && *name == normalize(entity),
        }
    }
}

#[derive(Debug)]
struct State {
    spaces: BTreeMap<PlatformId, SpaceSnapshot>,
    next_id: u64,
    attempts: usize,
    mutations: Vec<MutationRecord>,
    faults: Vec<Fault>,
}

impl State {
    /// Count the attempt and fire a matching fault, if any
    fn begin(&mut self, op: MutationOp, entity: &str) -> PlatformResult<()> {
        self.attempts += 1;
        let attempt = self.attempts;
        let hit = self
            .faults
            .iter()
            .position(|f| f.matches(attempt, op, entity));
        match hit {
            Some(idx) if self.faults[idx].sticky => Err(self.faults[idx].error.clone()),
            Some(idx) => Err(self.faults.remove(idx).error),
            None => Ok(()),
        }
    }

    fn record(
        &mut self,
        op: MutationOp,
        space: PlatformId,
        entity: &str,
        id: Option<PlatformId>,
        payload: serde_json::Value,
    ) {
        self.mutations.push(MutationRecord {
            op,
            space,
            entity: entity.to_string(),
            id,
            payload,
        });
    }

    fn allocate(&mut self) -> PlatformId {
        let id = PlatformId(self.next_id);
        self.next_id += 1;
        id
    }

    fn space(&self, id: PlatformId) -> PlatformResult<&SpaceSnapshot> {
        self.spaces
            .get(&id)
            .ok_or(PlatformError::NotFound { kind: "space", id })
    }

    fn space_mut(&mut self, id: PlatformId) -> PlatformResult<&mut SpaceSnapshot> {
        self.spaces
            .get_mut(&id)
            .ok_or(PlatformError::NotFound { kind: "space", id })
    }

    /// Display name of any entity in a space, for fault matching
    fn name_of(&self, space: PlatformId, id: PlatformId) -> String {
        let Ok(snapshot) = self.space(space) else {
            return id.to_string();
        };
        snapshot
            .role(id)
            .map(|r| r.name.clone())
            .or_else(|| snapshot.category(id).map(|c| c.name.clone()))
            .or_else(|| snapshot.channel(id).map(|c| c.name.clone()))
            .unwrap_or_else(|| id.to_string())
    }
}

fn check_overwrites(overwrites: Option<&Vec<Overwrite>>) -> PlatformResult<()> {
    match overwrites {
        Some(set) if set.len() > OVERWRITE_CAP => Err(PlatformError::LimitExceeded {
            count: set.len(),
            cap: OVERWRITE_CAP,
        }),
        _ => Ok(()),
    }
}

fn payload_of<T: Serialize>(body: &T) -> serde_json::Value {
    serde_json::to_value(body).unwrap_or_default()
}

fn positions_payload(positions: &[PositionEntry]) -> serde_json::Value {
    payload_of(&positions)
}

fn next_position<'a>(positions: impl Iterator<Item = &'a i32>) -> i32 {
    positions.max().map(|p| p + 1).unwrap_or(0)
}

#[derive(Debug)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::with_spaces(Vec::new())
    }

    pub fn with_spaces(spaces: impl IntoIterator<Item = SpaceSnapshot>) -> Self {
        let spaces: BTreeMap<PlatformId, SpaceSnapshot> =
            spaces.into_iter().map(|s| (s.space_id, s)).collect();
        // Reloaded spaces may already hold allocated ids
        let highest = spaces
            .values()
            .flat_map(|s| {
                s.roles
                    .iter()
                    .map(|r| r.id.0)
                    .chain(s.categories.iter().map(|c| c.id.0))
                    .chain(s.channels.iter().map(|c| c.id.0))
            })
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(State {
                spaces,
                next_id: FIRST_ALLOCATED_ID.max(highest + 1),
                attempts: 0,
                mutations: Vec::new(),
                faults: Vec::new(),
            }),
        }
    }

    pub async fn insert_space(&self, space: SpaceSnapshot) {
        self.state.lock().await.spaces.insert(space.space_id, space);
    }

    pub async fn space(&self, id: PlatformId) -> Option<SpaceSnapshot> {
        self.state.lock().await.spaces.get(&id).cloned()
    }

    pub async fn inject(&self, fault: Fault) {
        self.state.lock().await.faults.push(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Successful mutations in the order they were applied
    pub async fn mutations(&self) -> Vec<MutationRecord> {
        self.state.lock().await.mutations.clone()
    }

    pub async fn clear_mutations(&self) {
        self.state.lock().await.mutations.clear();
    }

    /// Mutation attempts so far, failed ones included
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn snapshot(&self, space: PlatformId) -> PlatformResult<SpaceSnapshot> {
        self.state.lock().await.space(space).cloned()
    }

    async fn create_role(&self, space: PlatformId, draft: &RoleDraft) -> PlatformResult<Role> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::CreateRole, &draft.name)?;
        state.space(space)?;
        let id = state.allocate();
        let role = Role {
            id,
            name: draft.name.clone(),
            color: draft.color,
            hoist: draft.hoist,
            mentionable: draft.mentionable,
            permissions: draft.permissions,
            position: draft.position.unwrap_or(1),
            is_default: false,
            managed: false,
        };
        state.space_mut(space)?.roles.push(role.clone());
        state.record(
            MutationOp::CreateRole,
            space,
            &role.name,
            Some(id),
            payload_of(draft),
        );
        Ok(role)
    }

    async fn edit_role(
        &self,
        space: PlatformId,
        id: PlatformId,
        patch: &RolePatch,
    ) -> PlatformResult<Role> {
        let mut state = self.state.lock().await;
        let name = state.name_of(space, id);
        state.begin(MutationOp::EditRole, &name)?;
        let role = state
            .space_mut(space)?
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PlatformError::NotFound { kind: "role", id })?;
        patch.apply_to(role);
        let edited = role.clone();
        state.record(MutationOp::EditRole, space, &name, Some(id), payload_of(patch));
        Ok(edited)
    }

    async fn delete_role(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        let name = state.name_of(space, id);
        state.begin(MutationOp::DeleteRole, &name)?;
        let snapshot = state.space_mut(space)?;
        let idx = snapshot
            .roles
            .iter()
            .position(|r| r.id == id)
            .ok_or(PlatformError::NotFound { kind: "role", id })?;
        if snapshot.roles[idx].is_default {
            return Err(PlatformError::Forbidden(
                "the default role cannot be deleted".to_string(),
            ));
        }
        snapshot.roles.remove(idx);
        // the platform drops overwrites that pointed at the role
        let gone = OverwriteTarget::Role(id);
        for category in &mut snapshot.categories {
            category.overwrites.retain(|o| o.target != gone);
        }
        for channel in &mut snapshot.channels {
            channel.overwrites.retain(|o| o.target != gone);
        }
        state.record(
            MutationOp::DeleteRole,
            space,
            &name,
            Some(id),
            serde_json::Value::Null,
        );
        Ok(())
    }

    async fn reorder_roles(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::ReorderRoles, "")?;
        let snapshot = state.space_mut(space)?;
        for entry in positions {
            if snapshot.role(entry.id).is_none() {
                return Err(PlatformError::NotFound {
                    kind: "role",
                    id: entry.id,
                });
            }
        }
        for entry in positions {
            if let Some(role) = snapshot.roles.iter_mut().find(|r| r.id == entry.id) {
                role.position = entry.position;
            }
        }
        state.record(
            MutationOp::ReorderRoles,
            space,
            "",
            None,
            positions_payload(positions),
        );
        Ok(())
    }

    async fn create_category(
        &self,
        space: PlatformId,
        draft: &CategoryDraft,
    ) -> PlatformResult<Category> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::CreateCategory, &draft.name)?;
        check_overwrites(draft.overwrites.as_ref())?;
        let position = match draft.position {
            Some(position) => position,
            None => next_position(state.space(space)?.categories.iter().map(|c| &c.position)),
        };
        let id = state.allocate();
        let category = Category {
            id,
            name: draft.name.clone(),
            position,
            overwrites: draft.overwrites.clone().unwrap_or_default(),
        };
        state.space_mut(space)?.categories.push(category.clone());
        state.record(
            MutationOp::CreateCategory,
            space,
            &category.name,
            Some(id),
            payload_of(draft),
        );
        Ok(category)
    }

    async fn delete_category(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        let name = state.name_of(space, id);
        state.begin(MutationOp::DeleteCategory, &name)?;
        let snapshot = state.space_mut(space)?;
        let idx = snapshot
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(PlatformError::NotFound {
                kind: "category",
                id,
            })?;
        snapshot.categories.remove(idx);
        // children are orphaned, not deleted
        for channel in &mut snapshot.channels {
            if channel.parent_id == Some(id) {
                channel.parent_id = None;
            }
        }
        state.record(
            MutationOp::DeleteCategory,
            space,
            &name,
            Some(id),
            serde_json::Value::Null,
        );
        Ok(())
    }

    async fn reorder_categories(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::ReorderCategories, "")?;
        let snapshot = state.space_mut(space)?;
        for entry in positions {
            if snapshot.category(entry.id).is_none() {
                return Err(PlatformError::NotFound {
                    kind: "category",
                    id: entry.id,
                });
            }
        }
        for entry in positions {
            if let Some(category) = snapshot.categories.iter_mut().find(|c| c.id == entry.id) {
                category.position = entry.position;
            }
        }
        state.record(
            MutationOp::ReorderCategories,
            space,
            "",
            None,
            positions_payload(positions),
        );
        Ok(())
    }

    async fn create_channel(
        &self,
        space: PlatformId,
        draft: &ChannelDraft,
    ) -> PlatformResult<Channel> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::CreateChannel, &draft.name)?;
        check_overwrites(draft.overwrites.as_ref())?;
        let snapshot = state.space(space)?;
        if let Some(parent) = draft.parent_id {
            if snapshot.category(parent).is_none() {
                return Err(PlatformError::NotFound {
                    kind: "category",
                    id: parent,
                });
            }
        }
        let position = match draft.position {
            Some(position) => position,
            None => next_position(snapshot.channels.iter().map(|c| &c.position)),
        };
        let id = state.allocate();
        let channel = Channel {
            id,
            name: draft.name.clone(),
            position,
            parent_id: draft.parent_id,
            attrs: draft.attrs.clone(),
            overwrites: draft.overwrites.clone().unwrap_or_default(),
        };
        state.space_mut(space)?.channels.push(channel.clone());
        state.record(
            MutationOp::CreateChannel,
            space,
            &channel.name,
            Some(id),
            payload_of(draft),
        );
        Ok(channel)
    }

    async fn edit_channel(
        &self,
        space: PlatformId,
        id: PlatformId,
        patch: &ChannelPatch,
    ) -> PlatformResult<Channel> {
        let mut state = self.state.lock().await;
        let name = state.name_of(space, id);
        state.begin(MutationOp::EditChannel, &name)?;
        check_overwrites(patch.overwrites.as_ref())?;
        let snapshot = state.space_mut(space)?;
        if let Some(parent) = patch.parent.and_then(|p| p.parent_id()) {
            if snapshot.category(parent).is_none() {
                return Err(PlatformError::NotFound {
                    kind: "category",
                    id: parent,
                });
            }
        }
        let channel = snapshot
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(PlatformError::NotFound { kind: "channel", id })?;
        patch.apply_to(channel);
        let edited = channel.clone();
        state.record(
            MutationOp::EditChannel,
            space,
            &name,
            Some(id),
            payload_of(patch),
        );
        Ok(edited)
    }

    async fn delete_channel(&self, space: PlatformId, id: PlatformId) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        let name = state.name_of(space, id);
        state.begin(MutationOp::DeleteChannel, &name)?;
        let snapshot = state.space_mut(space)?;
        let idx = snapshot
            .channels
            .iter()
            .position(|c| c.id == id)
            .ok_or(PlatformError::NotFound { kind: "channel", id })?;
        snapshot.channels.remove(idx);
        state.record(
            MutationOp::DeleteChannel,
            space,
            &name,
            Some(id),
            serde_json::Value::Null,
        );
        Ok(())
    }

    async fn reorder_channels(
        &self,
        space: PlatformId,
        positions: &[PositionEntry],
    ) -> PlatformResult<()> {
        let mut state = self.state.lock().await;
        state.begin(MutationOp::ReorderChannels, "")?;
        let snapshot = state.space_mut(space)?;
        for entry in positions {
            if snapshot.channel(entry.id).is_none() {
                return Err(PlatformError::NotFound {
                    kind: "channel",
                    id: entry.id,
                });
            }
        }
        for entry in positions {
            if let Some(channel) = snapshot.channels.iter_mut().find(|c| c.id == entry.id) {
                channel.position = entry.position;
            }
        }
        state.record(
            MutationOp::ReorderChannels,
            space,
            "",
            None,
            positions_payload(positions),
        );
        Ok(())
    }
}
