//! Role phase: create, update, reorder, then prune.

use spacesync_core::compensation::{
    Compensation, EntityDraft, EntityKind, EntityRef, PriorAttributes,
};
use spacesync_core::diff::{role_changes, ChangedField};
use spacesync_core::keys::KeyedSpace;
use spacesync_core::model::{OverwriteTarget, PlatformId, Role, RoleDraft, RolePatch};
use spacesync_core::Result;

use super::ApplyRun;

/// Patch carrying the source values of the changed fields
fn role_patch(source: &Role, fields: &[ChangedField]) -> RolePatch {
    let mut patch = RolePatch::default();
    for field in fields {
        match field {
            ChangedField::Color => patch.color = Some(source.color),
            ChangedField::Hoist => patch.hoist = Some(source.hoist),
            ChangedField::Mentionable => patch.mentionable = Some(source.mentionable),
            ChangedField::Permissions => patch.permissions = Some(source.permissions),
            _ => {}
        }
    }
    patch
}

fn field_list(fields: &[ChangedField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApplyRun<'_> {
    pub(super) async fn sync_roles(&mut self) -> Result<()> {
        let platform = self.platform;
        let (creates, updates, prunes) = {
            let src = KeyedSpace::new(&self.source);
            let tgt = KeyedSpace::new(&self.target);

            let creates: Vec<Role> = src
                .roles
                .iter()
                .filter(|(key, _)| !tgt.roles.contains(key))
                .map(|(_, role)| role.clone())
                .collect();
            let updates: Vec<(PlatformId, Role, Vec<ChangedField>)> = src
                .roles
                .iter()
                .filter_map(|(key, role)| {
                    let existing = tgt.roles.get(key)?;
                    let fields = role_changes(role, existing);
                    (!fields.is_empty()).then(|| (existing.id, role.clone(), fields))
                })
                .collect();
            let prunes: Vec<Role> = if self.options.mode.prune {
                tgt.roles
                    .iter()
                    .filter(|(key, _)| !src.roles.contains(key))
                    .map(|(_, role)| role)
                    .chain(tgt.roles.ignored())
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            (creates, updates, prunes)
        };

        for role in creates {
            let draft = RoleDraft::from_role(&role);
            let started = self.begin("create_role", &role.name);
            let result = platform.create_role(self.target_id(), &draft).await;
            let Some(created) = self.settle("create_role", &role.name, started, result)? else {
                continue;
            };
            self.commit(Compensation::Delete {
                target: EntityRef::new(EntityKind::Role, created.id, &created.name),
            });
            self.note(format!("Created role {}", created.name));
            self.counts.created += 1;
            self.target.roles.push(created);
        }

        for (id, source_role, fields) in updates {
            let Some(current) = self.target.role(id).cloned() else {
                continue;
            };
            let patch = role_patch(&source_role, &fields);
            let prior = patch.prior_of(&current);
            let started = self.begin("edit_role", &current.name);
            let result = platform.edit_role(self.target_id(), id, &patch).await;
            let Some(edited) = self.settle("edit_role", &current.name, started, result)? else {
                continue;
            };
            self.commit(Compensation::Edit {
                target: EntityRef::new(EntityKind::Role, id, &current.name),
                prior: PriorAttributes::Role(prior),
            });
            self.note(format!(
                "Updated role {} ({})",
                current.name,
                field_list(&fields)
            ));
            self.counts.updated += 1;
            if let Some(slot) = self.target.roles.iter_mut().find(|r| r.id == id) {
                *slot = edited;
            }
        }

        self.reorder(EntityKind::Role).await?;

        for role in prunes {
            let snapshot = RoleDraft::from_role(&role).with_position(role.position);
            let started = self.begin("delete_role", &role.name);
            let result = platform.delete_role(self.target_id(), role.id).await;
            if self
                .settle("delete_role", &role.name, started, result)?
                .is_none()
            {
                continue;
            }
            self.commit(Compensation::Recreate {
                target: EntityRef::new(EntityKind::Role, role.id, &role.name),
                snapshot: EntityDraft::Role(snapshot),
            });
            self.note(format!("Deleted role {}", role.name));
            self.counts.deleted += 1;
            self.forget_role(role.id);
        }
        Ok(())
    }

    /// Drop a deleted role locally, along with overwrites that named it
    fn forget_role(&mut self, id: PlatformId) {
        self.target.roles.retain(|r| r.id != id);
        let named = OverwriteTarget::Role(id);
        for category in &mut self.target.categories {
            category.overwrites.retain(|o| o.target != named);
        }
        for channel in &mut self.target.channels {
            channel.overwrites.retain(|o| o.target != named);
        }
    }
}
