//! Overwrite translation from source ids into target ids.

use spacesync_core::compensation::EntityKind;
use spacesync_core::keys::KeyedSpace;
use spacesync_core::limits::{guard_overwrites, OverwriteGuard};
use spacesync_core::model::Overwrite;

use super::ApplyRun;

/// A translated overwrite set, checked against the ceiling
#[derive(Debug, Clone)]
pub(super) struct PreparedOverwrites {
    guard: OverwriteGuard,
    /// Source subjects with no counterpart in the target
    dropped: usize,
}

/// Translate `overwrites` through the subject keys of both spaces.
///
/// The everyone subject maps to the target's default role, named roles pair
/// by key and members carry over unchanged. The ceiling applies to the
/// source's own count.
pub(super) fn prepare_overwrites(
    source: &KeyedSpace<'_>,
    target: &KeyedSpace<'_>,
    overwrites: &[Overwrite],
    cap: usize,
) -> PreparedOverwrites {
    let mut translated = Vec::with_capacity(overwrites.len());
    let mut dropped = 0;
    for (subject, (allow, deny)) in source.portable_overwrites(overwrites) {
        match target.resolve_subject(&subject) {
            Some(resolved) => translated.push(Overwrite {
                target: resolved,
                allow,
                deny,
            }),
            None => dropped += 1,
        }
    }
    PreparedOverwrites {
        guard: guard_overwrites(translated, overwrites.len(), cap),
        dropped,
    }
}

impl ApplyRun<'_> {
    /// Turn a prepared set into a payload field, noting what was left out
    pub(super) fn overwrite_payload(
        &mut self,
        kind: EntityKind,
        name: &str,
        prepared: PreparedOverwrites,
    ) -> Option<Vec<Overwrite>> {
        let entity = format!("{} {}", kind, name);
        if let Some(err) = prepared.guard.limit_error(&entity, self.options.overwrite_cap) {
            tracing::warn!(
                op = "overwrite_guard",
                run_id = self.ctx.run_id.as_str(),
                entity_key = %entity,
                "overwrites omitted"
            );
            self.note(format!("{}; overwrites left unchanged", err));
            return None;
        }
        if prepared.dropped > 0 {
            self.note(format!(
                "Skipped {} overwrite(s) on {} with no match in the target",
                prepared.dropped, entity
            ));
        }
        prepared.guard.into_payload()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use spacesync_core::model::{
        OverwriteTarget, Permissions, PlatformId, Role, SpaceSnapshot,
    };

    fn space(id: u64, roles: &[(u64, &str)]) -> SpaceSnapshot {
        let mut space = SpaceSnapshot::new(PlatformId(id), format!("space-{}", id));
        space.roles.push(Role {
            id: PlatformId(id),
            name: "@everyone".to_string(),
            color: 0,
            hoist: false,
            mentionable: false,
            permissions: Permissions::NONE,
            position: 0,
            is_default: true,
            managed: false,
        });
        for (i, (role_id, name)) in roles.iter().enumerate() {
            space.roles.push(Role {
                id: PlatformId(*role_id),
                name: name.to_string(),
                color: 0,
                hoist: false,
                mentionable: false,
                permissions: Permissions::NONE,
                position: i as i32 + 1,
                is_default: false,
                managed: false,
            });
        }
        space
    }

    #[test]
    fn test_subjects_translate_by_key() {
        let source = space(1, &[(11, "Officer"), (12, "Recruit")]);
        let target = space(2, &[(21, "officer")]);
        let (src, tgt) = (KeyedSpace::new(&source), KeyedSpace::new(&target));

        let overwrites = vec![
            Overwrite::role(PlatformId(1), Permissions::NONE, Permissions(1)),
            Overwrite::role(PlatformId(11), Permissions(2), Permissions::NONE),
            Overwrite::role(PlatformId(12), Permissions(4), Permissions::NONE),
            Overwrite::member(PlatformId(500), Permissions(8), Permissions::NONE),
        ];
        let prepared = prepare_overwrites(&src, &tgt, &overwrites, 100);
        assert_eq!(prepared.dropped, 1);

        let payload = prepared.guard.into_payload().unwrap();
        let targets: Vec<OverwriteTarget> = payload.iter().map(|o| o.target).collect();
        assert!(targets.contains(&OverwriteTarget::Role(PlatformId(2))));
        assert!(targets.contains(&OverwriteTarget::Role(PlatformId(21))));
        assert!(targets.contains(&OverwriteTarget::Member(PlatformId(500))));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn test_ceiling_uses_source_count() {
        let source = space(1, &[]);
        let target = space(2, &[]);
        let (src, tgt) = (KeyedSpace::new(&source), KeyedSpace::new(&target));

        let overwrites: Vec<Overwrite> = (0..120)
            .map(|i| Overwrite::member(PlatformId(10_000 + i), Permissions(1), Permissions::NONE))
            .collect();
        let prepared = prepare_overwrites(&src, &tgt, &overwrites, 100);
        assert_eq!(prepared.guard, OverwriteGuard::Omit { count: 120 });
    }
}
