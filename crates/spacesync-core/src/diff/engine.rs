use serde::{Deserialize, Serialize};

use super::model::{ChangedField, CollectionDiff, DiffSummary, UpdateEntry};
use crate::keys::{Keyed, KeyedSpace, OverwriteSubject, PortableOverwrites};
use crate::model::{Category, Channel, ChannelAttrs, ChannelKind, Role, SpaceSnapshot};

/// Knobs that change what counts as a difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Compare channel overwrite sets; follows the `sync_overwrites` setting
    pub compare_overwrites: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            compare_overwrites: true,
        }
    }
}

/// Compute the difference that would make `target` match `source`.
///
/// # Example
///
/// ```
/// use spacesync_core::{compute_diff, DiffOptions, PlatformId, SpaceSnapshot};
///
/// let space = SpaceSnapshot::new(PlatformId(1), "clan");
/// let diff = compute_diff(&space, &space, DiffOptions::default());
/// assert!(diff.is_empty());
/// ```
pub fn compute_diff(
    source: &SpaceSnapshot,
    target: &SpaceSnapshot,
    options: DiffOptions,
) -> DiffSummary {
    let src = KeyedSpace::new(source);
    let tgt = KeyedSpace::new(target);
    diff_keyed(&src, &tgt, options)
}

/// Diff two already-keyed spaces
pub fn diff_keyed(src: &KeyedSpace<'_>, tgt: &KeyedSpace<'_>, options: DiffOptions) -> DiffSummary {
    let roles = diff_collection(
        &src.roles,
        &tgt.roles,
        |_| true,
        |r: &Role| r.name.as_str(),
        role_changes,
    );
    let categories = diff_collection(
        &src.categories,
        &tgt.categories,
        |_| true,
        |c: &Category| c.name.as_str(),
        category_changes,
    );
    let channels_of = |kind: ChannelKind| {
        diff_collection(
            &src.channels,
            &tgt.channels,
            |k| k.kind == kind,
            |c: &Channel| c.name.as_str(),
            |s, t| channel_changes(src, s, tgt, t, options),
        )
    };

    let mut ignored_duplicates = src.duplicates.clone();
    ignored_duplicates.extend(tgt.duplicates.iter().cloned());

    DiffSummary {
        roles,
        categories,
        text_channels: channels_of(ChannelKind::Text),
        voice_channels: channels_of(ChannelKind::Voice),
        ignored_duplicates,
    }
}

fn diff_collection<K, T>(
    source: &Keyed<'_, K, T>,
    target: &Keyed<'_, K, T>,
    in_scope: impl Fn(&K) -> bool,
    name_of: impl Fn(&T) -> &str,
    changes: impl Fn(&T, &T) -> Vec<ChangedField>,
) -> CollectionDiff
where
    K: Ord + Clone,
{
    let mut diff = CollectionDiff::default();

    for (key, item) in source.iter().filter(|(k, _)| in_scope(k)) {
        match target.get(key) {
            None => diff.create.push(name_of(item).to_string()),
            Some(existing) => {
                let fields = changes(item, existing);
                if !fields.is_empty() {
                    diff.update.push(UpdateEntry {
                        name: name_of(item).to_string(),
                        fields,
                    });
                }
            }
        }
    }

    diff.delete = target
        .iter()
        .filter(|(k, _)| in_scope(k) && !source.contains(k))
        .map(|(_, item)| name_of(item).to_string())
        .collect();

    diff
}

/// Differing role fields: color, hoist, mentionable, permissions.
///
/// Position is realised by the bulk reorder and is not an update field.
pub fn role_changes(source: &Role, target: &Role) -> Vec<ChangedField> {
    let mut fields = Vec::new();
    if source.color != target.color {
        fields.push(ChangedField::Color);
    }
    if source.hoist != target.hoist {
        fields.push(ChangedField::Hoist);
    }
    if source.mentionable != target.mentionable {
        fields.push(ChangedField::Mentionable);
    }
    if source.permissions != target.permissions {
        fields.push(ChangedField::Permissions);
    }
    fields
}

/// Categories only compare their position
pub fn category_changes(source: &Category, target: &Category) -> Vec<ChangedField> {
    if source.position != target.position {
        vec![ChangedField::Position]
    } else {
        Vec::new()
    }
}

pub fn channel_changes(
    src: &KeyedSpace<'_>,
    source: &Channel,
    tgt: &KeyedSpace<'_>,
    target: &Channel,
    options: DiffOptions,
) -> Vec<ChangedField> {
    let mut fields = Vec::new();

    match (&source.attrs, &target.attrs) {
        (
            ChannelAttrs::Text {
                topic: s_topic,
                nsfw: s_nsfw,
                slowmode_secs: s_slow,
            },
            ChannelAttrs::Text {
                topic: t_topic,
                nsfw: t_nsfw,
                slowmode_secs: t_slow,
            },
        ) => {
            if s_topic.as_deref().unwrap_or_default() != t_topic.as_deref().unwrap_or_default() {
                fields.push(ChangedField::Topic);
            }
            if s_nsfw != t_nsfw {
                fields.push(ChangedField::Nsfw);
            }
            if s_slow != t_slow {
                fields.push(ChangedField::Slowmode);
            }
        }
        (
            ChannelAttrs::Voice {
                bitrate: s_bitrate,
                user_limit: s_limit,
            },
            ChannelAttrs::Voice {
                bitrate: t_bitrate,
                user_limit: t_limit,
            },
        ) => {
            if s_bitrate != t_bitrate {
                fields.push(ChangedField::Bitrate);
            }
            if s_limit != t_limit {
                fields.push(ChangedField::UserLimit);
            }
        }
        // keys include the kind, so paired channels always share it
        _ => {}
    }

    if src.category_key_of(source.parent_id) != tgt.category_key_of(target.parent_id) {
        fields.push(ChangedField::Category);
    }
    if source.position != target.position {
        fields.push(ChangedField::Position);
    }
    if options.compare_overwrites {
        let (wanted, current) = comparable_overwrites(src, &source.overwrites, tgt, &target.overwrites);
        if wanted != current {
            fields.push(ChangedField::Overwrites);
        }
    }

    fields.sort();
    fields
}

/// Portable forms of a source and a target overwrite set, restricted to
/// subjects a sync could ever transmit.
///
/// Source subjects that can never exist in the target (unknown ids, roles the
/// engine will not create and the target lacks) are dropped, as are unknown
/// subjects on the target side, so re-diffing after an apply converges.
pub fn comparable_overwrites(
    src: &KeyedSpace<'_>,
    source: &[crate::model::Overwrite],
    tgt: &KeyedSpace<'_>,
    target: &[crate::model::Overwrite],
) -> (PortableOverwrites, PortableOverwrites) {
    let wanted = src
        .portable_overwrites(source)
        .into_iter()
        .filter(|(subject, _)| match subject {
            OverwriteSubject::UnknownRole(_) => false,
            OverwriteSubject::Role(key) => {
                src.roles.contains(key) || tgt.resolve_subject(subject).is_some()
            }
            OverwriteSubject::Everyone | OverwriteSubject::Member(_) => true,
        })
        .collect();
    let current = tgt
        .portable_overwrites(target)
        .into_iter()
        .filter(|(subject, _)| !matches!(subject, OverwriteSubject::UnknownRole(_)))
        .collect();
    (wanted, current)
}
