//! Category and channel phases.
//!
//! Categories referenced by a source channel are created on demand, right
//! before the first channel that needs them, so the category's compensation
//! always precedes the channel's in the log.

use spacesync_core::compensation::{
    Compensation, EntityDraft, EntityKind, EntityRef, PriorAttributes,
};
use spacesync_core::diff::{channel_changes, ChangedField};
use spacesync_core::keys::{CategoryKey, KeyedSpace};
use spacesync_core::model::{
    Category, CategoryDraft, Channel, ChannelAttrs, ChannelDraft, ChannelKind, ChannelPatch,
    ParentChange, PlatformId,
};
use spacesync_core::Result;

use super::translate::{prepare_overwrites, PreparedOverwrites};
use super::ApplyRun;

/// A source category that may have to exist in the target
#[derive(Debug, Clone)]
struct CategoryNeed {
    key: CategoryKey,
    source: Category,
    overwrites: Option<PreparedOverwrites>,
}

#[derive(Debug)]
struct ChannelCreate {
    source: Channel,
    parent: Option<CategoryNeed>,
    overwrites: Option<PreparedOverwrites>,
}

#[derive(Debug)]
struct ChannelUpdate {
    id: PlatformId,
    source: Channel,
    fields: Vec<ChangedField>,
    parent: Option<CategoryNeed>,
    overwrites: Option<PreparedOverwrites>,
}

fn category_need(
    src: &KeyedSpace<'_>,
    tgt: &KeyedSpace<'_>,
    key: CategoryKey,
    sync_overwrites: bool,
    cap: usize,
) -> Option<CategoryNeed> {
    let source = src.categories.get(&key)?;
    Some(CategoryNeed {
        overwrites: sync_overwrites
            .then(|| prepare_overwrites(src, tgt, &source.overwrites, cap)),
        source: source.clone(),
        key,
    })
}

/// Patch carrying the source values of the changed attribute fields.
///
/// Parent and overwrites are resolved separately against the target.
fn attribute_patch(source: &Channel, fields: &[ChangedField]) -> ChannelPatch {
    let mut patch = ChannelPatch::default();
    for field in fields {
        match (field, &source.attrs) {
            (ChangedField::Topic, ChannelAttrs::Text { topic, .. }) => {
                patch.topic = Some(topic.clone().unwrap_or_default());
            }
            (ChangedField::Nsfw, ChannelAttrs::Text { nsfw, .. }) => patch.nsfw = Some(*nsfw),
            (ChangedField::Slowmode, ChannelAttrs::Text { slowmode_secs, .. }) => {
                patch.slowmode_secs = Some(*slowmode_secs);
            }
            (ChangedField::Bitrate, ChannelAttrs::Voice { bitrate, .. }) => {
                patch.bitrate = Some(*bitrate);
            }
            (ChangedField::UserLimit, ChannelAttrs::Voice { user_limit, .. }) => {
                patch.user_limit = Some(*user_limit);
            }
            _ => {}
        }
    }
    patch
}

/// Names of the fields a patch actually sends
fn patch_fields(patch: &ChannelPatch) -> String {
    let mut names = Vec::new();
    if patch.parent.is_some() {
        names.push(ChangedField::Category.as_str());
    }
    if patch.topic.is_some() {
        names.push(ChangedField::Topic.as_str());
    }
    if patch.nsfw.is_some() {
        names.push(ChangedField::Nsfw.as_str());
    }
    if patch.slowmode_secs.is_some() {
        names.push(ChangedField::Slowmode.as_str());
    }
    if patch.bitrate.is_some() {
        names.push(ChangedField::Bitrate.as_str());
    }
    if patch.user_limit.is_some() {
        names.push(ChangedField::UserLimit.as_str());
    }
    if patch.overwrites.is_some() {
        names.push(ChangedField::Overwrites.as_str());
    }
    names.join(", ")
}

impl ApplyRun<'_> {
    /// Create the source categories no channel will pull in, then reorder
    pub(super) async fn sync_categories(&mut self) -> Result<()> {
        let needs: Vec<CategoryNeed> = {
            let src = KeyedSpace::new(&self.source);
            let tgt = KeyedSpace::new(&self.target);
            let referenced: Vec<CategoryKey> = src
                .channels
                .iter()
                .filter_map(|(_, channel)| src.category_key_of(channel.parent_id))
                .collect();
            src.categories
                .iter()
                .filter(|(key, _)| !tgt.categories.contains(key) && !referenced.contains(key))
                .filter_map(|(key, _)| {
                    category_need(
                        &src,
                        &tgt,
                        key.clone(),
                        self.options.mode.sync_overwrites,
                        self.options.overwrite_cap,
                    )
                })
                .collect()
        };

        for need in needs {
            self.ensure_category(&need).await?;
        }
        self.reorder(EntityKind::Category).await
    }

    pub(super) async fn sync_channels(&mut self) -> Result<()> {
        let platform = self.platform;
        let sync_overwrites = self.options.mode.sync_overwrites;
        let cap = self.options.overwrite_cap;

        let (creates, updates, prunes) = {
            let src = KeyedSpace::new(&self.source);
            let tgt = KeyedSpace::new(&self.target);
            let options = self.options.mode.diff_options();

            let mut creates = Vec::new();
            let mut updates = Vec::new();
            for kind in [ChannelKind::Text, ChannelKind::Voice] {
                for (key, channel) in src.channels_of(kind) {
                    let parent = src
                        .category_key_of(channel.parent_id)
                        .and_then(|k| category_need(&src, &tgt, k, sync_overwrites, cap));
                    match tgt.channels.get(key) {
                        None => creates.push(ChannelCreate {
                            source: channel.clone(),
                            parent,
                            overwrites: sync_overwrites
                                .then(|| prepare_overwrites(&src, &tgt, &channel.overwrites, cap)),
                        }),
                        Some(existing) => {
                            let fields = channel_changes(&src, channel, &tgt, existing, options);
                            if fields.is_empty() {
                                continue;
                            }
                            let overwrites = fields.contains(&ChangedField::Overwrites).then(|| {
                                prepare_overwrites(&src, &tgt, &channel.overwrites, cap)
                            });
                            updates.push(ChannelUpdate {
                                id: existing.id,
                                source: channel.clone(),
                                parent: parent.filter(|_| fields.contains(&ChangedField::Category)),
                                fields,
                                overwrites,
                            });
                        }
                    }
                }
            }

            let prunes: Vec<Channel> = if self.options.mode.prune {
                tgt.channels
                    .iter()
                    .filter(|(key, _)| !src.channels.contains(key))
                    .map(|(_, channel)| channel)
                    .chain(tgt.channels.ignored())
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            (creates, updates, prunes)
        };

        for item in creates {
            let parent_id = match &item.parent {
                Some(need) => self.ensure_category(need).await?,
                None => None,
            };
            let overwrites = match item.overwrites {
                Some(prepared) => {
                    self.overwrite_payload(EntityKind::Channel, &item.source.name, prepared)
                }
                None => None,
            };
            let draft = ChannelDraft {
                name: item.source.name.clone(),
                position: Some(item.source.position),
                parent_id,
                attrs: item.source.attrs.clone(),
                overwrites,
            };
            let started = self.begin("create_channel", &draft.name);
            let result = platform.create_channel(self.target_id(), &draft).await;
            let Some(created) = self.settle("create_channel", &draft.name, started, result)?
            else {
                continue;
            };
            self.commit(Compensation::Delete {
                target: EntityRef::new(EntityKind::Channel, created.id, &created.name),
            });
            self.note(format!(
                "Created {} channel {}",
                created.kind(),
                created.name
            ));
            self.counts.created += 1;
            self.target.channels.push(created);
        }

        for item in updates {
            let Some(current) = self.target.channel(item.id).cloned() else {
                continue;
            };
            let mut patch = attribute_patch(&item.source, &item.fields);
            if item.fields.contains(&ChangedField::Category) {
                patch.parent = match &item.parent {
                    Some(need) => self.ensure_category(need).await?.map(ParentChange::Set),
                    None => Some(ParentChange::Clear),
                };
            }
            if let Some(prepared) = item.overwrites {
                patch.overwrites =
                    self.overwrite_payload(EntityKind::Channel, &current.name, prepared);
            }
            if patch.is_empty() {
                continue;
            }

            let prior = patch.prior_of(&current);
            let started = self.begin("edit_channel", &current.name);
            let result = platform.edit_channel(self.target_id(), item.id, &patch).await;
            let Some(edited) = self.settle("edit_channel", &current.name, started, result)? else {
                continue;
            };
            self.commit(Compensation::Edit {
                target: EntityRef::new(EntityKind::Channel, item.id, &current.name),
                prior: PriorAttributes::Channel(prior),
            });
            self.note(format!(
                "Updated channel {} ({})",
                current.name,
                patch_fields(&patch)
            ));
            self.counts.updated += 1;
            if let Some(slot) = self.target.channels.iter_mut().find(|c| c.id == item.id) {
                *slot = edited;
            }
        }

        self.reorder(EntityKind::Channel).await?;

        for channel in prunes {
            let snapshot = ChannelDraft::from_channel(&channel);
            let started = self.begin("delete_channel", &channel.name);
            let result = platform.delete_channel(self.target_id(), channel.id).await;
            if self
                .settle("delete_channel", &channel.name, started, result)?
                .is_none()
            {
                continue;
            }
            self.commit(Compensation::Recreate {
                target: EntityRef::new(EntityKind::Channel, channel.id, &channel.name),
                snapshot: EntityDraft::Channel(snapshot),
            });
            self.note(format!("Deleted {} channel {}", channel.kind(), channel.name));
            self.counts.deleted += 1;
            self.target.channels.retain(|c| c.id != channel.id);
        }
        Ok(())
    }

    /// Delete target categories with no source counterpart, and duplicates
    /// that lost their key.
    ///
    /// Runs after the channel phase so channels have already moved out.
    pub(super) async fn prune_categories(&mut self) -> Result<()> {
        if !self.options.mode.prune {
            return Ok(());
        }
        let platform = self.platform;
        let prunes: Vec<Category> = {
            let src = KeyedSpace::new(&self.source);
            let tgt = KeyedSpace::new(&self.target);
            tgt.categories
                .iter()
                .filter(|(key, _)| !src.categories.contains(key))
                .map(|(_, category)| category)
                .chain(tgt.categories.ignored())
                .cloned()
                .collect()
        };

        for category in prunes {
            let snapshot = CategoryDraft::from_category(&category);
            let started = self.begin("delete_category", &category.name);
            let result = platform.delete_category(self.target_id(), category.id).await;
            if self
                .settle("delete_category", &category.name, started, result)?
                .is_none()
            {
                continue;
            }
            self.commit(Compensation::Recreate {
                target: EntityRef::new(EntityKind::Category, category.id, &category.name),
                snapshot: EntityDraft::Category(snapshot),
            });
            self.note(format!("Deleted category {}", category.name));
            self.counts.deleted += 1;
            self.target.categories.retain(|c| c.id != category.id);
            for channel in &mut self.target.channels {
                if channel.parent_id == Some(category.id) {
                    channel.parent_id = None;
                }
            }
        }
        Ok(())
    }

    /// Id of the target category for `need`, creating it if missing.
    ///
    /// `None` only when a non-fatal failure prevented the creation.
    async fn ensure_category(&mut self, need: &CategoryNeed) -> Result<Option<PlatformId>> {
        let existing = self
            .target
            .categories
            .iter()
            .filter(|c| CategoryKey::of(&c.name) == need.key)
            .min_by_key(|c| (c.position, c.id))
            .map(|c| c.id);
        if existing.is_some() {
            return Ok(existing);
        }

        let overwrites = match need.overwrites.clone() {
            Some(prepared) => {
                self.overwrite_payload(EntityKind::Category, &need.source.name, prepared)
            }
            None => None,
        };
        let draft = CategoryDraft {
            name: need.source.name.clone(),
            position: Some(need.source.position),
            overwrites,
        };
        let platform = self.platform;
        let started = self.begin("create_category", &draft.name);
        let result = platform.create_category(self.target_id(), &draft).await;
        let Some(created) = self.settle("create_category", &draft.name, started, result)? else {
            return Ok(None);
        };
        self.commit(Compensation::Delete {
            target: EntityRef::new(EntityKind::Category, created.id, &created.name),
        });
        self.note(format!("Created category {}", created.name));
        self.counts.created += 1;
        let id = created.id;
        self.target.categories.push(created);
        Ok(Some(id))
    }
}
