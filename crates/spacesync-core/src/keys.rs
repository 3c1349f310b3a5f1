//! Cross-space identity.
//!
//! Platform ids never match across spaces, so entities are paired by key:
//! roles and categories by lowercase name, channels by (lowercase name, kind).
//! The implicit default role and integration-managed roles are never keyed.
//!
//! ## Duplicate keys
//!
//! Names that collapse to the same key are resolved deterministically: the
//! entity that sorts first by (position, id) owns the key and the others are
//! reported as [`DuplicateKey`] entries. Diff and update ignore them; prune
//! mode deletes target duplicates so a later read sees one entity per key.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Category, Channel, ChannelKind, Overwrite, OverwriteTarget, Permissions, PlatformId, Role,
    SpaceSnapshot,
};

/// Normalise a display name into its key form
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleKey(String);

impl RoleKey {
    pub fn of(name: &str) -> Self {
        Self(normalize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    pub fn of(name: &str) -> Self {
        Self(normalize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelKey {
    pub fn of(name: &str, kind: ChannelKind) -> Self {
        Self {
            name: normalize(name),
            kind,
        }
    }

    pub fn for_channel(channel: &Channel) -> Self {
        Self::of(&channel.name, channel.kind())
    }
}

/// The four collections a diff is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Roles,
    Categories,
    TextChannels,
    VoiceChannels,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Roles,
        Collection::Categories,
        Collection::TextChannels,
        Collection::VoiceChannels,
    ];

    pub fn for_channel_kind(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Text => Collection::TextChannels,
            ChannelKind::Voice => Collection::VoiceChannels,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Roles => "Roles",
            Collection::Categories => "Categories",
            Collection::TextChannels => "Text channels",
            Collection::VoiceChannels => "Voice channels",
        }
    }
}

/// An entity ignored because another one already owns its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub collection: Collection,
    /// Display name of the ignored entity
    pub name: String,
    pub kept_id: PlatformId,
    pub ignored_id: PlatformId,
}

/// Entities of one kind indexed by key, iterable in (position, id) order
#[derive(Debug, Clone)]
pub struct Keyed<'a, K, T> {
    by_key: BTreeMap<K, &'a T>,
    order: Vec<K>,
    /// Duplicates that lost their key, in (position, id) order
    ignored: Vec<&'a T>,
}

impl<'a, K: Ord + Clone, T> Keyed<'a, K, T> {
    fn build<I, FK, FP>(
        items: I,
        collection: impl Fn(&T) -> Collection,
        key_of: FK,
        placement: FP,
        name_of: impl Fn(&T) -> &str,
        duplicates: &mut Vec<DuplicateKey>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        FK: Fn(&T) -> K,
        FP: Fn(&T) -> (i32, PlatformId),
    {
        let mut sorted: Vec<&'a T> = items.into_iter().collect();
        sorted.sort_by_key(|item| placement(*item));

        let mut by_key: BTreeMap<K, &'a T> = BTreeMap::new();
        let mut order = Vec::with_capacity(sorted.len());
        let mut ignored = Vec::new();
        for item in sorted {
            let key = key_of(item);
            match by_key.get(&key) {
                Some(kept) => {
                    duplicates.push(DuplicateKey {
                        collection: collection(item),
                        name: name_of(item).to_string(),
                        kept_id: placement(*kept).1,
                        ignored_id: placement(item).1,
                    });
                    ignored.push(item);
                }
                None => {
                    order.push(key.clone());
                    by_key.insert(key, item);
                }
            }
        }
        Self {
            by_key,
            order,
            ignored,
        }
    }

    pub fn get(&self, key: &K) -> Option<&'a T> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Entries in (position, id) order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &'a T)> + '_ {
        self.order
            .iter()
            .filter_map(move |k| self.by_key.get(k).map(|item| (k, *item)))
    }

    /// Entities skipped because an earlier one owns their key
    pub fn ignored(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.ignored.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Who an overwrite applies to, independent of any one space's ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OverwriteSubject {
    /// The space's default role
    Everyone,
    Role(RoleKey),
    /// Members are platform-global, so their ids carry across spaces
    Member(PlatformId),
    /// A role id the snapshot does not know about
    UnknownRole(PlatformId),
}

/// Overwrite set keyed by subject, comparable across spaces
pub type PortableOverwrites = BTreeMap<OverwriteSubject, (Permissions, Permissions)>;

/// A space snapshot with its entities keyed for cross-space pairing
#[derive(Debug, Clone)]
pub struct KeyedSpace<'a> {
    pub snapshot: &'a SpaceSnapshot,
    pub roles: Keyed<'a, RoleKey, Role>,
    pub categories: Keyed<'a, CategoryKey, Category>,
    pub channels: Keyed<'a, ChannelKey, Channel>,
    pub duplicates: Vec<DuplicateKey>,
    default_role: Option<PlatformId>,
    role_subjects: HashMap<PlatformId, OverwriteSubject>,
    role_ids: BTreeMap<RoleKey, PlatformId>,
    category_keys: HashMap<PlatformId, CategoryKey>,
}

impl<'a> KeyedSpace<'a> {
    pub fn new(snapshot: &'a SpaceSnapshot) -> Self {
        let mut duplicates = Vec::new();

        let roles = Keyed::build(
            snapshot.roles.iter().filter(|r| r.is_syncable()),
            |_| Collection::Roles,
            |r: &Role| RoleKey::of(&r.name),
            |r: &Role| (r.position, r.id),
            |r: &Role| r.name.as_str(),
            &mut duplicates,
        );
        let categories = Keyed::build(
            snapshot.categories.iter(),
            |_| Collection::Categories,
            |c: &Category| CategoryKey::of(&c.name),
            |c: &Category| (c.position, c.id),
            |c: &Category| c.name.as_str(),
            &mut duplicates,
        );
        let channels = Keyed::build(
            snapshot.channels.iter(),
            |c: &Channel| Collection::for_channel_kind(c.kind()),
            ChannelKey::for_channel,
            |c: &Channel| (c.position, c.id),
            |c: &Channel| c.name.as_str(),
            &mut duplicates,
        );

        // Overwrite translation pairs every non-default role by name,
        // including managed ones, first (position, id) wins.
        let mut named: Vec<&Role> = snapshot.roles.iter().filter(|r| !r.is_default).collect();
        named.sort_by_key(|r| (r.position, r.id));
        let mut role_ids = BTreeMap::new();
        for role in named {
            role_ids.entry(RoleKey::of(&role.name)).or_insert(role.id);
        }

        let role_subjects = snapshot
            .roles
            .iter()
            .map(|r| {
                let subject = if r.is_default {
                    OverwriteSubject::Everyone
                } else {
                    OverwriteSubject::Role(RoleKey::of(&r.name))
                };
                (r.id, subject)
            })
            .collect();

        let category_keys = snapshot
            .categories
            .iter()
            .map(|c| (c.id, CategoryKey::of(&c.name)))
            .collect();

        Self {
            snapshot,
            roles,
            categories,
            channels,
            duplicates,
            default_role: snapshot.default_role().map(|r| r.id),
            role_subjects,
            role_ids,
            category_keys,
        }
    }

    /// Channels of one kind, in (position, id) order
    pub fn channels_of(&self, kind: ChannelKind) -> impl Iterator<Item = (&ChannelKey, &'a Channel)> + '_ {
        self.channels.iter().filter(move |(k, _)| k.kind == kind)
    }

    /// Key of the category a channel belongs to
    pub fn category_key_of(&self, parent_id: Option<PlatformId>) -> Option<CategoryKey> {
        parent_id.and_then(|id| self.category_keys.get(&id).cloned())
    }

    pub fn subject_of(&self, target: &OverwriteTarget) -> OverwriteSubject {
        match target {
            OverwriteTarget::Member(id) => OverwriteSubject::Member(*id),
            OverwriteTarget::Role(id) => self
                .role_subjects
                .get(id)
                .cloned()
                .unwrap_or(OverwriteSubject::UnknownRole(*id)),
        }
    }

    /// Translate an overwrite set into its space-independent form
    pub fn portable_overwrites(&self, overwrites: &[Overwrite]) -> PortableOverwrites {
        overwrites
            .iter()
            .map(|o| (self.subject_of(&o.target), (o.allow, o.deny)))
            .collect()
    }

    /// Resolve a portable subject into this space's ids
    pub fn resolve_subject(&self, subject: &OverwriteSubject) -> Option<OverwriteTarget> {
        match subject {
            OverwriteSubject::Everyone => self.default_role.map(OverwriteTarget::Role),
            OverwriteSubject::Role(key) => self.role_ids.get(key).copied().map(OverwriteTarget::Role),
            OverwriteSubject::Member(id) => Some(OverwriteTarget::Member(*id)),
            OverwriteSubject::UnknownRole(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::ChannelAttrs;

    fn role(id: u64, name: &str, position: i32) -> Role {
        Role {
            id: PlatformId(id),
            name: name.to_string(),
            color: 0,
            hoist: false,
            mentionable: false,
            permissions: Permissions::NONE,
            position,
            is_default: false,
            managed: false,
        }
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        assert_eq!(RoleKey::of("Officer"), RoleKey::of("OFFICER"));
        assert_eq!(
            ChannelKey::of("General", ChannelKind::Text),
            ChannelKey::of("general", ChannelKind::Text)
        );
        assert_ne!(
            ChannelKey::of("general", ChannelKind::Text),
            ChannelKey::of("general", ChannelKind::Voice)
        );
    }

    #[test]
    fn test_default_and_managed_roles_are_not_keyed() {
        let mut space = SpaceSnapshot::new(PlatformId(1), "space");
        let mut everyone = role(1, "@everyone", 0);
        everyone.is_default = true;
        let mut bot = role(2, "Bot", 5);
        bot.managed = true;
        space.roles = vec![everyone, bot, role(3, "Officer", 2)];

        let keyed = KeyedSpace::new(&space);
        assert_eq!(keyed.roles.len(), 1);
        assert!(keyed.roles.contains(&RoleKey::of("officer")));
    }

    #[test]
    fn test_duplicate_names_keep_lowest_position() {
        let mut space = SpaceSnapshot::new(PlatformId(1), "space");
        space.roles = vec![role(20, "officer", 4), role(21, "Officer", 1)];

        let keyed = KeyedSpace::new(&space);
        assert_eq!(keyed.roles.get(&RoleKey::of("officer")).unwrap().id, PlatformId(21));
        assert_eq!(keyed.duplicates.len(), 1);
        assert_eq!(keyed.duplicates[0].ignored_id, PlatformId(20));
        assert_eq!(keyed.duplicates[0].kept_id, PlatformId(21));
        let ignored: Vec<PlatformId> = keyed.roles.ignored().map(|r| r.id).collect();
        assert_eq!(ignored, vec![PlatformId(20)]);
    }

    #[test]
    fn test_overwrites_translate_between_spaces() {
        let mut source = SpaceSnapshot::new(PlatformId(1), "source");
        let mut everyone = role(1, "@everyone", 0);
        everyone.is_default = true;
        source.roles = vec![everyone.clone(), role(11, "Officer", 1)];

        let mut target = SpaceSnapshot::new(PlatformId(2), "target");
        let mut target_everyone = everyone;
        target_everyone.id = PlatformId(2);
        target.roles = vec![target_everyone, role(22, "officer", 1)];

        let src = KeyedSpace::new(&source);
        let tgt = KeyedSpace::new(&target);

        let overwrites = vec![
            Overwrite::role(PlatformId(1), Permissions::NONE, Permissions(1)),
            Overwrite::role(PlatformId(11), Permissions(2), Permissions::NONE),
            Overwrite::member(PlatformId(900), Permissions(4), Permissions::NONE),
        ];
        let portable = src.portable_overwrites(&overwrites);
        let resolved: Vec<_> = portable.keys().map(|s| tgt.resolve_subject(s)).collect();
        assert!(resolved.contains(&Some(OverwriteTarget::Role(PlatformId(2)))));
        assert!(resolved.contains(&Some(OverwriteTarget::Role(PlatformId(22)))));
        assert!(resolved.contains(&Some(OverwriteTarget::Member(PlatformId(900)))));
    }

    #[test]
    fn test_category_key_of_channel_parent() {
        let mut space = SpaceSnapshot::new(PlatformId(1), "space");
        space.categories = vec![Category {
            id: PlatformId(50),
            name: "Clan Wars".to_string(),
            position: 0,
            overwrites: vec![],
        }];
        space.channels = vec![Channel {
            id: PlatformId(51),
            name: "general".to_string(),
            position: 0,
            parent_id: Some(PlatformId(50)),
            attrs: ChannelAttrs::text(),
            overwrites: vec![],
        }];
        let keyed = KeyedSpace::new(&space);
        assert_eq!(
            keyed.category_key_of(Some(PlatformId(50))),
            Some(CategoryKey::of("clan wars"))
        );
        assert_eq!(keyed.category_key_of(None), None);
    }
}
