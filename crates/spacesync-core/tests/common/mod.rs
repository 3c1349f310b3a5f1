use spacesync_core::model::{
    Category, Channel, ChannelAttrs, Overwrite, Permissions, PlatformId, Role, SpaceSnapshot,
};

/// Create an empty space with its default role
#[allow(dead_code)]
pub fn space(id: u64, name: &str) -> SpaceSnapshot {
    let mut snapshot = SpaceSnapshot::new(PlatformId(id), name);
    let mut everyone = role(id, "@everyone", 0);
    everyone.is_default = true;
    snapshot.roles.push(everyone);
    snapshot
}

/// Create a plain role
#[allow(dead_code)]
pub fn role(id: u64, name: &str, position: i32) -> Role {
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

#[allow(dead_code)]
pub fn category(id: u64, name: &str, position: i32) -> Category {
    Category {
        id: PlatformId(id),
        name: name.to_string(),
        position,
        overwrites: vec![],
    }
}

#[allow(dead_code)]
pub fn text_channel(id: u64, name: &str, position: i32, parent: Option<u64>) -> Channel {
    Channel {
        id: PlatformId(id),
        name: name.to_string(),
        position,
        parent_id: parent.map(PlatformId),
        attrs: ChannelAttrs::text(),
        overwrites: vec![],
    }
}

#[allow(dead_code)]
pub fn voice_channel(id: u64, name: &str, position: i32, parent: Option<u64>) -> Channel {
    Channel {
        attrs: ChannelAttrs::voice(),
        ..text_channel(id, name, position, parent)
    }
}

/// `count` distinct member overwrites
#[allow(dead_code)]
pub fn member_overwrites(count: u64) -> Vec<Overwrite> {
    (0..count)
        .map(|i| Overwrite::member(PlatformId(10_000 + i), Permissions(1024), Permissions::NONE))
        .collect()
}

#[allow(dead_code)]
pub fn set_topic(channel: &mut Channel, value: &str) {
    if let ChannelAttrs::Text { topic, .. } = &mut channel.attrs {
        *topic = Some(value.to_string());
    }
}
