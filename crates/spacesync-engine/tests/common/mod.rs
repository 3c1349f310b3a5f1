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

/// A platform holding `spaces`
#[allow(dead_code)]
pub fn platform(spaces: Vec<SpaceSnapshot>) -> std::sync::Arc<spacesync_engine::MemoryPlatform> {
    std::sync::Arc::new(spacesync_engine::MemoryPlatform::with_spaces(spaces))
}

/// A journal over a fresh board, without a reporter task
#[allow(dead_code)]
pub fn journal() -> spacesync_engine::reporter::RunJournal {
    use spacesync_core::StatusBoard;
    spacesync_engine::reporter::RunJournal::new(spacesync_engine::BoardHandle::new(
        StatusBoard::new("Sync", 50),
    ))
}

#[allow(dead_code)]
pub fn ctx() -> spacesync_core::core_types::RunContext {
    spacesync_core::core_types::RunContext::new(spacesync_core::core_types::OperatorId(7))
}

#[allow(dead_code)]
pub fn options(prune: bool, transactional: bool) -> spacesync_engine::apply::ApplyOptions {
    spacesync_engine::apply::ApplyOptions {
        mode: spacesync_core::PlanMode {
            prune,
            sync_overwrites: true,
            transactional,
        },
        overwrite_cap: spacesync_core::limits::OVERWRITE_CAP,
    }
}

/// Apply source `1` onto target `2`
#[allow(dead_code)]
pub async fn apply(
    platform: &spacesync_engine::MemoryPlatform,
    options: spacesync_engine::apply::ApplyOptions,
) -> spacesync_engine::ApplyReport {
    let mut journal = journal();
    spacesync_engine::apply::execute(
        platform,
        &ctx(),
        PlatformId(1),
        PlatformId(2),
        options,
        None,
        &mut journal,
    )
    .await
}
