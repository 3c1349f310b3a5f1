#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use spacesync_core::model::{ChannelAttrs, Permissions, PlatformId};
use spacesync_core::{Plan, PlanMode};
use spacesync_engine::platform::{Fault, MutationOp};
use spacesync_engine::{ApplyOutcome, PlatformError};

fn ops(records: &[spacesync_engine::platform::MutationRecord]) -> Vec<MutationOp> {
    records.iter().map(|r| r.op).collect()
}

#[tokio::test]
async fn test_scenario_a_created_role_rolled_back_after_later_failure() {
    // GIVEN: source has a hoisted Officer role and a channel, target has neither
    let mut source = space(1, "Reference");
    let mut officer = role(11, "Officer", 1);
    officer.hoist = true;
    source.roles.push(officer);
    source.channels.push(text_channel(40, "general", 0, None));
    let target = space(2, "Managed");

    let plan = Plan::build(&source, &target, PlanMode::default());
    assert_eq!(plan.diff.roles.create, vec!["Officer".to_string()]);

    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::on(
            MutationOp::CreateChannel,
            PlatformError::Forbidden("missing manage channels".to_string()),
        ))
        .await;

    // WHEN
    let report = apply(&platform, options(false, true)).await;

    // THEN: one compensation, replayed, and Officer is gone again
    assert_eq!(report.outcome, ApplyOutcome::RolledBack);
    assert_eq!(report.compensations, 1);
    let rollback = report.rollback.as_ref().unwrap();
    assert_eq!((rollback.attempted, rollback.succeeded), (1, 1));
    assert!(matches!(
        report.error,
        Some(spacesync_core::SyncError::Permission { .. })
    ));

    let target = platform.space(PlatformId(2)).await.unwrap();
    assert!(target.roles.iter().all(|r| r.name != "Officer"));
    assert_eq!(
        ops(&platform.mutations().await),
        vec![MutationOp::CreateRole, MutationOp::DeleteRole]
    );
}

#[tokio::test]
async fn test_scenario_b_category_before_channel_and_reverse_rollback() {
    // GIVEN: "Clan Wars" owns "general"; a later voice channel will fail
    let mut source = space(1, "Reference");
    source.categories.push(category(30, "Clan Wars", 0));
    source.channels.push(text_channel(40, "general", 0, Some(30)));
    source.channels.push(voice_channel(41, "Lobby", 1, None));
    let target = space(2, "Managed");

    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::on_entity(
            MutationOp::CreateChannel,
            "Lobby",
            PlatformError::Other("gateway timeout".to_string()),
        ))
        .await;

    // WHEN
    let report = apply(&platform, options(false, true)).await;

    // THEN: category, channel, then channel undone before category
    assert_eq!(report.outcome, ApplyOutcome::RolledBack);
    let records = platform.mutations().await;
    assert_eq!(
        ops(&records),
        vec![
            MutationOp::CreateCategory,
            MutationOp::CreateChannel,
            MutationOp::DeleteChannel,
            MutationOp::DeleteCategory,
        ]
    );

    let category_id = records[0].id.unwrap();
    assert_eq!(records[1].payload["parent_id"], serde_json::json!(category_id.0));
    assert_eq!(records[2].id, records[1].id);
    assert_eq!(records[3].id, Some(category_id));

    let target = platform.space(PlatformId(2)).await.unwrap();
    assert!(target.categories.is_empty());
    assert!(target.channels.is_empty());
}

#[tokio::test]
async fn test_scenario_c_oversized_overwrites_omitted_from_edit() {
    // GIVEN: source "general" has 150 overwrites and a new topic
    let mut source = space(1, "Reference");
    let mut general = text_channel(40, "general", 0, None);
    general.overwrites = member_overwrites(150);
    set_topic(&mut general, "Welcome, recruits");
    source.channels.push(general);

    let mut target = space(2, "Managed");
    let mut existing = text_channel(50, "General", 0, None);
    set_topic(&mut existing, "Old topic");
    target.channels.push(existing);

    let plan = Plan::build(&source, &target, PlanMode::default());
    assert_eq!(
        plan.diff.text_channels.update_names().collect::<Vec<_>>(),
        vec!["general"]
    );

    let platform = platform(vec![source, target]);

    // WHEN
    let report = apply(&platform, options(false, true)).await;

    // THEN: topic changed, overwrites field absent, one note
    assert_eq!(report.outcome, ApplyOutcome::Completed);
    let records = platform.mutations().await;
    assert_eq!(ops(&records), vec![MutationOp::EditChannel]);
    assert_eq!(records[0].payload["topic"], "Welcome, recruits");
    assert!(records[0].payload.get("overwrites").is_none());

    let skip_notes = report
        .notes
        .iter()
        .filter(|n| n.contains("overwrites left unchanged"))
        .count();
    assert_eq!(skip_notes, 1);

    let target = platform.space(PlatformId(2)).await.unwrap();
    let general = target.channel(PlatformId(50)).unwrap();
    assert!(general.overwrites.is_empty());
    assert!(matches!(
        &general.attrs,
        ChannelAttrs::Text { topic: Some(t), .. } if t == "Welcome, recruits"
    ));
}

#[tokio::test]
async fn test_oversized_overwrites_omitted_from_creates() {
    // GIVEN: a category and its channel, each with 150 overwrites, absent from the target
    let mut source = space(1, "Reference");
    let mut clan_wars = category(30, "Clan Wars", 0);
    clan_wars.overwrites = member_overwrites(150);
    source.categories.push(clan_wars);
    let mut general = text_channel(40, "general", 0, Some(30));
    general.overwrites = member_overwrites(150);
    source.channels.push(general);
    let platform = platform(vec![source, space(2, "Managed")]);

    // WHEN
    let report = apply(&platform, options(false, true)).await;

    // THEN: both created without an overwrites field, one note each
    assert_eq!(report.outcome, ApplyOutcome::Completed);
    let records = platform.mutations().await;
    let creates: Vec<_> = records
        .iter()
        .filter(|r| matches!(r.op, MutationOp::CreateCategory | MutationOp::CreateChannel))
        .collect();
    assert_eq!(
        creates.iter().map(|r| r.op).collect::<Vec<_>>(),
        vec![MutationOp::CreateCategory, MutationOp::CreateChannel]
    );
    for record in &creates {
        assert!(
            record.payload.get("overwrites").is_none(),
            "{} sent overwrites",
            record.entity
        );
    }

    for entity in ["Clan Wars", "general"] {
        let notes = report
            .notes
            .iter()
            .filter(|n| n.contains("overwrites left unchanged") && n.contains(entity))
            .count();
        assert_eq!(notes, 1, "notes for {}: {:?}", entity, report.notes);
    }

    let target = platform.space(PlatformId(2)).await.unwrap();
    assert!(target.categories.iter().all(|c| c.overwrites.is_empty()));
    assert!(target.channels.iter().all(|c| c.overwrites.is_empty()));
}

#[tokio::test]
async fn test_non_transactional_failure_keeps_partial_state() {
    let mut source = space(1, "Reference");
    source.roles.push(role(11, "Officer", 1));
    source.channels.push(text_channel(40, "general", 0, None));
    let target = space(2, "Managed");

    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::on(
            MutationOp::CreateChannel,
            PlatformError::Forbidden("missing manage channels".to_string()),
        ))
        .await;

    let report = apply(&platform, options(false, false)).await;

    assert_eq!(report.outcome, ApplyOutcome::Failed);
    assert!(report.rollback.is_none());
    let target = platform.space(PlatformId(2)).await.unwrap();
    assert!(target.roles.iter().any(|r| r.name == "Officer"));
}

#[tokio::test]
async fn test_overwrites_translate_to_target_roles() {
    // GIVEN: a channel denying @everyone and allowing Officer
    let mut source = space(1, "Reference");
    source.roles.push(role(11, "Officer", 1));
    let mut general = text_channel(40, "general", 0, None);
    general.overwrites = vec![
        spacesync_core::model::Overwrite::role(PlatformId(1), Permissions::NONE, Permissions(1024)),
        spacesync_core::model::Overwrite::role(PlatformId(11), Permissions(1024), Permissions::NONE),
    ];
    source.channels.push(general);
    let mut target = space(2, "Managed");
    target.roles.push(role(21, "officer", 1));

    let platform = platform(vec![source, target]);
    let report = apply(&platform, options(false, true)).await;
    assert!(report.is_success());

    let target = platform.space(PlatformId(2)).await.unwrap();
    let created = target.channels.iter().find(|c| c.name == "general").unwrap();
    let subjects: Vec<_> = created.overwrites.iter().map(|o| o.target).collect();
    assert!(subjects.contains(&spacesync_core::model::OverwriteTarget::Role(PlatformId(2))));
    assert!(subjects.contains(&spacesync_core::model::OverwriteTarget::Role(PlatformId(21))));
}

#[tokio::test]
async fn test_prune_rollback_recreates_deleted_entities() {
    // GIVEN: the target has a role and a channel the source lacks
    let source = space(1, "Reference");
    let mut target = space(2, "Managed");
    target.roles.push(role(21, "Retired", 1));
    target.categories.push(category(60, "Archive", 0));
    target.channels.push(text_channel(61, "old-chat", 0, Some(60)));

    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::on_entity(
            MutationOp::DeleteCategory,
            "Archive",
            PlatformError::Forbidden("missing manage channels".to_string()),
        ))
        .await;

    // WHEN
    let report = apply(&platform, options(true, true)).await;

    // THEN: the channel and role come back under new ids
    assert_eq!(report.outcome, ApplyOutcome::RolledBack);
    assert_eq!(report.compensations, 2);
    let records = platform.mutations().await;
    assert_eq!(
        ops(&records),
        vec![
            MutationOp::DeleteRole,
            MutationOp::DeleteChannel,
            MutationOp::CreateChannel,
            MutationOp::CreateRole,
        ]
    );

    let target = platform.space(PlatformId(2)).await.unwrap();
    let restored = target.channels.iter().find(|c| c.name == "old-chat").unwrap();
    assert_ne!(restored.id, PlatformId(61));
    assert_eq!(restored.parent_id, Some(PlatformId(60)));
    assert!(target.roles.iter().any(|r| r.name == "Retired"));
}

#[tokio::test]
async fn test_changed_spaces_noted_against_preview() {
    let mut source = space(1, "Reference");
    source.roles.push(role(11, "Officer", 1));
    let target = space(2, "Managed");
    let stale = Plan::build(&space(1, "Reference"), &target, PlanMode::default());

    let platform = platform(vec![source, target]);
    let mut journal = journal();
    let report = spacesync_engine::apply::execute(
        platform.as_ref(),
        &ctx(),
        PlatformId(1),
        PlatformId(2),
        options(false, true),
        Some(stale.applied_totals()),
        &mut journal,
    )
    .await;

    assert!(report.is_success());
    assert!(report.notes[0].starts_with("Spaces changed since the preview"));
}
