#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use spacesync_core::compensation::{Compensation, EntityKind, EntityRef};
use spacesync_core::model::PlatformId;
use spacesync_core::TransactionLog;
use spacesync_engine::platform::{Fault, MutationOp};
use spacesync_engine::{rollback, ApplyOutcome, PlatformError};

#[tokio::test]
async fn test_replay_runs_every_step_in_reverse_despite_failures() {
    // GIVEN: five created roles, the delete of one of them keeps failing
    let mut target = space(2, "Managed");
    let names = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];
    let mut log = TransactionLog::new();
    for (i, name) in names.iter().enumerate() {
        let id = 100 + i as u64;
        target.roles.push(role(id, name, i as i32 + 1));
        log.push(Compensation::Delete {
            target: EntityRef::new(EntityKind::Role, PlatformId(id), *name),
        });
    }
    let platform = platform(vec![target]);
    platform
        .inject(
            Fault::on_entity(
                MutationOp::DeleteRole,
                "Charlie",
                PlatformError::Forbidden("role above bot".to_string()),
            )
            .sticky(),
        )
        .await;

    // WHEN
    let mut journal = journal();
    let report = rollback::replay(platform.as_ref(), PlatformId(2), log, &ctx(), &mut journal).await;

    // THEN: all five attempted, newest first, one failure recorded
    assert_eq!(report.attempted, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_clean());
    assert_eq!(platform.attempts().await, 5);

    let deleted: Vec<String> = platform
        .mutations()
        .await
        .into_iter()
        .map(|r| r.entity)
        .collect();
    assert_eq!(deleted, vec!["Echo", "Delta", "Bravo", "Alpha"]);
    assert!(journal
        .lines()
        .iter()
        .any(|l| l.contains("delete role Charlie")));
}

#[tokio::test]
async fn test_apply_failure_after_n_mutations_leaves_n_compensations() {
    // GIVEN: three roles to create, the fourth mutation fails
    let mut source = space(1, "Reference");
    for (i, name) in ["Alpha", "Bravo", "Charlie", "Delta"].iter().enumerate() {
        source.roles.push(role(11 + i as u64, name, 1));
    }
    let target = space(2, "Managed");
    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::at_mutation(
            4,
            PlatformError::Other("gateway timeout".to_string()),
        ))
        .await;

    // WHEN
    let report = apply(&platform, options(false, true)).await;

    // THEN
    assert_eq!(report.outcome, ApplyOutcome::RolledBack);
    assert_eq!(report.compensations, 3);
    let rollback = report.rollback.unwrap();
    assert_eq!((rollback.attempted, rollback.succeeded), (3, 3));

    let records = platform.mutations().await;
    let created: Vec<PlatformId> = records
        .iter()
        .filter(|r| r.op == MutationOp::CreateRole)
        .filter_map(|r| r.id)
        .collect();
    let deleted: Vec<PlatformId> = records
        .iter()
        .filter(|r| r.op == MutationOp::DeleteRole)
        .filter_map(|r| r.id)
        .collect();
    let mut reversed = created.clone();
    reversed.reverse();
    assert_eq!(deleted, reversed);
}

#[tokio::test]
async fn test_edit_rollback_restores_prior_values() {
    let mut source = space(1, "Reference");
    let mut officer = role(11, "Officer", 1);
    officer.color = 0x00ff00;
    officer.hoist = true;
    source.roles.push(officer);
    source.channels.push(text_channel(40, "general", 0, None));

    let mut target = space(2, "Managed");
    let mut existing = role(21, "Officer", 1);
    existing.color = 0xff0000;
    target.roles.push(existing);

    let platform = platform(vec![source, target]);
    platform
        .inject(Fault::on(
            MutationOp::CreateChannel,
            PlatformError::Forbidden("missing manage channels".to_string()),
        ))
        .await;

    let report = apply(&platform, options(false, true)).await;
    assert_eq!(report.outcome, ApplyOutcome::RolledBack);

    let target = platform.space(PlatformId(2)).await.unwrap();
    let restored = target.role(PlatformId(21)).unwrap();
    assert_eq!(restored.color, 0xff0000);
    assert!(!restored.hoist);
}
