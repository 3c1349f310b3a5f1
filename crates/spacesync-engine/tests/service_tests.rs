#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use spacesync_core::core_types::{OperatorId, RunContext};
use spacesync_core::model::PlatformId;
use spacesync_core::{ConfirmationEvent, ConfirmationState, Phase, SyncError};
use spacesync_engine::workflow::{ConfirmationCall, RecordingConfirmation};
use spacesync_engine::{
    EngineConfig, MemoryPlatform, MemorySettingsStore, MemorySurface, RunOutcome, SyncService,
};
use tokio::sync::mpsc;

const HOME: PlatformId = PlatformId(9);
const OPERATOR: OperatorId = OperatorId(7);

struct Harness {
    service: Arc<SyncService>,
    platform: Arc<MemoryPlatform>,
    surface: Arc<MemorySurface>,
}

async fn harness() -> Harness {
    let mut source = space(1, "Reference");
    let mut officer = role(11, "Officer", 1);
    officer.hoist = true;
    source.roles.push(officer);
    source.categories.push(category(30, "Clan Wars", 0));
    source.channels.push(text_channel(40, "general", 0, Some(30)));
    let target = space(2, "Managed");

    let platform = platform(vec![source, target]);
    let surface = Arc::new(MemorySurface::new());
    let service = SyncService::new(
        platform.clone(),
        Arc::new(MemorySettingsStore::new()),
        surface.clone(),
        EngineConfig::default(),
    );
    service
        .configure_spaces(HOME, PlatformId(1), PlatformId(2))
        .await
        .unwrap();
    Harness {
        service: Arc::new(service),
        platform,
        surface,
    }
}

#[tokio::test(start_paused = true)]
async fn test_accepted_run_applies_and_reports_complete() {
    // GIVEN
    let h = harness().await;
    let confirm = RecordingConfirmation::new();
    let (tx, rx) = mpsc::channel(4);
    tx.send(ConfirmationEvent::Accept { actor: OPERATOR })
        .await
        .unwrap();

    // WHEN
    let outcome = h
        .service
        .run(HOME, &RunContext::new(OPERATOR), &confirm, rx)
        .await
        .unwrap();

    // THEN
    let RunOutcome::Applied(report) = outcome else {
        panic!("expected an applied run");
    };
    assert!(report.is_success());
    assert_eq!(report.counts.created, 3);

    let calls = confirm.calls();
    assert!(matches!(&calls[0], ConfirmationCall::Preview { rendered, .. } if rendered.contains("Officer")));
    assert_eq!(calls[1], ConfirmationCall::Acknowledge);

    let last = h.surface.last_render().unwrap();
    assert_eq!(last.phase, Phase::Complete);
    assert!(last.body.contains("3 created"));

    let settings = h.service.settings(HOME).await.unwrap();
    assert_eq!(settings.last_operator_id, Some(OPERATOR));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_mutates_nothing() {
    let h = harness().await;
    let confirm = RecordingConfirmation::new();
    let (tx, rx) = mpsc::channel(4);
    tx.send(ConfirmationEvent::Cancel { actor: OPERATOR })
        .await
        .unwrap();

    let outcome = h
        .service
        .run(HOME, &RunContext::new(OPERATOR), &confirm, rx)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(h.platform.mutations().await.is_empty());
    assert!(h.surface.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_preview_times_out() {
    let h = harness().await;
    let confirm = RecordingConfirmation::new();
    let (_tx, rx) = mpsc::channel(4);

    let outcome = h
        .service
        .run(HOME, &RunContext::new(OPERATOR), &confirm, rx)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::TimedOut));
    assert_eq!(
        confirm.calls().last(),
        Some(&ConfirmationCall::Announce {
            state: ConfirmationState::TimedOut
        })
    );
    assert!(h.platform.mutations().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_run_on_same_target_rejected() {
    // GIVEN: a first run waiting for its confirmation
    let h = harness().await;
    let (tx, rx) = mpsc::channel(4);
    let service = h.service.clone();
    let first = tokio::spawn(async move {
        let confirm = RecordingConfirmation::new();
        service
            .run(HOME, &RunContext::new(OPERATOR), &confirm, rx)
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // WHEN
    let (_tx2, rx2) = mpsc::channel(4);
    let confirm = RecordingConfirmation::new();
    let err = h
        .service
        .run(HOME, &RunContext::new(OperatorId(8)), &confirm, rx2)
        .await
        .unwrap_err();

    // THEN
    assert_eq!(err, SyncError::RunInProgress { space_id: 2 });
    assert!(confirm.calls().is_empty());

    tx.send(ConfirmationEvent::Cancel { actor: OPERATOR })
        .await
        .unwrap();
    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, RunOutcome::Cancelled));
}

#[tokio::test]
async fn test_inaccessible_source_is_configuration_error() {
    let h = harness().await;
    h.service
        .configure_spaces(HOME, PlatformId(77), PlatformId(2))
        .await
        .unwrap();

    let err = h.service.preview(HOME, OPERATOR).await.unwrap_err();
    match err {
        SyncError::Configuration { reason } => assert!(reason.contains("not accessible")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_preview_reflects_mode_toggles() {
    let h = harness().await;
    h.service.configure_prune(HOME, true).await.unwrap();
    h.service
        .configure_sync_overwrites(HOME, false)
        .await
        .unwrap();
    h.service.configure_transactional(HOME, false).await.unwrap();

    let plan = h.service.preview(HOME, OPERATOR).await.unwrap();
    assert!(plan.mode.prune);
    assert!(!plan.mode.sync_overwrites);
    assert!(!plan.mode.transactional);
    assert_eq!(plan.diff.roles.create, vec!["Officer".to_string()]);
    assert!(h.platform.mutations().await.is_empty());
}
