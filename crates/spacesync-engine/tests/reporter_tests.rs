#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use spacesync_core::{Phase, StatusBoard};
use spacesync_engine::surface::WriteKind;
use spacesync_engine::{BoardHandle, MemorySurface, Reporter};

const PERIOD: Duration = Duration::from_secs(2);

async fn start(surface: &Arc<MemorySurface>) -> (Reporter, BoardHandle) {
    let board = BoardHandle::new(StatusBoard::new("Sync Reference -> Managed", 15));
    let reporter = Reporter::start(surface.clone(), board.clone(), PERIOD).await;
    (reporter, board)
}

#[tokio::test(start_paused = true)]
async fn test_notes_within_one_interval_coalesce_into_one_edit() {
    // GIVEN
    let surface = Arc::new(MemorySurface::new());
    let (reporter, board) = start(&surface).await;
    assert_eq!(surface.writes()[0].kind, WriteKind::Create);

    // WHEN: ten notes land inside the first interval
    for i in 0..10 {
        board.note(format!("created role R{}", i));
    }
    tokio::time::sleep(PERIOD + Duration::from_millis(500)).await;

    // THEN
    assert_eq!(surface.edit_count(), 1);
    let render = surface.last_render().unwrap();
    assert!(render.body.contains("created role R9"));

    reporter.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_quiet_interval_writes_nothing() {
    let surface = Arc::new(MemorySurface::new());
    let (reporter, board) = start(&surface).await;

    board.note("created category Clan Wars");
    tokio::time::sleep(PERIOD * 3 + Duration::from_millis(100)).await;
    assert_eq!(surface.edit_count(), 1);

    board.note("created channel general");
    tokio::time::sleep(PERIOD).await;
    assert_eq!(surface.edit_count(), 2);

    reporter.finish().await;
}

#[tokio::test(start_paused = true)]
async fn test_finish_forces_final_render() {
    let surface = Arc::new(MemorySurface::new());
    let (reporter, board) = start(&surface).await;

    board.set_phase(Phase::Complete);
    board.set_summary("1 created, 0 updated, 0 deleted");
    reporter.finish().await;

    let last = surface.last_render().unwrap();
    assert_eq!(last.phase, Phase::Complete);
    assert!(last.title.ends_with("Complete"));
    assert!(last.body.contains("1 created"));
    assert_eq!(surface.edit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edit_failures_are_swallowed() {
    let surface = Arc::new(MemorySurface::new());
    let (reporter, board) = start(&surface).await;
    surface.fail_edits(true);

    board.note("created role Officer");
    tokio::time::sleep(PERIOD * 2).await;
    board.set_phase(Phase::Failed);
    reporter.finish().await;

    assert_eq!(surface.edit_count(), 0);
    assert_eq!(board.phase(), Phase::Failed);
}
