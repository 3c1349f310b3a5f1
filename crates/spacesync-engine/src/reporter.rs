//! Progress reporter.
//!
//! The run appends notes to a shared [`StatusBoard`]; a periodic task
//! renders the board into one surface message only when something changed.
//! Surface failures are logged and swallowed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use spacesync_core::status_board::{BoardRender, Phase, StatusBoard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::surface::{MessageHandle, StatusSurface};

/// Shared, lock-guarded access to a run's board
#[derive(Debug, Clone)]
pub struct BoardHandle {
    board: Arc<Mutex<StatusBoard>>,
}

impl BoardHandle {
    pub fn new(board: StatusBoard) -> Self {
        Self {
            board: Arc::new(Mutex::new(board)),
        }
    }

    /// A panic while the lock was held leaves the board usable
    fn lock(&self) -> MutexGuard<'_, StatusBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn note(&self, text: impl Into<String>) {
        self.lock().note(text);
    }

    pub fn set_phase(&self, phase: Phase) {
        self.lock().set_phase(phase);
    }

    pub fn set_summary(&self, summary: impl Into<String>) {
        self.lock().set_summary(summary);
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn take_dirty(&self) -> Option<BoardRender> {
        self.lock().take_dirty()
    }

    /// Render regardless of the flag, clearing it
    pub fn force_render(&self) -> BoardRender {
        let mut board = self.lock();
        board.take_dirty();
        board.render()
    }
}

/// Every note a run emitted, in order, alongside the board
///
/// The board keeps only the newest lines; the journal keeps all of them for
/// the run report.
#[derive(Debug)]
pub struct RunJournal {
    board: BoardHandle,
    lines: Vec<String>,
}

impl RunJournal {
    pub fn new(board: BoardHandle) -> Self {
        Self {
            board,
            lines: Vec::new(),
        }
    }

    pub fn note(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.board.note(text.clone());
        self.lines.push(text);
    }

    pub fn set_phase(&self, phase: Phase) {
        self.board.set_phase(phase);
    }

    pub fn board(&self) -> &BoardHandle {
        &self.board
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// A running flush task bound to one status message
#[derive(Debug)]
pub struct Reporter {
    board: BoardHandle,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Reporter {
    /// Post the initial message and start flushing every `period`.
    ///
    /// If the message cannot be created the reporter runs headless: notes
    /// still accumulate but nothing is written.
    pub async fn start(
        surface: Arc<dyn StatusSurface>,
        board: BoardHandle,
        period: Duration,
    ) -> Self {
        let handle = match surface.create_message(&board.force_render()).await {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(op = "reporter_create", error = %err, "status surface unavailable");
                None
            }
        };

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(flush_loop(surface, board.clone(), handle, period, stop_rx));

        Self { board, stop, task }
    }

    pub fn board(&self) -> &BoardHandle {
        &self.board
    }

    /// Stop the periodic task and write one final forced render
    pub async fn finish(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(op = "reporter_finish", error = %err, "reporter task ended abnormally");
        }
    }
}

async fn flush_loop(
    surface: Arc<dyn StatusSurface>,
    board: BoardHandle,
    handle: Option<MessageHandle>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(render) = board.take_dirty() {
                    write(surface.as_ref(), handle.as_ref(), &render).await;
                }
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    write(surface.as_ref(), handle.as_ref(), &board.force_render()).await;
}

async fn write(surface: &dyn StatusSurface, handle: Option<&MessageHandle>, render: &BoardRender) {
    let Some(handle) = handle else {
        return;
    };
    if let Err(err) = surface.edit_message(handle, render).await {
        tracing::warn!(op = "reporter_flush", error = %err, "status edit failed");
    }
}
