//! Messaging surface used by the progress reporter.

use std::sync::Mutex;

use async_trait::async_trait;
use spacesync_core::status_board::BoardRender;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Surface write forbidden: {0}")]
    Forbidden(String),

    #[error("Surface write failed: {0}")]
    Failed(String),
}

/// Handle of the one message a run keeps editing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub String);

#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn create_message(&self, render: &BoardRender) -> Result<MessageHandle, SurfaceError>;

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        render: &BoardRender,
    ) -> Result<(), SurfaceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Edit,
}

#[derive(Debug, Clone)]
pub struct SurfaceWrite {
    pub kind: WriteKind,
    pub render: BoardRender,
}

#[derive(Debug, Default)]
struct SurfaceState {
    writes: Vec<SurfaceWrite>,
    fail_create: bool,
    fail_edits: bool,
}

/// Records every write; can be told to refuse them
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_create = fail;
        }
    }

    pub fn fail_edits(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_edits = fail;
        }
    }

    pub fn writes(&self) -> Vec<SurfaceWrite> {
        self.state
            .lock()
            .map(|s| s.writes.clone())
            .unwrap_or_default()
    }

    pub fn edit_count(&self) -> usize {
        self.writes()
            .iter()
            .filter(|w| w.kind == WriteKind::Edit)
            .count()
    }

    /// The most recent render written, created or edited
    pub fn last_render(&self) -> Option<BoardRender> {
        self.writes().last().map(|w| w.render.clone())
    }
}

#[async_trait]
impl StatusSurface for MemorySurface {
    async fn create_message(&self, render: &BoardRender) -> Result<MessageHandle, SurfaceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| SurfaceError::Failed(e.to_string()))?;
        if state.fail_create {
            return Err(SurfaceError::Forbidden("cannot post here".to_string()));
        }
        state.writes.push(SurfaceWrite {
            kind: WriteKind::Create,
            render: render.clone(),
        });
        Ok(MessageHandle(format!("status-{}", state.writes.len())))
    }

    async fn edit_message(
        &self,
        _handle: &MessageHandle,
        render: &BoardRender,
    ) -> Result<(), SurfaceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| SurfaceError::Failed(e.to_string()))?;
        if state.fail_edits {
            return Err(SurfaceError::Forbidden("message edit revoked".to_string()));
        }
        state.writes.push(SurfaceWrite {
            kind: WriteKind::Edit,
            render: render.clone(),
        });
        Ok(())
    }
}
