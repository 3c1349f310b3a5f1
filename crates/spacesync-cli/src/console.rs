//! Terminal renditions of the status and confirmation surfaces.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use spacesync_core::core_types::OperatorId;
use spacesync_core::status_board::BoardRender;
use spacesync_core::{ConfirmationEvent, ConfirmationState, Plan};
use spacesync_engine::surface::{MessageHandle, SurfaceError};
use spacesync_engine::{ConfirmationSurface, StatusSurface};
use tokio::sync::mpsc;

/// Prints every board render to stderr
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl ConsoleSurface {
    fn print(render: &BoardRender) {
        eprintln!("== {} ==", render.title);
        eprintln!("{}", render.body);
    }
}

#[async_trait]
impl StatusSurface for ConsoleSurface {
    async fn create_message(&self, render: &BoardRender) -> Result<MessageHandle, SurfaceError> {
        Self::print(render);
        Ok(MessageHandle("console".to_string()))
    }

    async fn edit_message(
        &self,
        _handle: &MessageHandle,
        render: &BoardRender,
    ) -> Result<(), SurfaceError> {
        Self::print(render);
        Ok(())
    }
}

/// Shows the preview on stdout and asks on stdin
pub struct ConsoleConfirmation {
    actions: Mutex<Option<mpsc::Sender<ConfirmationEvent>>>,
    assume_yes: bool,
}

impl ConsoleConfirmation {
    pub fn new(actions: mpsc::Sender<ConfirmationEvent>, assume_yes: bool) -> Self {
        Self {
            actions: Mutex::new(Some(actions)),
            assume_yes,
        }
    }

    fn take_sender(&self) -> Option<mpsc::Sender<ConfirmationEvent>> {
        self.actions.lock().ok().and_then(|mut s| s.take())
    }
}

/// Read one answer; anything but y/yes cancels
fn prompt(operator: OperatorId) -> ConfirmationEvent {
    eprint!("Apply these changes? [y/N] ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    let answered = std::io::stdin().lock().read_line(&mut line).is_ok();
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" if answered => ConfirmationEvent::Accept { actor: operator },
        _ => ConfirmationEvent::Cancel { actor: operator },
    }
}

#[async_trait]
impl ConfirmationSurface for ConsoleConfirmation {
    async fn show_preview(
        &self,
        operator: OperatorId,
        _plan: &Plan,
        rendered: &str,
    ) -> Result<(), SurfaceError> {
        println!("{}", rendered);
        let Some(sender) = self.take_sender() else {
            return Err(SurfaceError::Failed("preview already shown".to_string()));
        };

        if self.assume_yes {
            return sender
                .send(ConfirmationEvent::Accept { actor: operator })
                .await
                .map_err(|e| SurfaceError::Failed(e.to_string()));
        }
        // Detached so an unanswered prompt cannot hold the process open
        std::thread::spawn(move || {
            let _ = sender.blocking_send(prompt(operator));
        });
        Ok(())
    }

    async fn reject_actor(&self, actor: OperatorId) {
        eprintln!("Only the operator who asked for this preview can confirm it ({})", actor);
    }

    async fn acknowledge(&self) {
        eprintln!("Applying...");
    }

    async fn announce(&self, state: ConfirmationState) {
        match state {
            ConfirmationState::Cancelled => eprintln!("Sync cancelled"),
            ConfirmationState::TimedOut => eprintln!("No answer in time; sync abandoned"),
            _ => {}
        }
    }
}
