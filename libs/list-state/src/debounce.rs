use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Input side of a search debouncer.
#[derive(Clone, Debug)]
pub struct SearchInput {
    tx: mpsc::UnboundedSender<String>,
}

impl SearchInput {
    /// Returns false once the debouncer task has stopped.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}

/// Spawn a task that forwards search text once `quiet` has passed without a newer
/// value. A newer value cancels the pending one. Dropping every `SearchInput`
/// discards anything still pending and ends the task.
pub fn spawn_debouncer(quiet: Duration) -> (SearchInput, mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        while let Some(mut latest) = in_rx.recv().await {
            loop {
                tokio::select! {
                    next = in_rx.recv() => match next {
                        Some(text) => latest = text,
                        None => return,
                    },
                    _ = tokio::time::sleep(quiet) => {
                        if out_tx.send(latest).is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    });

    (SearchInput { tx: in_tx }, out_rx, handle)
}
