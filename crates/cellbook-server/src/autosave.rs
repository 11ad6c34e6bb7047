//! Debounced auto-save requests.
//!
//! Every edit restarts a quiet-period timer. When it expires an
//! [`ServerMessage::AutoSave`] is sent, unless the previous request has
//! not been acknowledged yet, in which case that tick is dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::protocol::ServerMessage;
use crate::session::sleep_until_opt;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Edited,
    Done,
}

/// Handle to a running auto-saver task.
#[derive(Debug, Clone)]
pub struct AutoSaver {
    signals: mpsc::UnboundedSender<Signal>,
}

impl AutoSaver {
    /// Spawn the debounce task. It runs until every handle is dropped.
    pub fn spawn(quiet: Duration, events: mpsc::UnboundedSender<ServerMessage>) -> Self {
        let (signals, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(quiet, rx, events));
        Self { signals }
    }

    /// Record an edit, restarting the quiet period.
    pub fn edited(&self) {
        let _ = self.signals.send(Signal::Edited);
    }

    /// Acknowledge the outstanding auto-save.
    pub fn done(&self) {
        let _ = self.signals.send(Signal::Done);
    }
}

async fn run(
    quiet: Duration,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    events: mpsc::UnboundedSender<ServerMessage>,
) {
    let mut fire_at: Option<Instant> = None;
    let mut saving = false;

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(Signal::Edited) => fire_at = Some(Instant::now() + quiet),
                Some(Signal::Done) => saving = false,
                None => break,
            },
            _ = sleep_until_opt(fire_at) => {
                fire_at = None;
                if saving {
                    tracing::debug!("Auto-save still outstanding, skipping");
                } else {
                    saving = true;
                    let _ = events.send(ServerMessage::AutoSave);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saver(quiet_ms: u64) -> (AutoSaver, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AutoSaver::spawn(Duration::from_millis(quiet_ms), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_saves_once() {
        let (saver, mut rx) = saver(2000);
        for _ in 0..5 {
            saver.edited();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::AutoSave);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_until_done() {
        let (saver, mut rx) = saver(100);
        saver.edited();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::AutoSave);

        // Not acknowledged yet: this quiet period is dropped.
        saver.edited();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());

        saver.done();
        saver.edited();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::AutoSave);
    }
}
