use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, Sender};
use parking_lot::Mutex;

use super::store::PlayerState;
use super::types::PositionReport;

/// Receives a position snapshot on the reporter thread. Must not block.
pub type PositionCallback = Arc<dyn Fn(PositionReport) + Send + Sync + 'static>;

/// Background thread sampling track positions at a fixed period.
pub struct PositionReporter {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PositionReporter {
    pub fn spawn(
        shared: Arc<Mutex<PlayerState>>,
        interval: Duration,
        callback: Option<PositionCallback>,
    ) -> std::io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(interval);

        let handle = std::thread::Builder::new()
            .name("position-reporter".into())
            .spawn(move || loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        let Some(callback) = &callback else { continue };
                        // Lock is released before the callback runs.
                        let report = shared.lock().snapshot();
                        callback(report);
                    }
                }
            })?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the select.
        self.shutdown_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Position reporter thread panicked");
            }
        }
    }
}

impl Drop for PositionReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
