use std::{
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, warn};

use super::{IndexError, IndexingEngine};

/// Background thread that runs a pass on every poll tick.
///
/// Stopping (or dropping) the poller waits for a running pass to finish.
#[derive(Debug)]
pub struct Poller {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl IndexingEngine {
    /// Start ticking every `poll_interval`; each tick runs a pass when the watcher is dirty.
    pub fn start_polling(self: &Arc<Self>) -> Result<Poller, IndexError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let engine = Arc::clone(self);
        let interval = self.options.poll_interval;
        let handle = thread::Builder::new()
            .name("tuna-indexer-poll".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(err) = engine.run_pass() {
                                warn!(error = %err, "Scheduled indexing pass failed");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Indexer poll loop stopped");
            })
            .map_err(IndexError::Spawn)?;
        debug!(interval_ms = interval.as_millis() as u64, "Indexer poll loop started");
        Ok(Poller {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl Poller {
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to exit and join it.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Indexer poll thread panicked");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
