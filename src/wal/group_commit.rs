//! Group Commit
//!
//! Background thread that forces the log to disk on a fixed cadence, so
//! foreground appends never wait on fsync. An entry appended at time `t`
//! is durable by `t + interval` (plus the duration of one sync).

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, error, info, trace};

use crate::error::Result;

use super::LogWriter;

/// Counters reported when the group-commit thread stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCommitStats {
    /// Syncs that completed
    pub syncs: u64,
    /// Syncs that returned an error
    pub failures: u64,
}

/// Handle on a running group-commit thread
///
/// Dropping the handle stops the thread and waits for it.
pub struct GroupCommitter {
    /// Shutdown signal; dropping it also wakes the thread
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<GroupCommitStats>>,
}

impl GroupCommitter {
    /// Start syncing `log` every `interval`
    pub fn spawn(log: Arc<LogWriter>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("heapwal-group-commit".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "Group commit started");
                let mut stats = GroupCommitStats::default();

                loop {
                    match log.sync() {
                        Ok(()) => {
                            stats.syncs += 1;
                            trace!(synced_lsn = log.synced_lsn(), "Group commit sync");
                        }
                        Err(e) => {
                            stats.failures += 1;
                            error!(error = %e, "Group commit sync failed");
                        }
                    }

                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                info!(syncs = stats.syncs, failures = stats.failures, "Group commit stopped");
                stats
            })?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread, wait for it to exit and return its counters
    pub fn stop(mut self) -> GroupCommitStats {
        self.stop_inner()
    }

    /// Whether the thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop_inner(&mut self) -> GroupCommitStats {
        if let Some(tx) = self.shutdown_tx.take() {
            // The thread may already be gone; a failed send is fine.
            let _ = tx.send(());
        }

        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(stats) => stats,
                Err(_) => {
                    error!("Group commit thread panicked");
                    GroupCommitStats::default()
                }
            },
            None => {
                debug!("Group commit already stopped");
                GroupCommitStats::default()
            }
        }
    }
}

impl Drop for GroupCommitter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop_inner();
        }
    }
}
