//! Background status reporting.
//!
//! Owns a thread that renders `StatusLine`s through a caller-supplied sink.
//! The control loop hands lines over with `try_send` on a bounded channel,
//! so a slow terminal or log file drops status lines instead of stalling
//! actuation.
//!
//! Dropping the reporter closes the channel; the thread drains what is
//! already queued and is joined before `drop` returns.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::status::StatusLine;

pub struct StatusReporter {
    tx: Option<xch::Sender<StatusLine>>,
    dropped: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl StatusReporter {
    pub fn spawn<F>(capacity: usize, mut sink: F) -> Self
    where
        F: FnMut(&StatusLine) + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<StatusLine>(capacity.max(1));
        let join_handle = std::thread::spawn(move || {
            for line in rx.iter() {
                sink(&line);
            }
            tracing::trace!("status reporter thread exiting cleanly");
        });
        Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
            join_handle: Some(join_handle),
        }
    }

    /// Queue a line without blocking. Returns false if it was dropped.
    pub fn offer(&self, line: StatusLine) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        match tx.try_send(line) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                tracing::debug!("status reporter gone; line discarded");
                false
            }
        }
    }

    /// Lines discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for StatusReporter {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "status reporter thread panicked during shutdown");
        }
    }
}
