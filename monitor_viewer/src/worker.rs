use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Cooperative stop signal handed to a worker body.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Sleep up to `duration`, waking early once the flag is set. Returns
    /// whether the worker should keep going.
    pub fn sleep(&self, duration: Duration) -> bool {
        let step = Duration::from_millis(20);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_set() {
                return false;
            }
            let nap = remaining.min(step);
            thread::sleep(nap);
            remaining -= nap;
        }
        !self.is_set()
    }
}

/// A named background thread that is asked to stop and then joined with a
/// bounded wait.
pub struct Worker {
    name: String,
    stop: StopFlag,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let stop = StopFlag::default();
        let (done_tx, done) = mpsc::channel();
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                body(thread_stop);
                let _ = done_tx.send(());
            })
            .with_context(|| format!("spawning {name} thread"))?;
        log::debug!("{name} thread started");
        Ok(Self {
            name: name.to_string(),
            stop,
            done,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Signal the worker and wait at most [`JOIN_TIMEOUT`]. Returns whether
    /// the thread was joined; a worker that overruns is left detached.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        self.stop.set();
        match self.done.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    log::warn!("{} thread panicked", self.name);
                }
                log::debug!("{} thread joined", self.name);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "{} thread did not stop within {:?}; detaching",
                    self.name,
                    JOIN_TIMEOUT
                );
                false
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
