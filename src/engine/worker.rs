//! Bounded background worker
//!
//! One thread runs repository commands so the control loop can keep serving
//! read-only queries. At most one job is in flight; submitting another while
//! busy is rejected rather than queued.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, SyncSender, TryRecvError, TrySendError};
use std::thread::{self, JoinHandle};

use super::error::{EngineError, Rejection};

type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

pub struct Worker<T: Send + 'static> {
    jobs: Option<SyncSender<Job<T>>>,
    results: Receiver<T>,
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawn the worker thread
    pub fn spawn(name: &str) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::sync_channel::<Job<T>>(1);
        let (result_tx, result_rx) = mpsc::channel();
        let busy = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::clone(&busy);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let result = {
                        // Cleared even if the job panics
                        let _guard = scopeguard::guard((), |_| {
                            in_flight.store(false, Ordering::SeqCst);
                        });
                        job()
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                tracing::debug!("worker exiting");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            busy,
            handle: Some(handle),
        })
    }

    /// Whether a job is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Queue a job; rejected with `Busy` while another one runs
    pub fn submit<F>(&self, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(EngineError::WorkerStopped)?;
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Rejection::Busy.into());
        }
        match jobs.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Rejection::Busy.into()),
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::SeqCst);
                Err(EngineError::WorkerStopped)
            }
        }
    }

    /// Result of the finished job, if any
    pub fn try_recv(&self) -> Result<Option<T>, EngineError> {
        match self.results.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EngineError::WorkerStopped),
        }
    }

    /// Block until the in-flight job finishes
    pub fn wait(&self) -> Result<T, EngineError> {
        self.results
            .recv()
            .map_err(|RecvError| EngineError::WorkerStopped)
    }
}

impl<T: Send + 'static> Drop for Worker<T> {
    fn drop(&mut self) {
        // Closing the channel ends the thread loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
