//! Fixed-size pool of named worker threads fed by a FIFO job queue

use crate::{ClipError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

pub(crate) struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawn `size` threads named `"{name} Thread #n"`
    pub(crate) fn new(size: usize, name: &str) -> Result<Self> {
        if size == 0 {
            return Err(ClipError::InvalidArgument(
                "worker pool needs at least one thread".into(),
            ));
        }

        let (sender, receiver) = unbounded::<Job>();
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(size);
        for id in 1..=size {
            let receiver = receiver.clone();
            let counters = Arc::clone(&counters);
            let worker = thread::Builder::new()
                .name(format!("{name} Thread #{id}"))
                .spawn(move || worker_loop(receiver, counters))
                .map_err(|e| {
                    ClipError::ResourceUnavailable(format!("Failed to spawn worker thread: {e}"))
                })?;
            workers.push(worker);
        }

        Ok(WorkerPool {
            sender: Some(sender),
            workers,
            counters,
        })
    }

    /// Queue a job; it runs once a thread is free
    pub(crate) fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ClipError::ResourceUnavailable("worker pool is shut down".into()))?;

        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(Box::new(job)).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(ClipError::ResourceUnavailable(
                "all worker threads have exited".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn size(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub(crate) fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    /// Close the queue, let queued jobs run, and join every thread
    pub(crate) fn join(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked outside of a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets idle threads exit; busy ones finish on their own.
        self.sender.take();
    }
}

fn worker_loop(receiver: Receiver<Job>, counters: Arc<Counters>) {
    for job in receiver.iter() {
        counters.queued.fetch_sub(1, Ordering::SeqCst);
        counters.active.fetch_add(1, Ordering::SeqCst);

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(
                thread = thread::current().name().unwrap_or("worker"),
                "playback job panicked"
            );
        }

        counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}
