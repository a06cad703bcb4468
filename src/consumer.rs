//! The consumer owns the metric buffer.
//!
//! Metrics arrive over an unbounded channel drained by a single background
//! thread and are folded into one `Metric` per identity. A driver empties the
//! buffer either with `Consumer::flush`, which always clears, or with
//! `Consumer::publish`, which clears only once the publisher has taken the
//! metrics or they are beyond saving.
//!
//! Every access to the buffer goes through one mutex. `publish` holds it for
//! the whole publisher call, so a slow publisher stalls ingestion until it
//! returns.

use crate::metric::Metric;
use crate::publisher::{is_recoverable, Context, PublishError, Publisher};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Running totals of publish outcomes, counted in metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Metrics handed off to a publisher.
    pub published: usize,
    /// Metrics retained after a recoverable publish error. A metric retained
    /// twice counts twice.
    pub retained: usize,
    /// Metrics discarded after an unrecoverable publish error.
    pub discarded: usize,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicUsize,
    retained: AtomicUsize,
    discarded: AtomicUsize,
}

/// Failure of `Consumer::publish`.
#[derive(Debug)]
pub enum Error {
    /// The publisher failed recoverably. The `count` metrics it was handed
    /// are still buffered.
    Publish {
        /// Number of metrics that failed to publish.
        count: usize,
        /// What the publisher reported.
        source: PublishError,
    },
    /// The publisher failed for good. The buffer has been cleared.
    Unrecoverable(PublishError),
}

impl Error {
    /// Whether the buffered metrics survived the failure.
    pub fn is_recoverable(&self) -> bool {
        match *self {
            Error::Publish { .. } => true,
            Error::Unrecoverable(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Publish { count, ref source } => {
                write!(f, "error publishing {} metrics, {}", count, source)
            }
            Error::Unrecoverable(ref source) => write!(f, "{}", source),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Publish { ref source, .. } => Some(source),
            Error::Unrecoverable(ref source) => Some(source),
        }
    }
}

/// The metric buffer. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct Consumer {
    metrics: Arc<Mutex<HashMap<String, Metric>>>,
    counters: Arc<Counters>,
}

impl Consumer {
    /// Create a new, empty Consumer
    pub fn new() -> Consumer {
        Consumer::default()
    }

    /// Start consuming, returning the channel to feed metrics into
    ///
    /// The background thread runs until every clone of the returned sender
    /// has been dropped.
    pub fn run(&self) -> mpsc::Sender<Metric> {
        self.spawn().0
    }

    /// As `run`, also returning the handle of the consumption thread
    ///
    /// Joining the handle after dropping every sender guarantees that all
    /// sent metrics have been folded into the buffer.
    pub fn spawn(&self) -> (mpsc::Sender<Metric>, thread::JoinHandle<()>) {
        debug!("Starting metric consumer");

        let (snd, rcv) = mpsc::channel::<Metric>();
        let consumer = self.clone();
        let handle = thread::spawn(move || {
            for metric in rcv {
                consumer.consume(metric);
            }
            debug!("Metric channel closed, consumer exiting");
        });
        (snd, handle)
    }

    /// Drain the buffer
    ///
    /// Every buffered metric is returned, in no particular order, and the
    /// buffer is left empty regardless of what the caller does next.
    pub fn flush(&self) -> Vec<Metric> {
        let drained = mem::replace(&mut *self.lock(), HashMap::new());
        drained.into_iter().map(|(_, metric)| metric).collect()
    }

    /// Publish the buffer through `publisher`
    ///
    /// An empty buffer is a success that never reaches the publisher. When
    /// the publisher fails recoverably the buffer is kept whole and
    /// `Error::Publish` names how many metrics failed. On success, or on an
    /// unrecoverable failure, the buffer is cleared.
    pub fn publish<P>(&self, ctx: &Context, publisher: &mut P) -> Result<(), Error>
    where
        P: Publisher + ?Sized,
    {
        let mut buffer = self.lock();

        let metrics: Vec<Metric> = buffer.values().cloned().collect();
        if metrics.is_empty() {
            debug!("No metrics to publish, metrics_count: 0");
            return Ok(());
        }
        let count = metrics.len();

        match publisher.publish(ctx, &metrics) {
            Ok(()) => {
                self.counters.published.fetch_add(count, Ordering::Relaxed);
                debug!("Published metrics, metrics_count: {}", count);
                *buffer = HashMap::new();
                Ok(())
            }
            Err(err) => {
                if is_recoverable(&err) {
                    self.counters.retained.fetch_add(count, Ordering::Relaxed);
                    warn!("Retaining {} metrics after publish error: {}", count, err);
                    Err(Error::Publish { count, source: err })
                } else {
                    self.counters.discarded.fetch_add(count, Ordering::Relaxed);
                    error!("Discarding {} metrics after publish error: {}", count, err);
                    *buffer = HashMap::new();
                    Err(Error::Unrecoverable(err))
                }
            }
        }
    }

    /// Publish outcomes so far, shared by every clone.
    pub fn stats(&self) -> Stats {
        Stats {
            published: self.counters.published.load(Ordering::Relaxed),
            retained: self.counters.retained.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }

    /// Number of distinct series buffered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn consume(&self, mut metric: Metric) {
        let id = metric.id();
        match self.lock().entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(metric),
            Entry::Vacant(entry) => {
                metric.normalize();
                entry.insert(metric);
            }
        }
    }

    fn lock(&self) -> MutexGuard<HashMap<String, Metric>> {
        // A panicking publisher must not take the buffer down with it.
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
