//! The publishing capability the consumer hands its buffer to.
//!
//! The consumer knows nothing about transports. It calls `Publisher::publish`
//! with everything buffered and inspects the error, if any, with
//! `is_recoverable`. Recoverable failures keep the buffer for another try;
//! anything else discards it.

use crate::metric::Metric;
use std::error;
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

mod console;
mod null;

pub use self::console::Console;
pub use self::null::Null;

/// Deadline carried through to a publisher.
///
/// The consumer does not cancel publishes. A publisher that honors the
/// context checks `Context::check` before and during slow work.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// A context that never expires.
    pub fn background() -> Context {
        Context { deadline: None }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Context {
        Context {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// The instant past which work should be abandoned, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means no deadline was set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| {
            let now = Instant::now();
            if d > now {
                d - now
            } else {
                Duration::from_secs(0)
            }
        })
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Fail with a recoverable error if the deadline has passed.
    pub fn check(&self) -> Result<(), PublishError> {
        if self.is_expired() {
            Err(PublishError::recoverable("deadline exceeded"))
        } else {
            Ok(())
        }
    }
}

/// How a publish failure should be treated by the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient. The same metrics may succeed if tried again.
    Recoverable,
    /// The metrics will never be accepted. Retrying is pointless.
    Unrecoverable,
}

/// A failure to publish a set of metrics.
#[derive(Debug)]
pub struct PublishError {
    kind: ErrorKind,
    message: String,
}

impl PublishError {
    /// Create an error of the given kind.
    pub fn new<S>(kind: ErrorKind, message: S) -> PublishError
    where
        S: Into<String>,
    {
        PublishError {
            kind,
            message: message.into(),
        }
    }

    /// Create a transient error.
    pub fn recoverable<S>(message: S) -> PublishError
    where
        S: Into<String>,
    {
        PublishError::new(ErrorKind::Recoverable, message)
    }

    /// Create a permanent error.
    pub fn unrecoverable<S>(message: S) -> PublishError
    where
        S: Into<String>,
    {
        PublishError::new(ErrorKind::Unrecoverable, message)
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl error::Error for PublishError {}

impl From<io::Error> for PublishError {
    fn from(err: io::Error) -> PublishError {
        let kind = match err.kind() {
            io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => ErrorKind::Recoverable,
            _ => ErrorKind::Unrecoverable,
        };
        PublishError::new(kind, err.to_string())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> PublishError {
        PublishError::unrecoverable(err.to_string())
    }
}

/// Whether a publish failure leaves the metrics worth keeping.
pub fn is_recoverable(err: &PublishError) -> bool {
    err.kind == ErrorKind::Recoverable
}

/// A sink for the consumer's buffered metrics.
pub trait Publisher {
    /// Deliver `metrics` to wherever this publisher delivers.
    ///
    /// An `Ok` return means the metrics are durably someone else's problem.
    fn publish(&mut self, ctx: &Context, metrics: &[Metric]) -> Result<(), PublishError>;
}

impl<'a, P> Publisher for &'a mut P
where
    P: Publisher + ?Sized,
{
    fn publish(&mut self, ctx: &Context, metrics: &[Metric]) -> Result<(), PublishError> {
        (**self).publish(ctx, metrics)
    }
}

impl<P> Publisher for Box<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&mut self, ctx: &Context, metrics: &[Metric]) -> Result<(), PublishError> {
        (**self).publish(ctx, metrics)
    }
}
