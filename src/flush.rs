//! The source of all publish pulses. See `FlushTimer::run` for more details.

use crate::consumer::{self, Consumer};
use crate::publisher::{Context, Publisher};
use std::thread::sleep;
use std::time::Duration;

/// Periodically publishes a `Consumer` through a `Publisher`.
pub struct FlushTimer<P> {
    consumer: Consumer,
    publisher: P,
    interval: Duration,
}

impl<P> FlushTimer<P>
where
    P: Publisher,
{
    /// Create a new FlushTimer. This will not produce a new thread, that must
    /// be managed by the end-user.
    pub fn new(consumer: Consumer, publisher: P, interval: Duration) -> FlushTimer<P> {
        FlushTimer {
            consumer,
            publisher,
            interval,
        }
    }

    /// Publish once, giving the publisher one interval to finish
    ///
    /// Recoverable failures are logged and swallowed: the metrics are still
    /// buffered and ride along with the next tick. Unrecoverable failures
    /// are returned.
    pub fn tick(&mut self) -> Result<(), consumer::Error> {
        let ctx = Context::with_timeout(self.interval);
        match self.consumer.publish(&ctx, &mut self.publisher) {
            Err(ref e) if e.is_recoverable() => {
                warn!("Publish will be retried next interval: {}", e);
                Ok(())
            }
            res => res,
        }
    }

    /// Publish every interval until an unrecoverable failure
    pub fn run(&mut self) -> Result<(), consumer::Error> {
        loop {
            sleep(self.interval);
            self.tick()?;
        }
    }

    /// Give back the publisher.
    pub fn into_publisher(self) -> P {
        self.publisher
    }
}
