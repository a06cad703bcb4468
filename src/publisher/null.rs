use crate::metric::Metric;
use crate::publisher::{Context, PublishError, Publisher};

/// Null publisher
///
/// This publisher is intended for testing and demonstration. Every `Metric`
/// it receives is dropped and the publish always succeeds.
#[derive(Debug, Default)]
pub struct Null {
    published: usize,
}

impl Null {
    /// Create a new Null publisher
    pub fn new() -> Null {
        Null::default()
    }

    /// Total metrics discarded so far.
    pub fn published(&self) -> usize {
        self.published
    }
}

impl Publisher for Null {
    fn publish(&mut self, _ctx: &Context, metrics: &[Metric]) -> Result<(), PublishError> {
        self.published += metrics.len();
        trace!("discarding {} metrics", metrics.len());
        Ok(())
    }
}
