use chrono::{DateTime, Utc};

/// A single observation of a measurable quantity.
///
/// The timestamp is taken at creation and carried at full precision, but it
/// serializes to whole seconds. Two readings inside the same second therefore
/// land on the same point of a `Metric`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// The observed value.
    pub value: f64,
    /// When the value was observed.
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a new reading stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use meterbuf::metric::Reading;
    ///
    /// let r = Reading::new(12.0);
    ///
    /// assert_eq!(12.0, r.value);
    /// ```
    pub fn new(value: f64) -> Reading {
        Reading::at(Utc::now(), value)
    }

    /// Create a new reading observed at `timestamp`
    pub fn at(timestamp: DateTime<Utc>, value: f64) -> Reading {
        Reading { value, timestamp }
    }

    /// The `[timestamp_seconds, value]` point for this reading.
    pub fn serialize(&self) -> Vec<f64> {
        vec![self.timestamp.timestamp() as f64, self.value]
    }
}
