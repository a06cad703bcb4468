//! `metric` is the data model of meterbuf. A `Metric` is one named, tagged
//! gauge series together with the `[timestamp_seconds, value]` points
//! collected for it. Its serialized form is the wire shape publishers hand to
//! the ingestion endpoint:
//!
//! ```json
//! {"interval":60,"metric":"app.queries","points":[[1551441601.0,7.0]],
//!  "tags":["env:prod"],"type":"gauge"}
//! ```

use std::collections::HashMap;
use std::mem;

mod reading;

pub use self::reading::Reading;

/// Separator between the name and each tag of an identity.
pub const IDENTITY_SEPARATOR: char = ';';

/// A `[timestamp_seconds, value]` pair.
///
/// Points are kept as plain vectors because that is what arrives off the
/// wire. A point of any other length is malformed and is dropped on merge.
pub type Point = Vec<f64>;

/// The kind of series a `Metric` represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// The last value observed in an interval is the value of the interval.
    Gauge,
}

impl Default for Kind {
    fn default() -> Kind {
        Kind::Gauge
    }
}

/// One named, tagged time series and its collected points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// The collection interval of the series, in seconds.
    pub interval: u64,
    /// The fully qualified name of the series.
    #[serde(rename = "metric")]
    pub name: String,
    /// Collected points, in insertion order. Each timestamp appears at most
    /// once.
    pub points: Vec<Point>,
    /// Tags of the series, sorted by the producer.
    pub tags: Vec<String>,
    /// Series kind. Only gauges are produced.
    #[serde(rename = "type", default)]
    pub kind: Kind,
}

impl Metric {
    /// Create a gauge with no points
    ///
    /// # Examples
    ///
    /// ```
    /// use meterbuf::metric::{Kind, Metric};
    ///
    /// let m = Metric::gauge("app.queries", vec!["env:prod".into()], 60);
    ///
    /// assert_eq!(Kind::Gauge, m.kind);
    /// assert!(m.is_empty());
    /// ```
    pub fn gauge<S>(name: S, tags: Vec<String>, interval: u64) -> Metric
    where
        S: Into<String>,
    {
        Metric {
            interval,
            name: name.into(),
            points: Vec::new(),
            tags,
            kind: Kind::Gauge,
        }
    }

    /// The identity of the series
    ///
    /// Two metrics with the same name and the same set of tags share an
    /// identity, no matter what order the tags are stored in. Identity is the
    /// key the consumer buffers under.
    ///
    /// # Examples
    ///
    /// ```
    /// use meterbuf::metric::Metric;
    ///
    /// let m = Metric::gauge("foo", vec!["b:2".into(), "a:1".into()], 60);
    ///
    /// assert_eq!("foo;a:1;b:2", m.id());
    /// ```
    pub fn id(&self) -> String {
        let mut tags: Vec<&str> = self.tags.iter().map(|t| t.as_str()).collect();
        tags.sort_unstable();

        let cap = tags.iter().fold(self.name.len(), |acc, t| acc + t.len() + 1);
        let mut id = String::with_capacity(cap);
        id.push_str(&self.name);
        for tag in tags {
            id.push(IDENTITY_SEPARATOR);
            id.push_str(tag);
        }
        id
    }

    /// Number of points held.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the metric holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fold the points of `incoming` into `self`
    ///
    /// A point whose timestamp is already present overwrites the stored
    /// value, so the most recently merged value for a second wins. New
    /// timestamps are appended. Malformed points are skipped. The name, tags
    /// and interval of `incoming` are not consulted; callers merge only
    /// metrics of the same identity.
    pub fn merge(&mut self, incoming: Metric) {
        self.merge_points(incoming.points)
    }

    /// Fold a single reading into `self`
    ///
    /// This is equivalent to merging a one-point metric built from `reading`.
    ///
    /// # Examples
    ///
    /// ```
    /// extern crate chrono;
    /// extern crate meterbuf;
    ///
    /// use chrono::{TimeZone, Utc};
    /// use meterbuf::metric::{Metric, Reading};
    ///
    /// let ts = Utc.timestamp(1_551_441_601, 0);
    /// let mut m = Metric::gauge("foo", vec![], 60);
    /// m.append(Reading::at(ts, 5.0));
    /// m.append(Reading::at(ts, 7.0));
    ///
    /// assert_eq!(vec![vec![1_551_441_601.0, 7.0]], m.points);
    /// ```
    pub fn append(&mut self, reading: Reading) {
        self.merge_points(vec![reading.serialize()])
    }

    /// Drop malformed points and collapse repeated timestamps in place.
    pub(crate) fn normalize(&mut self) {
        let points = mem::replace(&mut self.points, Vec::new());
        self.merge_points(points)
    }

    fn merge_points(&mut self, points: Vec<Point>) {
        // timestamp bits -> offset into self.points
        let mut index: HashMap<u64, usize> = HashMap::with_capacity(self.points.len());
        for (idx, point) in self.points.iter().enumerate() {
            if point.len() == 2 {
                index.insert(timestamp_key(point[0]), idx);
            }
        }

        for point in points {
            if point.len() != 2 {
                trace!("dropping malformed point {:?} for {}", point, self.name);
                continue;
            }
            let key = timestamp_key(point[0]);
            match index.get(&key) {
                Some(&idx) => self.points[idx][1] = point[1],
                None => {
                    index.insert(key, self.points.len());
                    self.points.push(point);
                }
            }
        }
    }
}

/// Points at `0.0` and `-0.0` share a key.
fn timestamp_key(ts: f64) -> u64 {
    (ts + 0.0).to_bits()
}
