//! Producer turns single readings into `Metric`s ready for the consumer.

use crate::metric::{Metric, Reading};
use std::time::Duration;

/// Separator between the components of a metric name.
pub const NAME_SEPARATOR: char = '.';

/// The configuration a `Producer` stamps onto every metric it makes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProducerConfig {
    /// Prepended to every metric name. May be empty.
    pub metric_prefix: String,
    /// Added to the caller's tags of every metric.
    pub metric_tags: Vec<String>,
    /// The collection interval reported with every metric.
    pub metric_interval: Duration,
}

impl Default for ProducerConfig {
    fn default() -> ProducerConfig {
        ProducerConfig {
            metric_prefix: String::new(),
            metric_tags: Vec::new(),
            metric_interval: Duration::from_secs(60),
        }
    }
}

/// Stateless factory for single-point gauges.
#[derive(Clone, Debug)]
pub struct Producer {
    config: ProducerConfig,
}

impl Producer {
    /// Create a new Producer
    pub fn new(config: ProducerConfig) -> Producer {
        Producer { config }
    }

    /// Make a one-point gauge for `name` out of `reading`
    ///
    /// The configured tags are appended to `tags` and the whole set is sorted.
    /// The name is qualified with the configured prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use meterbuf::metric::Reading;
    /// use meterbuf::producer::{Producer, ProducerConfig};
    ///
    /// let producer = Producer::new(ProducerConfig {
    ///     metric_prefix: "app".into(),
    ///     metric_tags: vec!["env:prod".into()],
    ///     ..Default::default()
    /// });
    /// let m = producer.produce(".queries", Reading::new(1.0), vec!["az:1".into()]);
    ///
    /// assert_eq!("app.queries", m.name);
    /// assert_eq!(vec!["az:1", "env:prod"], m.tags);
    /// assert_eq!(60, m.interval);
    /// ```
    pub fn produce(&self, name: &str, reading: Reading, mut tags: Vec<String>) -> Metric {
        tags.extend(self.config.metric_tags.iter().cloned());
        tags.sort();

        let mut metric = Metric::gauge(
            full_metric_name(&self.config.metric_prefix, name),
            tags,
            self.config.metric_interval.as_secs(),
        );
        metric.points.push(reading.serialize());
        metric
    }
}

/// Join `prefix` and `name` with exactly one separator between them.
pub fn full_metric_name(prefix: &str, name: &str) -> String {
    let name = if name.starts_with(NAME_SEPARATOR) {
        &name[NAME_SEPARATOR.len_utf8()..]
    } else {
        name
    };
    let mut full = String::with_capacity(prefix.len() + name.len() + 1);
    full.push_str(prefix);
    if !prefix.is_empty() && !prefix.ends_with(NAME_SEPARATOR) {
        full.push(NAME_SEPARATOR);
    }
    full.push_str(name);
    full
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn producer(prefix: &str, tags: &[&str]) -> Producer {
        Producer::new(ProducerConfig {
            metric_prefix: prefix.to_string(),
            metric_tags: tags.iter().map(|t| t.to_string()).collect(),
            metric_interval: Duration::from_secs(30),
        })
    }

    #[test]
    fn full_name_joins_once() {
        assert_eq!("app.queries", full_metric_name("app", "queries"));
        assert_eq!("app.queries", full_metric_name("app.", "queries"));
        assert_eq!("app.queries", full_metric_name("app", ".queries"));
        assert_eq!("app.queries", full_metric_name("app.", ".queries"));
    }

    #[test]
    fn full_name_strips_one_leading_separator() {
        assert_eq!("app..queries", full_metric_name("app", "..queries"));
        assert_eq!(".queries", full_metric_name("", "..queries"));
    }

    #[test]
    fn full_name_without_prefix() {
        assert_eq!("queries", full_metric_name("", "queries"));
        assert_eq!("queries", full_metric_name("", ".queries"));
    }

    #[test]
    fn produce_single_point_gauge() {
        let ts = Utc.timestamp(1_234, 0);
        let m = producer("svc", &[]).produce("load", Reading::at(ts, 0.5), vec![]);

        assert_eq!("svc.load", m.name);
        assert_eq!(30, m.interval);
        assert_eq!(vec![vec![1_234.0, 0.5]], m.points);
        assert!(m.tags.is_empty());
    }

    #[test]
    fn produce_sorts_caller_and_global_tags() {
        let p = producer("", &["zone:b", "app:x"]);
        let m = p.produce("load", Reading::new(1.0), vec!["mid:m".into(), "aaa:1".into()]);

        assert_eq!(vec!["aaa:1", "app:x", "mid:m", "zone:b"], m.tags);
    }

    #[test]
    fn produce_same_identity_for_permuted_tags() {
        let p = producer("svc", &["env:prod"]);
        let lhs = p.produce("load", Reading::new(1.0), vec!["a:1".into(), "b:2".into()]);
        let rhs = p.produce("load", Reading::new(1.0), vec!["b:2".into(), "a:1".into()]);

        assert_eq!(lhs.tags, rhs.tags);
        assert_eq!(lhs.id(), rhs.id());
    }
}
