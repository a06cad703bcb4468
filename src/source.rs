//! Line-oriented ingestion.
//!
//! Each line is either a plain reading, `<name> <value> [tag ...]`, or a
//! JSON-encoded `Metric` in wire shape. Plain readings pass through the
//! `Producer` and are stamped with the current time; JSON metrics are fed
//! as-is.

use crate::metric::{Metric, Reading};
use crate::producer::Producer;
use std::error;
use std::fmt;
use std::io::{self, BufRead};
use std::num::ParseFloatError;
use std::str;
use std::sync::mpsc;

/// A line that could not be turned into a `Metric`.
#[derive(Debug)]
pub enum ParseError {
    /// The line had a name but no value.
    NoValue,
    /// The value was not a number.
    BadValue(ParseFloatError),
    /// The line looked like JSON but was not a metric.
    BadJson(serde_json::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::NoValue => write!(f, "no value given"),
            ParseError::BadValue(ref e) => write!(f, "could not parse value: {}", e),
            ParseError::BadJson(ref e) => write!(f, "could not parse metric: {}", e),
        }
    }
}

impl error::Error for ParseError {}

/// Parse one line of input
///
/// Returns `Ok(None)` for a blank line.
///
/// # Examples
///
/// ```
/// use meterbuf::producer::{Producer, ProducerConfig};
/// use meterbuf::source::parse_line;
///
/// let producer = Producer::new(ProducerConfig::default());
/// let m = parse_line(&producer, "queries.count 5 env:prod").unwrap().unwrap();
///
/// assert_eq!("queries.count", m.name);
/// assert_eq!(vec!["env:prod"], m.tags);
/// ```
pub fn parse_line(producer: &Producer, line: &str) -> Result<Option<Metric>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        return serde_json::from_str(line)
            .map(Some)
            .map_err(ParseError::BadJson);
    }

    let mut fields = line.split_whitespace();
    let name = fields.next().unwrap_or_default();
    let value: f64 = fields
        .next()
        .ok_or(ParseError::NoValue)?
        .parse()
        .map_err(ParseError::BadValue)?;
    let tags: Vec<String> = fields.map(|t| t.to_string()).collect();

    Ok(Some(producer.produce(name, Reading::new(value), tags)))
}

/// Feeds a consumer from a line-oriented reader.
pub struct Lines<R> {
    reader: R,
    producer: Producer,
}

impl<R> Lines<R>
where
    R: BufRead,
{
    /// Create a new Lines source.
    pub fn new(reader: R, producer: Producer) -> Lines<R> {
        Lines { reader, producer }
    }

    /// Read until end of input, sending every parsed metric into `chan`
    ///
    /// Bad lines are logged and skipped. Returns the number of metrics sent.
    /// Stops early if the consumer has gone away.
    pub fn run(mut self, chan: mpsc::Sender<Metric>) -> usize {
        let mut sent = 0;
        let mut lineno = 0;
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => lineno += 1,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            }
            let line = match str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping line {}: {}", lineno, e);
                    continue;
                }
            };
            match parse_line(&self.producer, line) {
                Ok(Some(metric)) => {
                    if chan.send(metric).is_err() {
                        warn!("Consumer hung up, stopping input");
                        break;
                    }
                    sent += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping line {}: {}", lineno, e),
            }
        }
        debug!("Input exhausted after {} metrics", sent);
        sent
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::producer::ProducerConfig;
    use std::io::Cursor;

    fn producer() -> Producer {
        Producer::new(ProducerConfig {
            metric_prefix: "app".into(),
            metric_tags: vec!["host:a".into()],
            ..Default::default()
        })
    }

    #[test]
    fn plain_line() {
        let m = parse_line(&producer(), "  load 0.25 z:1 a:2 ").unwrap().unwrap();

        assert_eq!("app.load", m.name);
        assert_eq!(vec!["a:2", "host:a", "z:1"], m.tags);
        assert_eq!(0.25, m.points[0][1]);
    }

    #[test]
    fn json_line_bypasses_producer() {
        let raw = r#"{"interval":5,"metric":"raw","points":[[1,2]],"tags":["x"],"type":"gauge"}"#;
        let m = parse_line(&producer(), raw).unwrap().unwrap();

        assert_eq!("raw", m.name);
        assert_eq!(vec!["x"], m.tags);
        assert_eq!(5, m.interval);
    }

    #[test]
    fn blank_and_bad_lines() {
        assert!(parse_line(&producer(), "   ").unwrap().is_none());
        match parse_line(&producer(), "load") {
            Err(ParseError::NoValue) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse_line(&producer(), "load abc") {
            Err(ParseError::BadValue(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse_line(&producer(), "{not json") {
            Err(ParseError::BadJson(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn run_skips_bad_lines() {
        let input = Cursor::new("load 1\n\nload nope\nload 2 env:prod\n");
        let (snd, rcv) = mpsc::channel();

        let sent = Lines::new(input, producer()).run(snd);

        assert_eq!(2, sent);
        let got: Vec<Metric> = rcv.iter().collect();
        assert_eq!(2, got.len());
        assert_eq!(vec!["env:prod", "host:a"], got[1].tags);
    }

    #[test]
    fn run_skips_invalid_utf8() {
        let input = Cursor::new(&b"load 1\n\xff\xfe\nload 2\r\nload 3"[..]);
        let (snd, rcv) = mpsc::channel();

        let sent = Lines::new(input, producer()).run(snd);

        assert_eq!(3, sent);
        let values: Vec<f64> = rcv.iter().map(|m| m.points[0][1]).collect();
        assert_eq!(vec![1.0, 2.0, 3.0], values);
    }
}
