//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the daemon can consume and use as configuration data.

use crate::producer::ProducerConfig;
use clap::{App, Arg};
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::time::Duration;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Which publisher the daemon hands its buffer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublisherKind {
    /// Print each metric as a line of JSON on stdout.
    Console,
    /// Discard everything.
    Null,
}

/// Failure to load configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Toml(toml::de::Error),
    /// A key held a value of the wrong type or out of range.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "could not read config file: {}", e),
            ConfigError::Toml(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid(key) => write!(f, "invalid value for {}", key),
        }
    }
}

impl error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Toml(e)
    }
}

/// Configuration for the meterbuf executable
///
/// This struct is what we construct from parsing the meterbuf configuration.
/// Please see documentation on `parse_args` in this module for more details.
#[derive(Clone, Debug, PartialEq)]
pub struct Args {
    /// Prepended to every produced metric name.
    pub metric_prefix: String,
    /// Added to the tags of every produced metric.
    pub metric_tags: Vec<String>,
    /// The collection interval reported with each metric.
    pub metric_interval: Duration,
    /// How often the buffer is published.
    pub flush_interval: Duration,
    /// Where published metrics go.
    pub publisher: PublisherKind,
    /// The verbosity setting of meterbuf. The higher the value the more
    /// chatty meterbuf gets.
    pub verbose: u64,
    /// meterbuf version string. This is set automatically.
    pub version: String,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            metric_prefix: String::new(),
            metric_tags: Vec::new(),
            metric_interval: Duration::from_secs(60),
            flush_interval: Duration::from_secs(10),
            publisher: PublisherKind::Console,
            verbose: 0,
            version: VERSION.unwrap_or("unknown").to_string(),
        }
    }
}

impl Args {
    /// The configuration bundle handed to the `Producer`.
    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            metric_prefix: self.metric_prefix.clone(),
            metric_tags: self.metric_tags.clone(),
            metric_interval: self.metric_interval,
        }
    }
}

/// Parse the command line, reading the config file it names, if any.
pub fn parse_args() -> Result<Args, ConfigError> {
    let args = App::new("meterbuf")
        .version(VERSION.unwrap_or("unknown"))
        .author("Brian L. Troutwine <blt@postmates.com>")
        .about("buffers gauge readings and publishes them without loss")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");

    match args.value_of("config-file") {
        Some(filename) => {
            let mut fp = File::open(filename)?;
            let mut buffer = String::new();
            fp.read_to_string(&mut buffer)?;
            parse_config_file(&buffer, verb)
        }
        None => {
            let mut args = Args::default();
            args.verbose = verb;
            Ok(args)
        }
    }
}

fn seconds(value: &toml::Value, key: &'static str) -> Result<Duration, ConfigError> {
    match value.as_integer() {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs as u64)),
        _ => Err(ConfigError::Invalid(key)),
    }
}

/// Parse the meterbuf configuration file.
///
/// Recognized keys are `metric-prefix`, `metric-tags`, `metric-interval`,
/// `flush-interval` and `publisher`. Intervals are whole seconds. Missing
/// keys take their defaults.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    if let Some(p) = value.get("metric-prefix") {
        args.metric_prefix = p
            .as_str()
            .ok_or(ConfigError::Invalid("metric-prefix"))?
            .to_string();
    }

    if let Some(tags) = value.get("metric-tags") {
        let tags = tags.as_array().ok_or(ConfigError::Invalid("metric-tags"))?;
        args.metric_tags = tags
            .iter()
            .map(|t| {
                t.as_str()
                    .map(|s| s.to_string())
                    .ok_or(ConfigError::Invalid("metric-tags"))
            })
            .collect::<Result<Vec<String>, ConfigError>>()?;
    }

    if let Some(mi) = value.get("metric-interval") {
        args.metric_interval = seconds(mi, "metric-interval")?;
    }

    if let Some(fi) = value.get("flush-interval") {
        args.flush_interval = seconds(fi, "flush-interval")?;
    }

    if let Some(p) = value.get("publisher") {
        args.publisher = match p.as_str() {
            Some("console") => PublisherKind::Console,
            Some("null") => PublisherKind::Null,
            _ => return Err(ConfigError::Invalid("publisher")),
        };
    }

    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_file_defaults() {
        let args = parse_config_file(r#""#, 2).unwrap();

        assert_eq!(args.metric_prefix, "");
        assert!(args.metric_tags.is_empty());
        assert_eq!(args.metric_interval, Duration::from_secs(60));
        assert_eq!(args.flush_interval, Duration::from_secs(10));
        assert_eq!(args.publisher, PublisherKind::Console);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn config_file_full() {
        let config = r#"
metric-prefix = "bq.metrics"
metric-tags = ["env:prod", "team:data"]
metric-interval = 30
flush-interval = 5
publisher = "null"
"#;
        let args = parse_config_file(config, 0).unwrap();

        assert_eq!(args.metric_prefix, "bq.metrics");
        assert_eq!(args.metric_tags, vec!["env:prod", "team:data"]);
        assert_eq!(args.metric_interval, Duration::from_secs(30));
        assert_eq!(args.flush_interval, Duration::from_secs(5));
        assert_eq!(args.publisher, PublisherKind::Null);
    }

    #[test]
    fn config_producer_bundle() {
        let config = r#"
metric-prefix = "svc"
metric-tags = ["env:dev"]
metric-interval = 15
"#;
        let pc = parse_config_file(config, 0).unwrap().producer_config();

        assert_eq!(pc.metric_prefix, "svc");
        assert_eq!(pc.metric_tags, vec!["env:dev"]);
        assert_eq!(pc.metric_interval, Duration::from_secs(15));
    }

    #[test]
    fn config_rejects_bad_values() {
        match parse_config_file("metric-tags = \"env:prod\"", 0) {
            Err(ConfigError::Invalid("metric-tags")) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse_config_file("flush-interval = 0", 0) {
            Err(ConfigError::Invalid("flush-interval")) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse_config_file("publisher = \"kafka\"", 0) {
            Err(ConfigError::Invalid("publisher")) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse_config_file("metric-prefix = ", 0) {
            Err(ConfigError::Toml(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
