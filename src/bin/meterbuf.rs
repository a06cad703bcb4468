#![allow(unknown_lints)]

extern crate chrono;
extern crate fern;
extern crate meterbuf;

#[macro_use]
extern crate log;

use chrono::Utc;
use meterbuf::config::{self, PublisherKind};
use meterbuf::consumer::Consumer;
use meterbuf::flush::FlushTimer;
use meterbuf::producer::Producer;
use meterbuf::publisher::{Console, Context, Null, Publisher};
use meterbuf::source::Lines;
use std::env;
use std::io;
use std::process;
use std::str::FromStr;
use std::thread;

/// The level to log at, and the `LOG_LEVEL` value that could not be parsed,
/// if any.
fn level(verbose: u64) -> (log::LevelFilter, Option<String>) {
    let level = match verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    match env::var("LOG_LEVEL") {
        Ok(ll) => match log::LevelFilter::from_str(&ll) {
            Ok(lvl) => (lvl, None),
            Err(_) => (log::LevelFilter::Info, Some(ll)),
        },
        Err(_) => (level, None),
    }
}

fn publisher(kind: PublisherKind) -> Box<dyn Publisher + Send> {
    match kind {
        PublisherKind::Console => Box::new(Console::stdout()),
        PublisherKind::Null => Box::new(Null::new()),
    }
}

fn main() {
    let args = match config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Failed to parse config: {}", e);
            process::exit(1);
        }
    };

    let (level, bad_level) = level(args.verbose);

    // Published metrics go to stdout, so logs go to stderr.
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("meterbuf"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()
        .expect("could not set up logging");

    if let Some(ll) = bad_level {
        error!("Error parsing LOG_LEVEL with value {}", ll);
    }
    info!("meterbuf - {}", args.version);
    info!("Logging level set to {}", log::max_level());

    let consumer = Consumer::new();
    let (chan, consumer_handle) = consumer.spawn();

    let mut timer = FlushTimer::new(
        consumer.clone(),
        publisher(args.publisher),
        args.flush_interval,
    );
    thread::spawn(move || {
        if let Err(e) = timer.run() {
            error!("Error during run: {}", e);
            process::exit(1);
        }
    });

    info!("Starting the metrics collection daemon");
    let stdin = io::stdin();
    let sent = Lines::new(stdin.lock(), Producer::new(args.producer_config())).run(chan);

    consumer_handle.join().expect("Failed to join consumer thread");
    info!("Input closed after {} metrics, publishing remainder", sent);

    let ctx = Context::with_timeout(args.flush_interval);
    let mut last = publisher(args.publisher);
    let result = consumer.publish(&ctx, &mut last);
    let stats = consumer.stats();
    info!(
        "Exiting, published: {} retained: {} discarded: {}",
        stats.published, stats.retained, stats.discarded
    );
    if let Err(e) = result {
        error!("Final publish failed: {}", e);
        process::exit(1);
    }
}
