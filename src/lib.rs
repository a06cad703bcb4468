//! meterbuf is an in-memory buffer for gauge telemetry. It sits between the
//! code that samples a measurable quantity and a remote ingestion endpoint,
//! folding readings into one time series per name and tag set and handing
//! the whole buffer to a publisher on demand.
//!
//! Readings that land in the same wall-clock second collapse into a single
//! point, the most recent value winning. A publish that fails in a way the
//! publisher deems recoverable leaves the buffer untouched so that the next
//! publish carries the same data again.
//!
//! The moving parts:
//!
//!  * `metric` -- the `Metric` series and its merge rules.
//!  * `producer` -- turns a reading into a prefixed, tagged `Metric`.
//!  * `consumer` -- owns the buffer, drains the ingestion channel.
//!  * `publisher` -- the capability the consumer publishes through.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod config;
pub mod consumer;
pub mod flush;
pub mod metric;
pub mod producer;
pub mod publisher;
pub mod source;
