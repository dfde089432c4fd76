//! Autometrics turns loosely-typed application events into well-formed
//! metric records and summarizes series of them.
//!
//! An event is any map of parameters. The normalizer fills in what is
//! missing, rejects what is malformed, folds unknown keys into metadata and
//! enriches the result with request and host context, yielding a
//! `MetricRecord` with a stable JSON form. Records may then be folded into a
//! `DataSet` for time bucketing, descriptive statistics and histograms.
//!
//! Why you might choose to use autometrics:
//!
//!  * You emit metrics from many call sites with inconsistent shapes.
//!  * You need records tagged with where and for whom they were produced.
//!  * You want a quick statistical summary of a series without a TSDB.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate regex;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate toml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod config;
pub mod constants;
pub mod dataset;
pub mod environment;
pub mod error;
pub mod histogram;
pub mod line;
pub mod metric;
pub mod normalize;
pub mod stats;
pub mod time;

pub use error::{Error, ErrorKind};
