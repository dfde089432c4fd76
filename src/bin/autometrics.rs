#![allow(unknown_lints)]

extern crate autometrics;
extern crate chrono;
extern crate fern;

#[macro_use]
extern crate log;
extern crate serde_json;

use autometrics::config::{self, OutputFormat};
use autometrics::dataset::{DataSet, Extension};
use autometrics::line;
use autometrics::metric::{MetricKind, MetricRecord};
use autometrics::normalize::{Normalizer, NORMALIZE_ACCEPT, NORMALIZE_REJECT};
use autometrics::time;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::process;
use std::sync::atomic::Ordering;

/// The first `{ ... }` span of a line, if any. Log prefixes and trailing
/// junk are common in piped input.
fn json_span(line: &str) -> Option<&str> {
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&line[start..=end])
}

fn emit<W: Write>(out: &mut W, format: OutputFormat, record: &MetricRecord) -> io::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", record.to_json_string()),
        OutputFormat::Line => match line::to_line(record) {
            Some(l) => writeln!(out, "{}", l),
            None => Ok(()),
        },
    }
}

fn summarize<W: Write>(out: &mut W, sets: &BTreeMap<(String, MetricKind), DataSet>) -> io::Result<()> {
    for set in sets.values() {
        let report = match set.report(Extension::WithHistogram) {
            Ok(report) => report,
            Err(e) => {
                debug!("no histogram for {}: {}", set.name(), e);
                match set.report(Extension::Plain) {
                    Ok(report) => report,
                    Err(e) => {
                        error!("unable to report on {}: {}", set.name(), e);
                        continue;
                    }
                }
            }
        };
        writeln!(out, "{}", report)?;
    }
    Ok(())
}

fn run(args: &config::Args, normalizer: &Normalizer) -> io::Result<usize> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut sets: BTreeMap<(String, MetricKind), DataSet> = BTreeMap::new();
    let mut lines_read = 0;

    for raw in stdin.lock().lines() {
        let raw = raw?;
        lines_read += 1;
        let span = match json_span(&raw) {
            Some(span) => span,
            None => {
                trace!("no event on line {}", lines_read);
                continue;
            }
        };
        let params = match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(params)) => params,
            Ok(_) => {
                warn!("line {} is not an object", lines_read);
                continue;
            }
            Err(e) => {
                warn!("line {} is not json: {}", lines_read, e);
                continue;
            }
        };
        let record = match normalizer.produce_metric_from_params(params, &args.environment) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                error!("line {}: {}", lines_read, e);
                continue;
            }
        };

        emit(&mut out, args.format, &record)?;
        if args.summarize {
            let key = (record.name.clone(), record.kind);
            let set = sets.entry(key)
                .or_insert_with(|| DataSet::new(record.name.clone(), record.kind));
            if let Err(e) = set.add_value_at(record.value, record.timestamp.secs()) {
                warn!("unable to add {} to its series: {}", record.name, e);
            }
        }
    }

    if args.summarize {
        summarize(&mut out, &sets)?;
    }
    if args.format == OutputFormat::Line {
        for l in line::self_report(time::now(), lines_read) {
            writeln!(out, "{}", l)?;
        }
    }
    out.flush()?;
    Ok(lines_read)
}

fn main() {
    let args = match config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("autometrics: {}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let logging = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("autometrics"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply();
    if let Err(e) = logging {
        eprintln!("autometrics: could not set up logging: {}", e);
        process::exit(1);
    }

    info!("autometrics - {}", args.version);

    let normalizer = match Normalizer::new(args.normalizer.clone()) {
        Ok(normalizer) => normalizer,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    match run(&args, &normalizer) {
        Ok(lines_read) => info!(
            "read {} lines: {} accepted, {} rejected",
            lines_read,
            NORMALIZE_ACCEPT.load(Ordering::Relaxed),
            NORMALIZE_REJECT.load(Ordering::Relaxed)
        ),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
