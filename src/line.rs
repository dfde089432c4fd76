//! Render records as tcollector style lines.
//!
//! One record, one line: `<prefix>.<name> <timestamp> <value> <tags>`, with
//! tags as space separated `key=value` pairs. Gauges have no line form and
//! are discarded.

use metric::{integral, MetricKind, MetricRecord};
use normalize::{NORMALIZE_ACCEPT, NORMALIZE_REJECT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

lazy_static! {
    /// Total records rendered as lines.
    pub static ref LINES_EMITTED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total records with no line form.
    pub static ref LINES_DISCARDED: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Tags that never make it onto a line.
const SKIPPED_TAGS: [&str; 3] = ["server_type", "dc", "host"];

/// Make a tag value safe for a line: `:` and space become `_`; `<`, `>` and
/// `'` are dropped.
pub fn scrub_tag_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !['<', '>', '\''].contains(c))
        .map(|c| match c {
            ':' | ' ' => '_',
            c => c,
        })
        .collect()
}

fn format_value(value: f64) -> String {
    match integral(value) {
        Some(i) => i.to_string(),
        None => value.to_string(),
    }
}

fn metadata_str<'a>(record: &'a MetricRecord, key: &str, default: &'a str) -> &'a str {
    record
        .metadata
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

/// Render a record, or `None` if its kind has no line form.
pub fn to_line(record: &MetricRecord) -> Option<String> {
    let prefix = match record.kind {
        MetricKind::Counter => "autometrics.counters",
        MetricKind::Timer => "autometrics.timers",
        MetricKind::Meter => "autometrics.meters",
        MetricKind::Gauge => {
            LINES_DISCARDED.fetch_add(1, Ordering::Relaxed);
            trace!("discarding gauge {}", record.name);
            return None;
        }
    };

    let mut line = format!(
        "{}.{} {} {}",
        prefix,
        record.name,
        record.timestamp.secs(),
        format_value(record.value)
    );
    if record.kind == MetricKind::Meter {
        line.push_str(&format!(
            " unit={} event_type={}",
            metadata_str(record, "units", "SECONDS"),
            metadata_str(record, "meter_event", "events")
        ));
    }
    line.push_str(" category=metrics");
    let mut tags = record.tags.clone();
    for key in &SKIPPED_TAGS {
        tags.remove(*key);
    }
    for &(ref k, ref v) in tags.iter() {
        line.push_str(&format!(" {}={}", k, scrub_tag_value(v)));
    }
    LINES_EMITTED.fetch_add(1, Ordering::Relaxed);
    Some(line)
}

/// The process's own counters, as counter lines stamped `timestamp`.
pub fn self_report(timestamp: i64, lines_read: usize) -> Vec<String> {
    let accepted = NORMALIZE_ACCEPT.load(Ordering::Relaxed);
    let rejected = NORMALIZE_REJECT.load(Ordering::Relaxed);
    let counters = [
        ("lines.read", lines_read),
        ("metrics.read", accepted + rejected),
        ("metrics.sent", LINES_EMITTED.load(Ordering::Relaxed)),
        (
            "metrics.discarded",
            rejected + LINES_DISCARDED.load(Ordering::Relaxed),
        ),
    ];
    counters
        .iter()
        .map(|&(name, count)| format!("autometrics.counters.{} {} {}", name, timestamp, count))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::TagMap;
    use serde_json::Map;
    use time::Timestamp;

    fn record(kind: MetricKind, value: f64) -> MetricRecord {
        let mut tags = TagMap::default();
        tags.insert("host".into(), "web-01".into());
        tags.insert("dc".into(), "us-east-1".into());
        tags.insert("server_type".into(), "web-".into());
        tags.insert("env".into(), "production".into());
        tags.insert("ua".into(), "Mozilla <X11: 'Linux'>".into());
        MetricRecord {
            name: "page.view".into(),
            kind: kind,
            value: value,
            timestamp: Timestamp::from_secs(1_473_766_200).unwrap(),
            tags: tags,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_scrub() {
        assert_eq!("Mozilla_X11__Linux", scrub_tag_value("Mozilla <X11: 'Linux'>"));
        assert_eq!("plain", scrub_tag_value("plain"));
    }

    #[test]
    fn test_counter_line() {
        assert_eq!(
            Some(
                "autometrics.counters.page.view 1473766200 3 category=metrics env=production \
                 ua=Mozilla_X11__Linux"
                    .to_string()
            ),
            to_line(&record(MetricKind::Counter, 3.0))
        );
    }

    #[test]
    fn test_timer_line() {
        let line = to_line(&record(MetricKind::Timer, 12.5)).unwrap();
        assert!(line.starts_with("autometrics.timers.page.view 1473766200 12.5 category=metrics"));
    }

    #[test]
    fn test_meter_line() {
        let line = to_line(&record(MetricKind::Meter, 7.0)).unwrap();
        assert!(line.starts_with(
            "autometrics.meters.page.view 1473766200 7 unit=SECONDS event_type=events \
             category=metrics env=production"
        ));

        let mut r = record(MetricKind::Meter, 7.0);
        r.metadata.insert("units".into(), json!("MINUTE"));
        r.metadata.insert("meter_event".into(), json!("hits"));
        let line = to_line(&r).unwrap();
        assert!(line.contains(" unit=MINUTE event_type=hits "), "{}", line);
    }

    #[test]
    fn test_gauge_is_discarded() {
        let before = LINES_DISCARDED.load(Ordering::Relaxed);
        assert_eq!(None, to_line(&record(MetricKind::Gauge, 1.0)));
        assert!(LINES_DISCARDED.load(Ordering::Relaxed) > before);
    }

    #[test]
    fn test_self_report() {
        let lines = self_report(100, 42);
        assert_eq!(4, lines.len());
        assert_eq!("autometrics.counters.lines.read 100 42", lines[0]);
        assert!(lines[3].starts_with("autometrics.counters.metrics.discarded 100 "));
    }
}
