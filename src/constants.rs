//! Library level constants

/// Canonical record key for the metric name.
pub const NAME: &str = "name";
/// Canonical record key for the metric type.
pub const TYPE: &str = "type";
/// Canonical record key for the metric value.
pub const VALUE: &str = "value";
/// Canonical record key for the metric timestamp.
pub const TIMESTAMP: &str = "timestamp";
/// Canonical record key for the tag map.
pub const TAGS: &str = "tags";
/// Canonical record key for the metadata map.
pub const METADATA: &str = "metadata";

/// The global event type field. When present it names the event and is
/// copied into both tags and metadata under this same key.
pub const EVENT_TYPE: &str = "event_type";

/// Every key permitted at the top level of a normalized record.
pub const CANONICAL_KEYS: [&str; 6] = [NAME, TYPE, VALUE, TIMESTAMP, METADATA, TAGS];

/// Older producers emit these keys. Each is renamed to its canonical partner
/// when the canonical key is absent.
pub const LEGACY_KEYS: [(&str, &str); 6] = [
    ("metric_name", NAME),
    ("metric_type", TYPE),
    ("metric_value", VALUE),
    ("created", TIMESTAMP),
    ("metric_tags", TAGS),
    ("@metadata", METADATA),
];

/// Name given to events identified only by their event type.
pub const DEFAULT_EVENT_NAME: &str = "analytics.event";
/// Sentinel used when the server type cannot be discovered.
pub const DEFAULT_UNKNOWN: &str = "unspecified";
/// The server type is the first run of letters and hyphens in the hostname.
pub const SERVER_TYPE_REGEX: &str = r"[\-A-Za-z]+";

/// Default unit for timers.
pub const TIMER_UNITS: &str = "ms";
/// Default unit for meters.
pub const METER_UNITS: &str = "SECOND";
/// Default event classification for meters.
pub const METER_EVENT_TYPE: &str = "requests";
