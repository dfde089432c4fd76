//! Turn loosely-typed event parameters into metric records.
//!
//! Callers hand over whatever they have: a bag of JSON keys that may or may
//! not name a metric type, a value, a time. The `Normalizer` fills in
//! defaults, validates, folds everything non-standard into metadata, enriches
//! tags and metadata from an `Environment` and returns a `MetricRecord`
//! whose serialized form is always the same six keys in the same order.
//!
//! What happens on bad input is up to the configured `Policy`. `Strict`
//! returns the error; `Lenient` logs it and returns `Ok(None)`.

use constants;
use environment::{Enricher, Environment};
use error::Error;
use metric::{MetricKind, MetricRecord, TagMap};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use time::{self, Timestamp};

lazy_static! {
    /// Total parameter sets turned into records.
    pub static ref NORMALIZE_ACCEPT: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total parameter sets rejected.
    pub static ref NORMALIZE_REJECT: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// What to do with parameters that fail validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Return the error.
    Strict,
    /// Log the error and return `Ok(None)`.
    Lenient,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy::Strict
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Policy, String> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Policy::Strict),
            "lenient" => Ok(Policy::Lenient),
            _ => Err(format!("unknown policy {}, expected strict or lenient", s)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Policy::Strict => f.write_str("strict"),
            Policy::Lenient => f.write_str("lenient"),
        }
    }
}

/// Normalizer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizerConfig {
    /// Failure handling.
    pub policy: Policy,
    /// Default a missing type to counter, a missing value to 1 and a
    /// missing timestamp to now.
    pub optimistic_creation: bool,
    /// Name given to events that carry only an event type.
    pub default_event_name: String,
    /// Expression whose first match in the hostname is the server type.
    pub server_type_regex: String,
    /// Server type used when the expression does not match.
    pub unknown: String,
}

impl Default for NormalizerConfig {
    fn default() -> NormalizerConfig {
        NormalizerConfig {
            policy: Policy::default(),
            optimistic_creation: true,
            default_event_name: constants::DEFAULT_EVENT_NAME.to_string(),
            server_type_regex: constants::SERVER_TYPE_REGEX.to_string(),
            unknown: constants::DEFAULT_UNKNOWN.to_string(),
        }
    }
}

/// The normalization pipeline.
#[derive(Clone, Debug)]
pub struct Normalizer {
    config: NormalizerConfig,
    enricher: Enricher,
}

impl Default for Normalizer {
    fn default() -> Normalizer {
        Normalizer {
            config: NormalizerConfig::default(),
            enricher: Enricher::default(),
        }
    }
}

/// True for values a caller would consider "not given": null, `false`,
/// zero, `""`, `"0"`, `[]` and `{}`.
fn is_empty(value: &Value) -> bool {
    match *value {
        Value::Null | Value::Bool(false) => true,
        Value::Bool(true) => false,
        Value::Number(ref n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(ref s) => s.is_empty() || s == "0",
        Value::Array(ref a) => a.is_empty(),
        Value::Object(ref o) => o.is_empty(),
    }
}

fn tag_value(value: &Value) -> Option<String> {
    match *value {
        Value::Null => None,
        Value::String(ref s) => Some(s.clone()),
        ref other => Some(other.to_string()),
    }
}

fn take_map(params: &mut Map<String, Value>, key: &'static str) -> Result<Map<String, Value>, Error> {
    match params.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(Error::NotAMap(key)),
    }
}

fn parse_name(value: Option<&Value>) -> Result<String, Error> {
    match value {
        Some(&Value::String(ref s)) if !s.is_empty() => Ok(s.clone()),
        Some(&Value::Number(ref n)) => Ok(n.to_string()),
        _ => Err(Error::MissingField(constants::NAME)),
    }
}

fn parse_kind(value: Option<&Value>) -> Result<MetricKind, Error> {
    let raw = match value {
        None => return Err(Error::MissingField(constants::TYPE)),
        Some(&Value::String(ref s)) => s.as_str(),
        Some(other) => return Err(Error::InvalidType(other.to_string())),
    };
    match MetricKind::from_str(raw)? {
        kind @ MetricKind::Counter | kind @ MetricKind::Timer => Ok(kind),
        MetricKind::Meter | MetricKind::Gauge => Err(Error::UnsupportedType(raw.to_string())),
    }
}

fn parse_value(value: Option<&Value>) -> Result<f64, Error> {
    let parsed = match value {
        None => return Err(Error::MissingField(constants::VALUE)),
        Some(&Value::Number(ref n)) => n.as_f64(),
        Some(&Value::String(ref s)) => f64::from_str(s.trim()).ok(),
        Some(_) => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(Error::NonNumericValue(
            value.map_or_else(String::new, |v| v.to_string()),
        )),
    }
}

fn parse_timestamp(value: Option<&Value>) -> Result<Timestamp, Error> {
    match value {
        None => Err(Error::MissingField(constants::TIMESTAMP)),
        Some(v) => Timestamp::parse(v).ok_or_else(|| Error::UnparseableTimestamp(v.to_string())),
    }
}

impl Normalizer {
    /// Build a normalizer. Fails if the server type expression does not
    /// compile.
    pub fn new(config: NormalizerConfig) -> Result<Normalizer, Error> {
        let enricher = Enricher::new(&config.server_type_regex, &config.unknown)?;
        Ok(Normalizer {
            config: config,
            enricher: enricher,
        })
    }

    /// The configuration in force.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a raw parameter map.
    ///
    /// # Examples
    ///
    /// ```
    /// #[macro_use]
    /// extern crate serde_json;
    /// extern crate autometrics;
    ///
    /// use autometrics::environment::NullEnvironment;
    /// use autometrics::normalize::Normalizer;
    ///
    /// fn main() {
    ///     let params = json!({"name": "signup", "plan": "pro", "timestamp": 1500000000});
    ///     let params = params.as_object().unwrap().clone();
    ///     let record = Normalizer::default()
    ///         .produce_metric_from_params(params, &NullEnvironment)
    ///         .unwrap()
    ///         .unwrap();
    ///     assert_eq!(
    ///         r#"{"metadata":{"plan":"pro"},"name":"signup","tags":{},"timestamp":1500000000,"type":"counter","value":1}"#,
    ///         record.to_json_string()
    ///     );
    /// }
    /// ```
    pub fn produce_metric_from_params(
        &self,
        params: Map<String, Value>,
        env: &dyn Environment,
    ) -> Result<Option<MetricRecord>, Error> {
        match self.normalize(params, env) {
            Ok(record) => {
                NORMALIZE_ACCEPT.fetch_add(1, Ordering::Relaxed);
                debug!("normalized {} {}", record.kind, record.name);
                Ok(Some(record))
            }
            Err(e) => {
                NORMALIZE_REJECT.fetch_add(1, Ordering::Relaxed);
                match self.config.policy {
                    Policy::Strict => Err(e),
                    Policy::Lenient => {
                        warn!("unable to create a metric from provided params: {}", e);
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Normalize from individual values. See `Values`.
    pub fn produce_metric_from_values(
        &self,
        values: Values,
        env: &dyn Environment,
    ) -> Result<Option<MetricRecord>, Error> {
        self.produce_metric_from_params(values.into_params(), env)
    }

    fn normalize(
        &self,
        mut params: Map<String, Value>,
        env: &dyn Environment,
    ) -> Result<MetricRecord, Error> {
        for &(legacy, canonical) in &constants::LEGACY_KEYS {
            if !params.contains_key(canonical) {
                if let Some(v) = params.remove(legacy) {
                    params.insert(canonical.to_string(), v);
                }
            }
        }

        let mut metadata = take_map(&mut params, constants::METADATA)?;
        let raw_tags = take_map(&mut params, constants::TAGS)?;
        let mut tags = TagMap::default();
        for (k, v) in &raw_tags {
            if let Some(v) = tag_value(v) {
                tags.insert(k.clone(), v);
            }
        }

        if let Some(event_type) = params.remove(constants::EVENT_TYPE) {
            if let Some(tag) = tag_value(&event_type) {
                tags.insert(constants::EVENT_TYPE.to_string(), tag);
            }
            metadata.insert(constants::EVENT_TYPE.to_string(), event_type);
            if !params.contains_key(constants::NAME) {
                params.insert(
                    constants::NAME.to_string(),
                    Value::String(self.config.default_event_name.clone()),
                );
            }
        }

        if self.config.optimistic_creation {
            if params.get(constants::TYPE).map_or(true, is_empty) {
                params.insert(constants::TYPE.to_string(), Value::from("counter"));
            }
            if params.get(constants::VALUE).map_or(true, is_empty) {
                params.insert(constants::VALUE.to_string(), Value::from(1));
            }
            if params.get(constants::TIMESTAMP).map_or(true, is_empty) {
                params.insert(constants::TIMESTAMP.to_string(), Value::from(time::now()));
            }
        }

        let name = parse_name(params.get(constants::NAME))?;
        let kind = parse_kind(params.get(constants::TYPE))?;
        let value = parse_value(params.get(constants::VALUE))?;
        let timestamp = parse_timestamp(params.get(constants::TIMESTAMP))?;

        for (key, value) in params {
            if !constants::CANONICAL_KEYS.contains(&key.as_str()) {
                trace!("moving {} into metadata", key);
                metadata.insert(key, value);
            }
        }

        let tier = kind.tier();
        self.enricher.enrich_metadata(&mut metadata, env, tier);
        self.enricher.enrich_tags(&mut tags, env, tier);

        Ok(MetricRecord {
            name: name,
            kind: kind,
            value: value,
            timestamp: timestamp,
            tags: tags,
            metadata: metadata,
        })
    }
}

/// Individual values for `Normalizer::produce_metric_from_values`.
///
/// Defaults to a counter of value 1 with no tags, metadata or extras.
#[derive(Clone, Debug, PartialEq)]
pub struct Values {
    name: String,
    value: Value,
    kind: String,
    tags: Map<String, Value>,
    extra: Value,
    metadata: Map<String, Value>,
}

impl Values {
    /// Start from a name.
    pub fn new<S>(name: S) -> Values
    where
        S: Into<String>,
    {
        Values {
            name: name.into(),
            value: Value::from(1),
            kind: "counter".to_string(),
            tags: Map::new(),
            extra: Value::Null,
            metadata: Map::new(),
        }
    }

    /// Set the value.
    pub fn value<V: Into<Value>>(mut self, value: V) -> Values {
        self.value = value.into();
        self
    }

    /// Set the type name.
    pub fn kind<S: Into<String>>(mut self, kind: S) -> Values {
        self.kind = kind.into();
        self
    }

    /// Add a tag.
    pub fn tag<K, V>(mut self, key: K, value: V) -> Values
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Replace the tags.
    pub fn tags(mut self, tags: Map<String, Value>) -> Values {
        self.tags = tags;
        self
    }

    /// Extra parameters. A map is merged into the parameters; any other
    /// non-null value is taken as the event type.
    pub fn extra<V: Into<Value>>(mut self, extra: V) -> Values {
        self.extra = extra.into();
        self
    }

    /// Replace the metadata.
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Values {
        self.metadata = metadata;
        self
    }

    /// Flatten into a raw parameter map.
    pub fn into_params(self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(constants::TYPE.into(), Value::String(self.kind));
        params.insert(constants::NAME.into(), Value::String(self.name));
        params.insert(constants::TAGS.into(), Value::Object(self.tags));
        params.insert(constants::VALUE.into(), self.value);
        params.insert(constants::METADATA.into(), Value::Object(self.metadata));
        match self.extra {
            Value::Null => {}
            Value::Object(extra) => {
                for (k, v) in extra {
                    params.insert(k, v);
                }
            }
            other => {
                params.insert(constants::EVENT_TYPE.into(), other);
            }
        }
        params
    }
}
