//! The metric model.
//!
//! There are four kinds of metric: counters, timers, meters and gauges. Each
//! comes in two weights. A `SimpleMetric` is a bare (type, name, timestamp,
//! value) sample, the unit a `DataSet` is built from. A `Metric` is a simple
//! metric plus tags and metadata, enriched from the environment when it is
//! built. Both are generic over a `Shape`, a marker that fixes the kind's
//! defaults, its enrichment tier and any per-kind extras such as a timer's
//! units.
//!
//! Behaviour is split into capability traits rather than one large
//! interface: `Sample` for the settable core, `Annotated` for tag and
//! metadata mutation, `NumericValues` for increment / decrement on the kinds
//! that support it.

use constants;
use environment::Tier;
use error::Error;
use serde_json::{Map, Value};
use stats::Aggregator;
use std::fmt;
use std::str::FromStr;

mod bag;
mod enriched;
mod record;
mod simple;
mod tagmap;

pub use self::bag::{Annotated, MetadataBag};
pub use self::enriched::Metric;
pub use self::record::MetricRecord;
pub use self::simple::{build_simple_metric, simple_metric, Sample, SimpleMetric};
pub(crate) use self::simple::integral;

/// The tag map used by metrics, records and data sets.
pub type TagMap = self::tagmap::TagMap<String, String>;

/// The four kinds of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Counts of events.
    Counter,
    /// Durations.
    Timer,
    /// Event rates.
    Meter,
    /// Point in time readings.
    Gauge,
}

impl MetricKind {
    /// The lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match *self {
            MetricKind::Counter => "counter",
            MetricKind::Timer => "timer",
            MetricKind::Meter => "meter",
            MetricKind::Gauge => "gauge",
        }
    }

    /// Look up a simple metric variant by name, ignoring case.
    ///
    /// Unlike `from_str` an unknown name here is a configuration error: the
    /// caller asked for a variant that does not exist.
    pub fn from_variant_name(name: &str) -> Result<MetricKind, Error> {
        MetricKind::from_str(&name.to_lowercase())
            .map_err(|_| Error::UnknownVariant(name.to_string()))
    }

    /// The per-bucket reduction used by `DataSet::get_timeseries`.
    pub fn default_aggregator(&self) -> Aggregator {
        match *self {
            MetricKind::Timer => Aggregator::Avg,
            MetricKind::Counter | MetricKind::Meter | MetricKind::Gauge => Aggregator::Sum,
        }
    }

    /// The enrichment tier the full variant of this kind is built with.
    pub fn tier(&self) -> Tier {
        match *self {
            MetricKind::Counter => Counter::TIER,
            MetricKind::Timer => Timer::TIER,
            MetricKind::Meter => Meter::TIER,
            MetricKind::Gauge => Gauge::TIER,
        }
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    /// Exact, case-sensitive parse of a wire name.
    fn from_str(s: &str) -> Result<MetricKind, Error> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "timer" => Ok(MetricKind::Timer),
            "meter" => Ok(MetricKind::Meter),
            "gauge" => Ok(MetricKind::Gauge),
            _ => Err(Error::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind defaults and extras.
pub trait Shape: Clone + fmt::Debug + Default + PartialEq + Send + 'static {
    /// The kind a freshly built metric of this shape reports.
    const KIND: MetricKind;
    /// The enrichment tier applied when a full metric is built.
    const TIER: Tier;

    /// Copy any per-kind extras into a record's metadata. Existing keys
    /// win.
    fn annotate(&self, _metadata: &mut Map<String, Value>) {}
}

/// Marker for shapes with numeric-value semantics.
pub trait Numeric: Shape {}

/// Increment, decrement and reset for counters, meters and gauges.
pub trait NumericValues {
    /// Mutable access to the underlying value.
    fn value_mut(&mut self) -> &mut f64;

    /// Add one.
    fn increment(&mut self) {
        *self.value_mut() += 1.0;
    }

    /// Subtract one.
    fn decrement(&mut self) {
        *self.value_mut() -= 1.0;
    }

    /// Zero the value.
    fn reset_value(&mut self) {
        *self.value_mut() = 0.0;
    }
}

/// A count of events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counter;

impl Shape for Counter {
    const KIND: MetricKind = MetricKind::Counter;
    const TIER: Tier = Tier::Extended;
}

impl Numeric for Counter {}

/// A duration, with its unit of measure.
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    units: String,
}

impl Timer {
    /// The unit of measure, `ms` unless changed.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Change the unit of measure.
    pub fn set_units<S: Into<String>>(&mut self, units: S) {
        self.units = units.into();
    }
}

impl Default for Timer {
    fn default() -> Timer {
        Timer {
            units: constants::TIMER_UNITS.to_string(),
        }
    }
}

impl Shape for Timer {
    const KIND: MetricKind = MetricKind::Timer;
    const TIER: Tier = Tier::Extended;

    fn annotate(&self, metadata: &mut Map<String, Value>) {
        metadata
            .entry("units")
            .or_insert_with(|| Value::String(self.units.clone()));
    }
}

/// A rate of events, with its unit and event classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Meter {
    units: String,
    event_type: String,
}

impl Meter {
    /// The unit of measure, `SECOND` unless changed.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Change the unit of measure.
    pub fn set_units<S: Into<String>>(&mut self, units: S) {
        self.units = units.into();
    }

    /// What is being metered, `requests` unless changed.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Change what is being metered.
    pub fn set_event_type<S: Into<String>>(&mut self, event_type: S) {
        self.event_type = event_type.into();
    }
}

impl Default for Meter {
    fn default() -> Meter {
        Meter {
            units: constants::METER_UNITS.to_string(),
            event_type: constants::METER_EVENT_TYPE.to_string(),
        }
    }
}

impl Shape for Meter {
    const KIND: MetricKind = MetricKind::Meter;
    const TIER: Tier = Tier::Extended;

    fn annotate(&self, metadata: &mut Map<String, Value>) {
        metadata
            .entry("units")
            .or_insert_with(|| Value::String(self.units.clone()));
        metadata
            .entry("meter_event")
            .or_insert_with(|| Value::String(self.event_type.clone()));
    }
}

impl Numeric for Meter {}

/// A point in time reading.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gauge;

impl Shape for Gauge {
    const KIND: MetricKind = MetricKind::Gauge;
    const TIER: Tier = Tier::Extended;
}

impl Numeric for Gauge {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_parse_is_exact() {
        assert_eq!(Ok(MetricKind::Timer), "timer".parse::<MetricKind>());
        assert_eq!(
            Err(Error::InvalidType("Timer".into())),
            "Timer".parse::<MetricKind>()
        );
        assert_eq!(
            Err(Error::InvalidType("histogram".into())),
            "histogram".parse::<MetricKind>()
        );
    }

    #[test]
    fn test_variant_name_ignores_case() {
        assert_eq!(Ok(MetricKind::Gauge), MetricKind::from_variant_name("GAUGE"));
        assert_eq!(Ok(MetricKind::Meter), MetricKind::from_variant_name("Meter"));
        assert_eq!(
            Err(Error::UnknownVariant("Histogram".into())),
            MetricKind::from_variant_name("Histogram")
        );
    }

    #[test]
    fn test_default_aggregators() {
        assert_eq!(Aggregator::Sum, MetricKind::Counter.default_aggregator());
        assert_eq!(Aggregator::Sum, MetricKind::Meter.default_aggregator());
        assert_eq!(Aggregator::Avg, MetricKind::Timer.default_aggregator());
    }

    #[test]
    fn test_shape_defaults() {
        assert_eq!("ms", Timer::default().units());
        let meter = Meter::default();
        assert_eq!("SECOND", meter.units());
        assert_eq!("requests", meter.event_type());
    }

    #[test]
    fn test_annotate_does_not_overwrite() {
        let mut metadata = Map::new();
        metadata.insert("units".into(), json!("ns"));
        Meter::default().annotate(&mut metadata);
        assert_eq!(Some(&json!("ns")), metadata.get("units"));
        assert_eq!(Some(&json!("requests")), metadata.get("meter_event"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!("\"counter\"", ::serde_json::to_string(&MetricKind::Counter).unwrap());
    }
}
