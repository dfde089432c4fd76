use error::Error;
use metric::{Counter, Gauge, Meter, MetricKind, Numeric, NumericValues, Shape, Timer};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;
use time::Timestamp;

/// The settable core shared by every metric.
pub trait Sample: fmt::Debug + Send {
    /// The metric name.
    fn name(&self) -> &str;
    /// The metric kind.
    fn kind(&self) -> MetricKind;
    /// The current value.
    fn value(&self) -> f64;
    /// The instant the metric describes.
    fn timestamp(&self) -> &Timestamp;

    /// Change the reported kind. Fails on anything outside counter, timer,
    /// meter and gauge.
    fn set_type(&mut self, kind: &str) -> Result<(), Error>;

    /// Change the timestamp. Fails if `timestamp` cannot be read as a date /
    /// time, leaving the old timestamp in place.
    fn set_timestamp(&mut self, timestamp: &Value) -> Result<(), Error>;

    /// Change the value. Anything that is not a finite JSON number is
    /// ignored.
    fn set_value(&mut self, value: &Value);

    /// Serialize as a JSON object.
    fn to_json(&self) -> Value;
}

/// A bare sample: no tags, no metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleMetric<K: Shape> {
    name: String,
    kind: MetricKind,
    value: f64,
    timestamp: Timestamp,
    shape: K,
}

impl<K: Shape> SimpleMetric<K> {
    /// Make a metric of value 1, stamped now.
    pub fn new<S>(name: S) -> SimpleMetric<K>
    where
        S: Into<String>,
    {
        SimpleMetric {
            name: name.into(),
            kind: K::KIND,
            value: 1.0,
            timestamp: Timestamp::now(),
            shape: K::default(),
        }
    }

    /// Restamp self.
    pub fn at(mut self, timestamp: Timestamp) -> SimpleMetric<K> {
        self.timestamp = timestamp;
        self
    }

    /// Revalue self. Non-finite values are ignored, as with `set_value`.
    pub fn with_value(mut self, value: f64) -> SimpleMetric<K> {
        if value.is_finite() {
            self.value = value;
        } else {
            trace!("ignoring non-finite value {} for {}", value, self.name);
        }
        self
    }

    /// The per-kind extras.
    pub fn shape(&self) -> &K {
        &self.shape
    }

    /// Mutable per-kind extras.
    pub fn shape_mut(&mut self) -> &mut K {
        &mut self.shape
    }

    pub(crate) fn plain_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("type".into(), Value::String(self.kind.as_str().into()));
        map.insert("value".into(), number(self.value));
        map.insert("timestamp".into(), Value::from(self.timestamp.secs()));
        map
    }
}

impl<K: Shape> Sample for SimpleMetric<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        self.kind
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    fn set_type(&mut self, kind: &str) -> Result<(), Error> {
        self.kind = MetricKind::from_str(kind)?;
        Ok(())
    }

    fn set_timestamp(&mut self, timestamp: &Value) -> Result<(), Error> {
        match Timestamp::parse(timestamp) {
            Some(ts) => {
                self.timestamp = ts;
                Ok(())
            }
            None => Err(Error::UnparseableTimestamp(timestamp.to_string())),
        }
    }

    fn set_value(&mut self, value: &Value) {
        match value.as_f64() {
            Some(v) if value.is_number() && v.is_finite() => self.value = v,
            _ => trace!("ignoring non-numeric value {} for {}", value, self.name),
        }
    }

    fn to_json(&self) -> Value {
        Value::Object(self.plain_json())
    }
}

impl<K: Numeric> NumericValues for SimpleMetric<K> {
    fn value_mut(&mut self) -> &mut f64 {
        &mut self.value
    }
}

/// The value as an integer, if it has no fractional part and fits exactly.
pub(crate) fn integral(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Render a value as a JSON number, integral values without a fraction.
pub(crate) fn number(value: f64) -> Value {
    match integral(value) {
        Some(i) => Value::Number(Number::from(i)),
        None => Number::from_f64(value).map_or(Value::Null, Value::Number),
    }
}

/// Build the simple metric for `kind`, valued 1 and stamped now.
pub fn simple_metric(kind: MetricKind, name: &str) -> Box<dyn Sample> {
    match kind {
        MetricKind::Counter => Box::new(SimpleMetric::<Counter>::new(name)),
        MetricKind::Timer => Box::new(SimpleMetric::<Timer>::new(name)),
        MetricKind::Meter => Box::new(SimpleMetric::<Meter>::new(name)),
        MetricKind::Gauge => Box::new(SimpleMetric::<Gauge>::new(name)),
    }
}

/// Build a simple metric by type name.
///
/// The type name is matched without regard to case. Unknown names are a
/// configuration error; an unreadable timestamp is a validation error; a
/// non-numeric value is ignored and the metric keeps its default of 1.
pub fn build_simple_metric(
    kind: &str,
    name: &str,
    timestamp: &Value,
    value: &Value,
) -> Result<Box<dyn Sample>, Error> {
    let kind = MetricKind::from_variant_name(kind)?;
    let mut metric = simple_metric(kind, name);
    metric.set_value(value);
    metric.set_timestamp(timestamp)?;
    Ok(metric)
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::{Counter, Meter, NumericValues, Timer};

    #[test]
    fn test_defaults() {
        let m = SimpleMetric::<Counter>::new("foo");
        assert_eq!("foo", m.name());
        assert_eq!(MetricKind::Counter, m.kind());
        assert_eq!(1.0, m.value());

        let t = SimpleMetric::<Timer>::new("bar");
        assert_eq!(MetricKind::Timer, t.kind());
        assert_eq!("ms", t.shape().units());
    }

    #[test]
    fn test_set_type() {
        let mut m = SimpleMetric::<Counter>::new("foo");
        assert!(m.set_type("gauge").is_ok());
        assert_eq!(MetricKind::Gauge, m.kind());
        assert_eq!(Err(Error::InvalidType("histogram".into())), m.set_type("histogram"));
        assert_eq!(MetricKind::Gauge, m.kind());
    }

    #[test]
    fn test_set_value_ignores_non_numeric() {
        let mut m = SimpleMetric::<Counter>::new("foo");
        m.set_value(&json!(12.5));
        assert_eq!(12.5, m.value());
        m.set_value(&json!("13"));
        m.set_value(&json!(null));
        m.set_value(&json!({"v": 1}));
        m.set_value(&json!(true));
        assert_eq!(12.5, m.value());

        let m = m.with_value(::std::f64::NAN);
        assert_eq!(12.5, m.value());
    }

    #[test]
    fn test_set_timestamp() {
        let mut m = SimpleMetric::<Counter>::new("foo");
        assert!(m.set_timestamp(&json!("2016-09-13T11:30:00Z")).is_ok());
        assert_eq!(1_473_766_200, m.timestamp().secs());
        assert_eq!("2016-09-13T11:30:00+00:00", m.timestamp().iso8601());

        assert_eq!(
            Err(Error::UnparseableTimestamp("\"not a time\"".into())),
            m.set_timestamp(&json!("not a time"))
        );
        assert_eq!(1_473_766_200, m.timestamp().secs());
    }

    #[test]
    fn test_numeric_values() {
        let mut m = SimpleMetric::<Meter>::new("foo");
        m.increment();
        m.increment();
        assert_eq!(3.0, m.value());
        m.decrement();
        assert_eq!(2.0, m.value());
        m.reset_value();
        assert_eq!(0.0, m.value());
    }

    #[test]
    fn test_to_json() {
        let m = SimpleMetric::<Timer>::new("foo")
            .with_value(2.5)
            .at(Timestamp::from_secs(101).unwrap());
        assert_eq!(
            r#"{"name":"foo","timestamp":101,"type":"timer","value":2.5}"#,
            m.to_json().to_string()
        );
    }

    #[test]
    fn test_factory() {
        let m = build_simple_metric("TIMER", "foo", &json!(101), &json!(7)).unwrap();
        assert_eq!(MetricKind::Timer, m.kind());
        assert_eq!(7.0, m.value());
        assert_eq!(101, m.timestamp().secs());

        let m = build_simple_metric("counter", "foo", &json!(101), &json!("seven")).unwrap();
        assert_eq!(1.0, m.value());

        assert_eq!(
            Error::UnknownVariant("histogram".into()),
            build_simple_metric("histogram", "foo", &json!(101), &json!(7)).unwrap_err()
        );
        assert!(build_simple_metric("gauge", "foo", &json!("never"), &json!(7))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(json!(1), number(1.0));
        assert_eq!(json!(-4), number(-4.0));
        assert_eq!(json!(2.5), number(2.5));
    }
}
