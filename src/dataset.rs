//! Data sets are the primary aggregation type.
//!
//! A `DataSet` accumulates the samples of one named series. Each sample's
//! value is recorded twice: in the bucket keyed by the sample's timestamp,
//! which per-bucket aggregation reads, and in a flat history, which the
//! whole-series statistics read.

use error::Error;
use histogram::{self, Binning, Histogram};
use metric::{build_simple_metric, simple_metric, Annotated, MetadataBag, MetricKind, Sample};
use serde_json::{Map, Value};
use stats::{self, Aggregator, Quartiles};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// The optional sections of a `DataSet` report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    /// Name, type and summary statistics.
    Plain,
    /// `Plain` plus a histogram of the values.
    WithHistogram,
    /// `Plain` plus the set's tags and metadata.
    WithFullMetadata,
}

/// A named series of samples.
#[derive(Debug)]
pub struct DataSet {
    name: String,
    kind: MetricKind,
    samples: Vec<Box<dyn Sample>>,
    points: BTreeMap<i64, Vec<f64>>,
    values: Vec<f64>,
    bag: MetadataBag,
}

impl DataSet {
    /// Create an empty set.
    ///
    /// # Examples
    ///
    /// ```
    /// extern crate autometrics;
    ///
    /// use autometrics::dataset::DataSet;
    /// use autometrics::metric::MetricKind;
    ///
    /// let mut set = DataSet::new("checkout", MetricKind::Timer);
    /// set.add_value_at(120.0, 1_500_000_000).unwrap();
    /// set.add_value_at(80.0, 1_500_000_000).unwrap();
    /// assert_eq!(Some(&100.0), set.get_timeseries().get(&1_500_000_000));
    /// ```
    pub fn new<S>(name: S, kind: MetricKind) -> DataSet
    where
        S: Into<String>,
    {
        DataSet {
            name: name.into(),
            kind: kind,
            samples: Vec::new(),
            points: BTreeMap::new(),
            values: Vec::new(),
            bag: MetadataBag::new(),
        }
    }

    /// Create an empty set, naming the kind by its variant name.
    pub fn from_type_name<S>(name: S, kind: &str) -> Result<DataSet, Error>
    where
        S: Into<String>,
    {
        Ok(DataSet::new(name, MetricKind::from_variant_name(kind)?))
    }

    /// The series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The series kind.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Every sample added since the last reset, in insertion order.
    pub fn samples(&self) -> &[Box<dyn Sample>] {
        &self.samples
    }

    /// The flat value history.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Record `value` stamped now.
    pub fn add_value(&mut self, value: f64) {
        let mut sample = simple_metric(self.kind, &self.name);
        sample.set_value(&Value::from(value));
        self.add_metric(sample);
    }

    /// Record `value` at `timestamp` epoch seconds.
    pub fn add_value_at(&mut self, value: f64, timestamp: i64) -> Result<(), Error> {
        let sample = build_simple_metric(
            self.kind.as_str(),
            &self.name,
            &Value::from(timestamp),
            &Value::from(value),
        )?;
        self.add_metric(sample);
        Ok(())
    }

    /// Record a sample.
    pub fn add_metric(&mut self, sample: Box<dyn Sample>) {
        let value = sample.value();
        self.points
            .entry(sample.timestamp().secs())
            .or_insert_with(Vec::new)
            .push(value);
        self.values.push(value);
        self.samples.push(sample);
    }

    /// Record a concrete sample.
    pub fn add_sample<S>(&mut self, sample: S)
    where
        S: Sample + 'static,
    {
        self.add_metric(Box::new(sample))
    }

    /// Forget every sample.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.points.clear();
        self.values.clear();
    }

    /// Collapse every bucket with the kind's default aggregator.
    pub fn get_timeseries(&self) -> BTreeMap<i64, f64> {
        self.aggregate(self.kind.default_aggregator())
    }

    /// Collapse every bucket with the named aggregator. Unknown names sum.
    pub fn get_values(&self, aggregator: &str) -> BTreeMap<i64, f64> {
        self.aggregate(Aggregator::from_name(aggregator))
    }

    /// Collapse every bucket with `aggregator`.
    pub fn aggregate(&self, aggregator: Aggregator) -> BTreeMap<i64, f64> {
        self.points
            .iter()
            .map(|(ts, values)| (*ts, aggregator.apply(values)))
            .collect()
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        stats::count(&self.values)
    }

    /// Sum of values.
    pub fn sum(&self) -> f64 {
        stats::sum(&self.values)
    }

    /// Sum of squared values.
    pub fn sum2(&self) -> f64 {
        stats::sum2(&self.values)
    }

    /// Mean value.
    pub fn avg(&self) -> f64 {
        stats::avg(&self.values)
    }

    /// Smallest value.
    pub fn min(&self) -> f64 {
        stats::min(&self.values)
    }

    /// Largest value.
    pub fn max(&self) -> f64 {
        stats::max(&self.values)
    }

    /// Spread of values.
    pub fn range(&self) -> f64 {
        stats::range(&self.values)
    }

    /// See `stats::standard_deviation`.
    pub fn standard_deviation(&self) -> Result<f64, Error> {
        stats::standard_deviation(&self.values)
    }

    /// See `stats::percentile`.
    pub fn percentile(&self, p: f64) -> Result<f64, Error> {
        stats::percentile(&self.values, p)
    }

    /// See `stats::median`.
    pub fn median(&self) -> Result<f64, Error> {
        stats::median(&self.values)
    }

    /// See `stats::quartiles`.
    pub fn quartiles(&self) -> Result<Quartiles, Error> {
        stats::quartiles(&self.values)
    }

    /// The earliest bucket.
    pub fn min_timestamp(&self) -> Option<i64> {
        self.points.keys().next().cloned()
    }

    /// The latest bucket.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.points.keys().next_back().cloned()
    }

    /// Seconds between the earliest and latest buckets, 0 when empty.
    pub fn timespan(&self) -> i64 {
        match (self.min_timestamp(), self.max_timestamp()) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    /// Values per `unit` seconds over the timespan.
    pub fn rate(&self, unit: f64) -> Result<f64, Error> {
        let timespan = self.timespan();
        if timespan == 0 || unit == 0.0 {
            return Err(Error::ZeroTimespan);
        }
        Ok(self.count() as f64 / (timespan as f64 / unit))
    }

    /// See `histogram::number_of_bins`.
    pub fn number_of_bins(&self) -> usize {
        histogram::number_of_bins(&self.values)
    }

    /// See `histogram::delta`.
    pub fn delta(&self, bins: Option<usize>) -> Result<f64, Error> {
        histogram::delta(&self.values, bins)
    }

    /// Bin the current values.
    pub fn histogram(&self, binning: &Binning) -> Result<Histogram, Error> {
        histogram::histogram(&self.values, binning)
    }

    fn stats_json(&self) -> Value {
        let stdv = match self.standard_deviation() {
            Ok(v) => json!(v),
            Err(_) => Value::Null,
        };
        json!({
            "min": self.min(),
            "max": self.max(),
            "count": self.count(),
            "sum": self.sum(),
            "sum2": self.sum2(),
            "avg": self.avg(),
            "stdv": stdv,
        })
    }

    /// Summarize the set. The keys present depend only on `extension`.
    pub fn report(&self, extension: Extension) -> Result<Value, Error> {
        let mut report = Map::new();
        report.insert("name".into(), Value::String(self.name.clone()));
        report.insert("type".into(), Value::String(self.kind.as_str().into()));
        report.insert("stats".into(), self.stats_json());
        match extension {
            Extension::Plain => {}
            Extension::WithHistogram => {
                let hist = self.histogram(&Binning::new())?;
                let bins: Vec<Value> = hist.bins()
                    .iter()
                    .map(|b| json!({"edge": b.edge, "frequency": b.frequency}))
                    .collect();
                report.insert("histogram".into(), Value::Array(bins));
            }
            Extension::WithFullMetadata => {
                let mut tags = Map::new();
                for &(ref k, ref v) in self.bag.tags.iter() {
                    tags.insert(k.clone(), Value::String(v.clone()));
                }
                report.insert("tags".into(), Value::Object(tags));
                report.insert("metadata".into(), Value::Object(self.bag.metadata.clone()));
            }
        }
        Ok(Value::Object(report))
    }
}

impl Annotated for DataSet {
    fn bag(&self) -> &MetadataBag {
        &self.bag
    }

    fn bag_mut(&mut self) -> &mut MetadataBag {
        &mut self.bag
    }
}

/// A `DataSet` shared between producers.
///
/// Every call takes the one lock, so no caller ever sees a partially applied
/// `add_metric` or `reset`.
#[derive(Clone, Debug)]
pub struct SharedDataSet {
    inner: Arc<Mutex<DataSet>>,
}

impl SharedDataSet {
    /// Wrap a set.
    pub fn new(set: DataSet) -> SharedDataSet {
        SharedDataSet {
            inner: Arc::new(Mutex::new(set)),
        }
    }

    fn lock(&self) -> MutexGuard<DataSet> {
        // mutations are plain pushes and clears, a poisoned set is consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the set.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DataSet) -> R,
    {
        f(&mut self.lock())
    }

    /// See `DataSet::add_value`.
    pub fn add_value(&self, value: f64) {
        self.lock().add_value(value)
    }

    /// See `DataSet::add_value_at`.
    pub fn add_value_at(&self, value: f64, timestamp: i64) -> Result<(), Error> {
        self.lock().add_value_at(value, timestamp)
    }

    /// See `DataSet::add_metric`.
    pub fn add_metric(&self, sample: Box<dyn Sample>) {
        self.lock().add_metric(sample)
    }

    /// See `DataSet::reset`.
    pub fn reset(&self) {
        self.lock().reset()
    }

    /// See `DataSet::count`.
    pub fn count(&self) -> usize {
        self.lock().count()
    }

    /// See `DataSet::get_timeseries`.
    pub fn get_timeseries(&self) -> BTreeMap<i64, f64> {
        self.lock().get_timeseries()
    }

    /// See `DataSet::report`.
    pub fn report(&self, extension: Extension) -> Result<Value, Error> {
        self.lock().report(extension)
    }
}

impl From<DataSet> for SharedDataSet {
    fn from(set: DataSet) -> SharedDataSet {
        SharedDataSet::new(set)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric::{Counter, SimpleMetric, Timer};
    use quickcheck::{QuickCheck, TestResult};
    use std::thread;
    use time::Timestamp;

    #[test]
    fn test_same_timestamp_accumulates() {
        let mut set = DataSet::new("foo", MetricKind::Counter);
        set.add_value_at(2.0, 10).unwrap();
        set.add_value_at(4.0, 10).unwrap();

        let avg = set.get_values("avg");
        assert_eq!(Some(&3.0), avg.get(&10));
        let sum = set.get_values("sum");
        assert_eq!(Some(&6.0), sum.get(&10));
        assert_eq!(Some(&6.0), set.get_timeseries().get(&10));
        assert_eq!(Some(&6.0), set.get_values("bogus").get(&10));
        assert_eq!(2, set.count());
        assert_eq!(2, set.samples().len());
    }

    #[test]
    fn test_timer_defaults_to_avg() {
        let mut set = DataSet::new("foo", MetricKind::Timer);
        let at = Timestamp::from_secs(100).unwrap();
        set.add_sample(SimpleMetric::<Timer>::new("foo").with_value(10.0).at(at.clone()));
        set.add_sample(SimpleMetric::<Timer>::new("foo").with_value(20.0).at(at));
        set.add_value_at(7.0, 200).unwrap();
        let series = set.get_timeseries();
        assert_eq!(vec![(100, 15.0), (200, 7.0)], series.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_get_values_is_sorted() {
        let mut set = DataSet::new("foo", MetricKind::Counter);
        set.add_value_at(1.0, 30).unwrap();
        set.add_value_at(1.0, 10).unwrap();
        set.add_value_at(1.0, 20).unwrap();
        let keys: Vec<i64> = set.get_values("max").keys().cloned().collect();
        assert_eq!(vec![10, 20, 30], keys);
    }

    #[test]
    fn test_reset() {
        let mut set = DataSet::new("foo", MetricKind::Counter);
        set.add_value(5.0);
        set.add_value(6.0);
        assert_eq!(2, set.count());
        set.reset();
        assert_eq!(0, set.count());
        assert!(set.get_timeseries().is_empty());
        assert!(set.samples().is_empty());
        assert_eq!(0, set.timespan());
    }

    #[test]
    fn test_statistics() {
        let mut set = DataSet::new("foo", MetricKind::Timer);
        for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
            set.add_value_at(*v, 100 + i as i64).unwrap();
        }
        assert_eq!(Ok(3.0), set.median());
        assert_eq!(Ok(2.0), set.percentile(25.0));
        assert_eq!(4.0, set.quartiles().unwrap().third);
        assert_eq!(4, set.timespan());
        assert_eq!(Ok(1.25), set.rate(1.0));
        assert_eq!(Ok(2.5), set.rate(2.0));
        assert_eq!(Err(Error::ZeroTimespan), set.rate(0.0));
        assert_eq!(5, set.histogram(&Binning::new()).unwrap().total());
    }

    #[test]
    fn test_rate_zero_timespan() {
        let mut set = DataSet::new("foo", MetricKind::Meter);
        set.add_value_at(1.0, 100).unwrap();
        set.add_value_at(1.0, 100).unwrap();
        assert_eq!(Err(Error::ZeroTimespan), set.rate(1.0));
    }

    #[test]
    fn test_from_type_name() {
        let set = DataSet::from_type_name("foo", "Meter").unwrap();
        assert_eq!(MetricKind::Meter, set.kind());
        assert_eq!(
            Error::UnknownVariant("sketch".into()),
            DataSet::from_type_name("foo", "sketch").unwrap_err()
        );
    }

    #[test]
    fn test_report_plain() {
        let mut set = DataSet::new("foo", MetricKind::Counter);
        set.add_value_at(2.0, 1).unwrap();
        let report = set.report(Extension::Plain).unwrap();
        assert_eq!(
            json!({
                "name": "foo",
                "type": "counter",
                "stats": {
                    "min": 2.0, "max": 2.0, "count": 1, "sum": 2.0,
                    "sum2": 4.0, "avg": 2.0, "stdv": null
                }
            }),
            report
        );
    }

    #[test]
    fn test_report_extensions() {
        let mut set = DataSet::new("foo", MetricKind::Timer);
        set.add_tag("env", "production");
        set.add_metadata("owner", json!("web"));
        for v in &[1.0, 1.0, 2.0, 2.0, 3.0] {
            set.add_value_at(*v, 1).unwrap();
        }

        let hist = set.report(Extension::WithHistogram).unwrap();
        assert_eq!(5, hist["histogram"].as_array().unwrap().len());
        assert!(hist.get("tags").is_none());

        let full = set.report(Extension::WithFullMetadata).unwrap();
        assert_eq!(json!({"env": "production"}), full["tags"]);
        assert_eq!(json!({"owner": "web"}), full["metadata"]);
        assert!(full.get("histogram").is_none());
        assert!(full["stats"]["stdv"].is_number());
    }

    #[test]
    fn test_report_histogram_needs_data() {
        let set = DataSet::new("foo", MetricKind::Timer);
        assert_eq!(
            Err(Error::InsufficientData(0)),
            set.report(Extension::WithHistogram)
        );
        assert!(set.report(Extension::Plain).is_ok());
    }

    #[test]
    fn test_shared_data_set() {
        let shared = SharedDataSet::new(DataSet::new("foo", MetricKind::Counter));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let shared = shared.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    shared.add_value_at(1.0, i % 10).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(400, shared.count());
        assert_eq!(Some(&40.0), shared.get_timeseries().get(&3));
        shared.with(|set| set.add_metric(Box::new(SimpleMetric::<Counter>::new("foo"))));
        assert_eq!(401, shared.count());
        shared.reset();
        assert_eq!(0, shared.count());
    }

    #[test]
    fn buckets_partition_the_history() {
        fn inner(samples: Vec<(i16, u8)>) -> TestResult {
            let mut set = DataSet::new("foo", MetricKind::Counter);
            for &(v, ts) in &samples {
                set.add_value_at(f64::from(v), i64::from(ts)).unwrap();
            }
            assert_eq!(samples.len(), set.count());
            let bucketed: usize = set.points.values().map(|b| b.len()).sum();
            assert_eq!(set.count(), bucketed);
            let total: f64 = set.get_values("sum").values().sum();
            assert_eq!(set.sum(), total);
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<(i16, u8)>) -> TestResult);
    }
}
