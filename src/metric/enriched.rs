use environment::{Enricher, Environment};
use error::Error;
use metric::{Annotated, MetadataBag, MetricKind, MetricRecord, Numeric, NumericValues, Sample,
             Shape, SimpleMetric};
use serde_json::Value;
use time::Timestamp;

/// A full metric: a sample plus its tags and metadata.
///
/// Full metrics are enriched from an `Environment` when they are built, at
/// the tier their shape declares.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric<K: Shape> {
    sample: SimpleMetric<K>,
    bag: MetadataBag,
}

impl<K: Shape> Metric<K> {
    /// Build and enrich a metric with the default enricher.
    pub fn new<S>(name: S, env: &dyn Environment) -> Metric<K>
    where
        S: Into<String>,
    {
        Metric::new_with(name, env, &Enricher::default())
    }

    /// Build and enrich a metric with the given enricher.
    pub fn new_with<S>(name: S, env: &dyn Environment, enricher: &Enricher) -> Metric<K>
    where
        S: Into<String>,
    {
        let mut metric = Metric::bare(name);
        enricher.enrich(&mut metric.bag, env, K::TIER);
        metric
    }

    /// Build a metric with no tags or metadata at all.
    pub fn bare<S>(name: S) -> Metric<K>
    where
        S: Into<String>,
    {
        Metric {
            sample: SimpleMetric::new(name),
            bag: MetadataBag::new(),
        }
    }

    /// Restamp self.
    pub fn at(mut self, timestamp: Timestamp) -> Metric<K> {
        self.sample = self.sample.at(timestamp);
        self
    }

    /// Revalue self.
    pub fn with_value(mut self, value: f64) -> Metric<K> {
        self.sample = self.sample.with_value(value);
        self
    }

    /// The per-kind extras.
    pub fn shape(&self) -> &K {
        self.sample.shape()
    }

    /// Mutable per-kind extras.
    pub fn shape_mut(&mut self) -> &mut K {
        self.sample.shape_mut()
    }

    /// Strip tags and metadata, leaving the sample.
    pub fn into_simple(self) -> SimpleMetric<K> {
        self.sample
    }

    /// Convert into a record. Per-kind extras such as a timer's units are
    /// folded into the metadata unless already present.
    pub fn to_record(&self) -> MetricRecord {
        let mut metadata = self.bag.metadata.clone();
        self.sample.shape().annotate(&mut metadata);
        MetricRecord {
            name: self.sample.name().to_string(),
            kind: self.sample.kind(),
            value: self.sample.value(),
            timestamp: self.sample.timestamp().clone(),
            tags: self.bag.tags.clone(),
            metadata: metadata,
        }
    }
}

impl<K: Shape> Sample for Metric<K> {
    fn name(&self) -> &str {
        self.sample.name()
    }

    fn kind(&self) -> MetricKind {
        self.sample.kind()
    }

    fn value(&self) -> f64 {
        self.sample.value()
    }

    fn timestamp(&self) -> &Timestamp {
        self.sample.timestamp()
    }

    fn set_type(&mut self, kind: &str) -> Result<(), Error> {
        self.sample.set_type(kind)
    }

    fn set_timestamp(&mut self, timestamp: &Value) -> Result<(), Error> {
        self.sample.set_timestamp(timestamp)
    }

    fn set_value(&mut self, value: &Value) {
        self.sample.set_value(value)
    }

    fn to_json(&self) -> Value {
        self.to_record().to_json()
    }
}

impl<K: Shape> Annotated for Metric<K> {
    fn bag(&self) -> &MetadataBag {
        &self.bag
    }

    fn bag_mut(&mut self) -> &mut MetadataBag {
        &mut self.bag
    }
}

impl<K: Numeric> NumericValues for Metric<K> {
    fn value_mut(&mut self) -> &mut f64 {
        self.sample.value_mut()
    }
}
