use metric::simple::{integral, number};
use metric::{MetricKind, TagMap};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{self, Map, Value};
use time::Timestamp;

/// A normalized metric, ready to hand to a sender.
///
/// A record always serializes to exactly six keys, in ascending order:
/// `metadata`, `name`, `tags`, `timestamp`, `type` and `value`. Downstream
/// consumers depend on that shape.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRecord {
    /// The metric name.
    pub name: String,
    /// The metric kind.
    pub kind: MetricKind,
    /// The metric value.
    pub value: f64,
    /// The instant the metric describes.
    pub timestamp: Timestamp,
    /// Low cardinality dimensions.
    pub tags: TagMap,
    /// Free-form context.
    pub metadata: Map<String, Value>,
}

impl MetricRecord {
    /// Convert to a JSON value.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("metadata".into(), Value::Object(self.metadata.clone()));
        map.insert("name".into(), Value::String(self.name.clone()));
        let mut tags = Map::new();
        for &(ref k, ref v) in self.tags.iter() {
            tags.insert(k.clone(), Value::String(v.clone()));
        }
        map.insert("tags".into(), Value::Object(tags));
        map.insert("timestamp".into(), Value::from(self.timestamp.secs()));
        map.insert("type".into(), Value::String(self.kind.as_str().into()));
        map.insert("value".into(), number(self.value));
        Value::Object(map)
    }

    /// Serialize to a compact JSON string.
    pub fn to_json_string(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                error!("could not serialize record {}: {}", self.name, e);
                self.to_json().to_string()
            }
        }
    }
}

struct ValueRepr(f64);

impl Serialize for ValueRepr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match integral(self.0) {
            Some(i) => serializer.serialize_i64(i),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl Serialize for MetricRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("MetricRecord", 6)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("tags", &self.tags)?;
        state.serialize_field("timestamp", &self.timestamp.secs())?;
        state.serialize_field("type", &self.kind)?;
        state.serialize_field("value", &ValueRepr(self.value))?;
        state.end()
    }
}
