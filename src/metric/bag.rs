use metric::TagMap;
use serde_json::{Map, Value};

/// Tags and metadata, carried together by full metrics and data sets.
///
/// Tags are low cardinality dimensions a backend filters and groups on;
/// metadata is free-form, high cardinality and unindexed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataBag {
    /// The tag map.
    pub tags: TagMap,
    /// The metadata map.
    pub metadata: Map<String, Value>,
}

impl MetadataBag {
    /// Create an empty bag.
    pub fn new() -> MetadataBag {
        MetadataBag::default()
    }

    /// Drop all tags and metadata.
    pub fn clear(&mut self) {
        self.tags = TagMap::default();
        self.metadata.clear();
    }
}

/// The tag and metadata mutation capability.
///
/// Anything that owns a `MetadataBag` gets overlay semantics for free: these
/// methods overwrite existing keys. Enrichment, which must never overwrite,
/// goes through `environment::Enricher` instead.
pub trait Annotated {
    /// Borrow the bag.
    fn bag(&self) -> &MetadataBag;
    /// Mutably borrow the bag.
    fn bag_mut(&mut self) -> &mut MetadataBag;

    /// The tag map.
    fn tags(&self) -> &TagMap {
        &self.bag().tags
    }

    /// The metadata map.
    fn metadata(&self) -> &Map<String, Value> {
        &self.bag().metadata
    }

    /// Overlay a single tag.
    fn add_tag<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
        Self: Sized,
    {
        self.bag_mut().tags.insert(key.into(), value.into());
    }

    /// Overlay every tag from `tags`.
    fn add_tags(&mut self, tags: &TagMap) {
        let bag = self.bag_mut();
        for &(ref k, ref v) in tags.iter() {
            bag.tags.insert(k.clone(), v.clone());
        }
    }

    /// Overlay a single metadata key.
    fn add_metadata<K>(&mut self, key: K, value: Value)
    where
        K: Into<String>,
        Self: Sized,
    {
        self.bag_mut().metadata.insert(key.into(), value);
    }

    /// Overlay every key from `metadata`.
    fn add_metadata_map(&mut self, metadata: &Map<String, Value>) {
        let bag = self.bag_mut();
        for (k, v) in metadata {
            bag.metadata.insert(k.clone(), v.clone());
        }
    }
}

impl Annotated for MetadataBag {
    fn bag(&self) -> &MetadataBag {
        self
    }

    fn bag_mut(&mut self) -> &mut MetadataBag {
        self
    }
}
