//! tagmap is the map of key, value pairs that rides along with every full
//! metric and every record. Think of it as a specialized map: tags are few in
//! number and low in cardinality, so a sorted vector searched by bisection
//! beats hashing, and iteration is always in ascending key order. That order
//! is what gives serialized records their stable shape.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Borrow;
use std::cmp;
use std::slice::Iter;

/// The tagmap key, value collection. Behaves similarly to
/// `std::collections::BTreeMap` but with a specialized implementation for
/// fast searching over a small collection.
#[derive(Clone, Debug, Eq)]
pub struct TagMap<K, V> {
    inner: Vec<(K, V)>,
}

impl<K, V> PartialEq for TagMap<K, V>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &TagMap<K, V>) -> bool {
        self.inner == other.inner
    }
}

impl<K, V> Serialize for TagMap<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for &(ref k, ref v) in &self.inner {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K, V> TagMap<K, V>
where
    K: cmp::Ord,
{
    /// Create a `tagmap::Iter`.
    pub fn iter(&self) -> Iter<(K, V)> {
        self.inner.iter()
    }

    /// Get a value from the tagmap, if it exists.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: cmp::Ord + Borrow<Q>,
        Q: cmp::Ord + ?Sized,
    {
        match self.inner.binary_search_by(|probe| Borrow::<Q>::borrow(&probe.0).cmp(key)) {
            Ok(idx) => Some(&self.inner[idx].1),
            Err(_) => None,
        }
    }

    /// Determine if the key is present in the tagmap.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: cmp::Ord + Borrow<Q>,
        Q: cmp::Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Remove a value from the tagmap. The value will be returned if it
    /// existed.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: cmp::Ord + Borrow<Q>,
        Q: cmp::Ord + ?Sized,
    {
        match self.inner.binary_search_by(|probe| Borrow::<Q>::borrow(&probe.0).cmp(key)) {
            Ok(idx) => Some(self.inner.remove(idx).1),
            Err(_) => None,
        }
    }

    /// Determine if the tagmap is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Insert a key / value into self
    ///
    /// This method will return the value previously stored under the given
    /// key, if there was such a value.
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        match self.inner.binary_search_by(|probe| probe.0.cmp(&key)) {
            Ok(idx) => {
                self.inner.push((key, val));
                let old = self.inner.swap_remove(idx);
                Some(old.1)
            }
            Err(idx) => {
                self.inner.insert(idx, (key, val));
                None
            }
        }
    }

    /// Insert a key / value into self if and only if the key is absent.
    /// Returns true if the insertion happened.
    pub fn insert_if_absent(&mut self, key: K, val: V) -> bool {
        match self.inner.binary_search_by(|probe| probe.0.cmp(&key)) {
            Ok(_) => false,
            Err(idx) => {
                self.inner.insert(idx, (key, val));
                true
            }
        }
    }

}

impl<K, V> Default for TagMap<K, V> {
    fn default() -> TagMap<K, V> {
        TagMap {
            inner: Vec::with_capacity(15),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    type Tags = TagMap<String, String>;

    #[test]
    fn test_insert_overwrites() {
        let mut tags = Tags::default();
        assert_eq!(None, tags.insert("foo".into(), "bar".into()));
        assert_eq!(Some("bar".into()), tags.insert("foo".into(), "22".into()));
        assert_eq!(Some(&"22".to_string()), tags.get("foo"));
        assert_eq!(1, tags.iter().count());
    }

    #[test]
    fn test_insert_if_absent() {
        let mut tags = Tags::default();
        assert!(tags.insert_if_absent("foo".into(), "22".into()));
        assert!(!tags.insert_if_absent("foo".into(), "bar".into()));
        assert_eq!(Some(&"22".to_string()), tags.get("foo"));
    }

    #[test]
    fn test_remove() {
        let mut tags = Tags::default();
        tags.insert("foo".into(), "bar".into());
        assert_eq!(Some("bar".into()), tags.remove("foo"));
        assert_eq!(None, tags.remove("foo"));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_serializes_sorted() {
        let mut tags = Tags::default();
        tags.insert("zeta".into(), "1".into());
        tags.insert("alpha".into(), "2".into());
        tags.insert("mu".into(), "3".into());
        assert_eq!(
            r#"{"alpha":"2","mu":"3","zeta":"1"}"#,
            ::serde_json::to_string(&tags).unwrap()
        );
    }

    #[test]
    fn iteration_is_sorted_and_unique() {
        fn inner(pairs: Vec<(String, String)>) -> TestResult {
            let mut tags = Tags::default();
            for (k, v) in pairs.clone() {
                tags.insert(k, v);
            }
            let keys: Vec<&String> = tags.iter().map(|&(ref k, _)| k).collect();
            for w in keys.windows(2) {
                assert!(w[0] < w[1]);
            }
            for &(ref k, _) in &pairs {
                let last = pairs.iter().rev().find(|&&(ref pk, _)| pk == k).unwrap();
                assert_eq!(Some(&last.1), tags.get(k.as_str()));
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<(String, String)>) -> TestResult);
    }
}
