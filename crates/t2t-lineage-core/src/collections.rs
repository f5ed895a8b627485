use std::collections::HashMap;

/// A `String`-keyed map that preserves insertion order.
///
/// The scope tree's `relations` and `projections` rely on insertion order
/// being load-bearing (spec's `SELECT *` expansion order, first-arm UNION
/// ordering), which a plain `HashMap` does not guarantee. Re-inserting an
/// existing key updates the value in place without moving its position.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexedMap<V> {
    order: Vec<String>,
    by_key: HashMap<String, V>,
}

impl<V> IndexedMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            order: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if !self.by_key.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.by_key.insert(key, value);
    }

    pub(crate) fn get(&self, key: &str) -> Option<&V> {
        self.by_key.get(key)
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order
            .iter()
            .map(move |k| (k.as_str(), self.by_key.get(k).expect("order/map in sync")))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.order
            .iter()
            .map(move |k| self.by_key.get(k).expect("order/map in sync"))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
