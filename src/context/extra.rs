//! Out-of-band annotations attached to context graph nodes.

use std::{
    any::Any,
    fmt,
    sync::Arc,
};

use dashmap::DashMap;

/// A name to payload map owned by a context.
///
/// Later stages (emitters, symbol writers) store their own handles here. The graph never
/// reads or interprets the values, and storing never touches the structural fields of the
/// owning context.
#[derive(Default)]
pub struct ExtraData {
    slots: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ExtraData {
    /// Create an empty slot map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous payload
    pub fn put<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.slots.insert(key.to_string(), Arc::new(value));
    }

    /// Get the payload stored under `key`, if it exists and has type `T`
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.slots.get(key)?.value().clone();
        value.downcast::<T>().ok()
    }

    /// True if any payload is stored under `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Remove the payload stored under `key`, returning whether one existed
    pub fn remove(&self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Number of stored payloads
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for ExtraData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        f.debug_struct("ExtraData").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_slots() {
        let extra = ExtraData::new();
        assert!(extra.is_empty());

        extra.put("handle", 42_u32);
        extra.put("name", String::from("Player"));

        assert_eq!(*extra.get::<u32>("handle").unwrap(), 42);
        assert_eq!(extra.get::<String>("name").unwrap().as_str(), "Player");
        assert!(extra.get::<u64>("handle").is_none());
        assert!(extra.get::<u32>("missing").is_none());

        extra.put("handle", 7_u32);
        assert_eq!(*extra.get::<u32>("handle").unwrap(), 7);
        assert_eq!(extra.len(), 2);

        assert!(extra.remove("handle"));
        assert!(!extra.contains("handle"));
        assert!(!extra.remove("handle"));
    }
}
