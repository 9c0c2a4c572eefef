// ── Bound-value reconciler ──
//
// Two-way binding between an externally supplied value (authoritative
// when present) and a locally held one. Writers always go through the
// same surface; owners hear about real changes exactly once.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Shared, swappable set of externally supplied fields.
///
/// A field is *defined* when its key is present, even if the value is
/// `null`. Clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct ExternalProps {
    inner: Arc<ArcSwap<Map<String, Value>>>,
}

impl ExternalProps {
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(map)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.load().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.load().contains_key(key)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.inner.rcu(|current| {
            let mut next = Map::clone(current);
            next.insert(key.to_owned(), value.clone());
            next
        });
    }

    /// Stop supplying `key`; bindings fall back to their internal value.
    pub fn unset(&self, key: &str) {
        self.inner.rcu(|current| {
            let mut next = Map::clone(current);
            next.remove(key);
            next
        });
    }

    pub fn replace(&self, map: Map<String, Value>) {
        self.inner.store(Arc::new(map));
    }

    pub fn snapshot(&self) -> Arc<Map<String, Value>> {
        self.inner.load_full()
    }
}

impl Default for ExternalProps {
    fn default() -> Self {
        Self::new()
    }
}

/// Which source currently decides the value of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The external props define the field.
    External,
    /// The field is absent from the props; the local value is used.
    Internal,
}

/// One field bound to [`ExternalProps`] with a local fallback.
#[derive(Debug)]
pub struct BoundValue {
    props: ExternalProps,
    key: String,
    internal: Value,
    changes: broadcast::Sender<Value>,
}

impl BoundValue {
    /// Bind `key`, seeding the local value from whatever the props hold now.
    pub fn new(props: ExternalProps, key: impl Into<String>) -> Self {
        let key = key.into();
        let internal = props.get(&key).unwrap_or(Value::Null);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            props,
            key,
            internal,
            changes,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn authority(&self) -> Authority {
        if self.props.contains(&self.key) {
            Authority::External
        } else {
            Authority::Internal
        }
    }

    /// External value if defined, else the local one.
    pub fn read(&self) -> Value {
        self.props
            .get(&self.key)
            .unwrap_or_else(|| self.internal.clone())
    }

    /// Write through the binding.
    ///
    /// A value equal to the effective one is a no-op. Otherwise the local
    /// value is updated and one change event carrying `value` is emitted,
    /// whichever source is authoritative. Returns whether it changed.
    pub fn write(&mut self, value: Value) -> bool {
        if self.read() == value {
            return false;
        }

        self.internal = value.clone();
        tracing::trace!(key = %self.key, authority = ?self.authority(), "bound value changed");
        // No listeners is fine.
        let _ = self.changes.send(value);
        true
    }

    pub fn on_change(&self) -> broadcast::Receiver<Value> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn writing_same_value_twice_notifies_once() {
        let mut value = BoundValue::new(ExternalProps::new(), "modelValue");
        let mut rx = value.on_change();

        assert!(value.write(json!(5)));
        assert!(!value.write(json!(5)));

        assert_eq!(rx.try_recv().unwrap(), json!(5));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn external_value_wins_over_internal() {
        let props = ExternalProps::new();
        let mut value = BoundValue::new(props.clone(), "modelValue");

        value.write(json!("local"));
        assert_eq!(value.authority(), Authority::Internal);
        assert_eq!(value.read(), json!("local"));

        props.set("modelValue", json!("parent"));
        assert_eq!(value.authority(), Authority::External);
        assert_eq!(value.read(), json!("parent"));

        props.unset("modelValue");
        assert_eq!(value.read(), json!("local"));
    }

    #[test]
    fn explicit_null_counts_as_defined() {
        let props = ExternalProps::new();
        props.set("modelValue", Value::Null);
        let mut value = BoundValue::new(props, "modelValue");

        assert_eq!(value.authority(), Authority::External);
        // Equal to the external null: no-op.
        assert!(!value.write(Value::Null));
    }

    #[test]
    fn seeded_from_props_at_construction() {
        let mut map = Map::new();
        map.insert("angle".into(), json!(90));
        let props = ExternalProps::from_map(map);
        let value = BoundValue::new(props.clone(), "angle");

        props.replace(Map::new());
        assert_eq!(value.authority(), Authority::Internal);
        assert_eq!(value.read(), json!(90));
    }

    #[test]
    fn write_under_external_authority_still_notifies() {
        let props = ExternalProps::new();
        props.set("modelValue", json!(1));
        let mut value = BoundValue::new(props, "modelValue");
        let mut rx = value.on_change();

        assert!(value.write(json!(2)));
        assert_eq!(rx.try_recv().unwrap(), json!(2));
        // The owner has not updated the props yet.
        assert_eq!(value.read(), json!(1));
    }
}
