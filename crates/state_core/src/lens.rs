use serde_json::{Map, Value};

use crate::store::{Listener, StateStore, SubscriptionId};

/// Resolve `path` inside `root`, or `None` when any step is missing or
/// lands on a non-object.
pub fn get_in<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for key in path {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Return `root` with the value at `path` replaced by `sub`, creating
/// intermediate objects as needed. Every sibling key is left untouched.
pub fn set_in(root: Value, path: &[String], sub: Value) -> Value {
    let Some((first, rest)) = path.split_first() else {
        return sub;
    };
    let mut map = match root {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let child = map.remove(first).unwrap_or(Value::Null);
    map.insert(first.clone(), set_in(child, rest, sub));
    Value::Object(map)
}

/// A non-owning read/write projection of the subtree at a fixed path of a
/// parent store.
///
/// Reads forward to `get_in(parent.read(), path)`; writes rewrite only the
/// subtree through the parent's atomic update. The view has no notification
/// source of its own: `subscribe` wraps a parent listener that narrows the
/// (old, new) pair to the path and re-fires only when the narrowed values
/// differ, so the store stays authoritative for fan-out and no double
/// notification can occur.
#[derive(Clone)]
pub struct LensedView {
    store: StateStore,
    path: Vec<String>,
}

impl LensedView {
    pub fn new<I, K>(store: StateStore, path: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            store,
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The subtree at the view's path, `Null` when the path does not resolve.
    pub fn read(&self) -> Value {
        get_in(&self.store.read(), &self.path)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Replace the subtree with `f(subtree)` through the parent's atomic
    /// update, returning the new subtree value.
    pub fn update<F>(&self, f: F) -> Value
    where
        F: FnOnce(Value) -> Value,
    {
        let path = self.path.clone();
        let pair = self.store.update(move |full| {
            let sub = get_in(&full, &path).cloned().unwrap_or(Value::Null);
            set_in(full, &path, f(sub))
        });
        get_in(&pair.next, &self.path)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Subscribe to changes of the narrowed subtree. The listener receives
    /// the narrowed (old, new) pair and only fires when they differ.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let path = self.path.clone();
        self.store.subscribe(std::sync::Arc::new(move |old, new| {
            let old_sub = get_in(old, &path).unwrap_or(&Value::Null);
            let new_sub = get_in(new, &path).unwrap_or(&Value::Null);
            if old_sub != new_sub {
                listener(old_sub, new_sub)?;
            }
            Ok(())
        }))
    }

    pub fn unsubscribe(&self, handle: SubscriptionId) {
        self.store.unsubscribe(handle);
    }
}
