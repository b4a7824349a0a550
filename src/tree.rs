//! Insertion-ordered tree of named values produced by a decode.

use indexmap::IndexMap;

use crate::value::Value;

/// Keyed result of a decode. Keys are unique, iteration follows insertion
/// order and values may be nested trees.
#[derive(Debug, Clone, Default)]
pub struct NamedTree {
    entries: IndexMap<String, Value>,
    last_modified: Option<String>,
}

impl NamedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`. Re-inserting an existing key overwrites it
    /// in place, keeping its original position.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.entries.insert(key.clone(), value.into());
        self.last_modified = Some(key);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Looks up a dot separated path through nested trees, e.g. `"header.flags"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.get(segments.next()?)?;

        for segment in segments {
            value = value.as_tree()?.get(segment)?;
        }

        Some(value)
    }

    /// Read-only view of this tree.
    pub fn get_immutable(&self) -> TreeView<'_> {
        TreeView { tree: self }
    }

    /// Key most recently written with [NamedTree::put].
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[cfg(feature = "serde")]
    pub(crate) fn entries(&self) -> &IndexMap<String, Value> {
        &self.entries
    }
}

/// Trees are equal when they hold the same entries in the same order.
impl PartialEq for NamedTree {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for NamedTree {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = NamedTree::new();
        for (key, value) in iter {
            tree.put(key, value);
        }

        tree
    }
}

/// Read-only access to a tree that is still being decoded.
///
/// Field and guard closures receive a view so they can consult earlier
/// fields without writing to the tree themselves.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a> {
    tree: &'a NamedTree,
}

impl<'a> TreeView<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.tree.get(key)
    }

    pub fn get_path(&self, path: &str) -> Option<&'a Value> {
        self.tree.get_path(path)
    }

    pub fn last_modified(&self) -> Option<&'a str> {
        self.tree.last_modified()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.tree.iter()
    }
}
