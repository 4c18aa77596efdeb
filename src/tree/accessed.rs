//! Path tree recording which state locations were read.

use crate::types::{Path, Seg};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One node of the accessed-path mirror.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A mapping that was read, with the members read beneath it.
    Object(BTreeMap<String, Node>),
    /// A sequence that was read. Unread slots are `None` and render as null.
    Array(Vec<Option<Node>>),
    /// A primitive that was read, with the value seen at read time.
    Leaf(Value),
}

impl Node {
    /// Fresh node for a value just read: an empty container for composites,
    /// a leaf holding the value otherwise.
    fn for_value(value: &Value) -> Self {
        match value {
            Value::Object(_) => Node::Object(BTreeMap::new()),
            Value::Array(_) => Node::Array(Vec::new()),
            other => Node::Leaf(other.clone()),
        }
    }

    /// Look up a direct child.
    pub fn get(&self, seg: &Seg) -> Option<&Node> {
        match (self, seg) {
            (Node::Object(children), Seg::Key(k)) => children.get(k.as_str()),
            (Node::Object(children), Seg::Index(i)) => children.get(&i.to_string()),
            (Node::Array(items), Seg::Index(i)) => items.get(*i).and_then(Option::as_ref),
            (Node::Array(items), Seg::Key(k)) => k
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .and_then(Option::as_ref),
            (Node::Leaf(_), _) => None,
        }
    }

    /// Adjust this node's shape so that `seg` can be stored beneath it
    /// without losing anything already recorded.
    fn reshape_for(&mut self, seg: &Seg) {
        let is_index = matches!(seg, Seg::Index(_));
        let replacement = match &*self {
            Node::Leaf(_) if is_index => Some(Node::Array(Vec::new())),
            Node::Leaf(_) => Some(Node::Object(BTreeMap::new())),
            Node::Object(children) if is_index && children.is_empty() => {
                Some(Node::Array(Vec::new()))
            }
            _ => None,
        };
        if let Some(node) = replacement {
            *self = node;
            return;
        }

        // A key under a sequence: the slots become decimal keys.
        if !is_index {
            if let Node::Array(items) = self {
                let promoted: BTreeMap<String, Node> = std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, slot)| slot.map(|node| (i.to_string(), node)))
                    .collect();
                *self = Node::Object(promoted);
            }
        }
    }

    /// Get or create the child at `seg`. Returns the child and whether it
    /// was created.
    fn child_mut(&mut self, seg: &Seg, make: impl FnOnce() -> Node) -> (&mut Node, bool) {
        self.reshape_for(seg);
        match self {
            Node::Object(children) => {
                let key = seg.as_key();
                let created = !children.contains_key(&key);
                (children.entry(key).or_insert_with(make), created)
            }
            Node::Array(items) => {
                let &Seg::Index(i) = seg else {
                    unreachable!("key segments promote arrays to objects");
                };
                if items.len() <= i {
                    items.resize_with(i + 1, || None);
                }
                let slot = &mut items[i];
                let created = slot.is_none();
                (slot.get_or_insert_with(make), created)
            }
            Node::Leaf(_) => unreachable!("leaves are reshaped before descent"),
        }
    }

    /// Update an existing node after a repeated read of `value`.
    fn refresh(&mut self, value: &Value) {
        let replacement = match (&*self, value) {
            (Node::Leaf(_), Value::Object(_) | Value::Array(_)) => Some(Node::for_value(value)),
            (Node::Leaf(old), v) if old != v => Some(Node::Leaf(v.clone())),
            // Containers keep their recorded children even if the value is
            // now a primitive.
            _ => None,
        };
        if let Some(node) = replacement {
            *self = node;
        }
    }

    #[cfg(test)]
    fn count(&self) -> usize {
        match self {
            Node::Object(children) => children.values().map(|c| 1 + c.count()).sum(),
            Node::Array(items) => items.iter().flatten().map(|c| 1 + c.count()).sum(),
            Node::Leaf(_) => 0,
        }
    }

    fn collect_paths(&self, prefix: &Path, out: &mut Vec<Path>) {
        match self {
            Node::Object(children) => {
                for (key, child) in children {
                    let path = prefix.child(key.as_str());
                    child.collect_paths(&path, out);
                    out.push(path);
                }
            }
            Node::Array(items) => {
                for (i, slot) in items.iter().enumerate() {
                    if let Some(child) = slot {
                        let path = prefix.child(i);
                        child.collect_paths(&path, out);
                        out.push(path);
                    }
                }
            }
            Node::Leaf(_) => {}
        }
    }

    /// Plain value form: containers hold their read members, leaves their
    /// recorded value, unread sequence slots null.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Object(children) => Value::Object(
                children
                    .iter()
                    .map(|(k, child)| (k.clone(), child.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|slot| slot.as_ref().map_or(Value::Null, Node::to_value))
                    .collect(),
            ),
            Node::Leaf(value) => value.clone(),
        }
    }
}

/// Cumulative record of every state path read during a session.
///
/// Entries are only ever added. When the state's shape changes between
/// versions the existing entries are kept and the node shape is widened
/// (sequence slots become decimal keys, leaves become containers).
#[derive(Clone, Debug, PartialEq)]
pub struct AccessedPathTree {
    root: Node,
    paths: usize,
}

impl AccessedPathTree {
    pub fn new() -> Self {
        Self {
            root: Node::Object(BTreeMap::new()),
            paths: 0,
        }
    }

    /// Record a read of `value` at `path`.
    ///
    /// Missing ancestors are created. Returns true if the path was not yet
    /// recorded. Recording the root path is a no-op.
    pub fn record(&mut self, path: &Path, value: &Value) -> bool {
        let Some((last, ancestors)) = path.segments().split_last() else {
            return false;
        };

        let mut node = &mut self.root;
        let mut created = 0;
        for (depth, seg) in ancestors.iter().enumerate() {
            let next = path.segments()[depth + 1].clone();
            let (child, was_created) = node.child_mut(seg, || match next {
                Seg::Index(_) => Node::Array(Vec::new()),
                Seg::Key(_) => Node::Object(BTreeMap::new()),
            });
            created += usize::from(was_created);
            node = child;
        }

        let (leaf, was_created) = node.child_mut(last, || Node::for_value(value));
        if was_created {
            created += 1;
        } else {
            leaf.refresh(value);
        }
        self.paths += created;
        was_created
    }

    /// Whether `path` has been read. The root is always considered read.
    pub fn contains(&self, path: &Path) -> bool {
        self.node(path).is_some()
    }

    /// The recorded node at `path`.
    pub fn node(&self, path: &Path) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, seg| node.get(seg))
    }

    /// Number of recorded paths (every node below the root).
    pub fn len(&self) -> usize {
        self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths == 0
    }

    /// All recorded paths, sorted.
    pub fn paths(&self) -> Vec<Path> {
        let mut out = Vec::with_capacity(self.paths);
        self.root.collect_paths(&Path::root(), &mut out);
        out.sort();
        out
    }

    /// The `used` view: the read subtree as a plain value.
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    #[cfg(test)]
    fn recount(&self) -> usize {
        self.root.count()
    }
}

impl Default for AccessedPathTree {
    fn default() -> Self {
        Self::new()
    }
}
