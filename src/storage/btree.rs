//! B+ Tree for LayerDB
//!
//! This module implements the ordered search tree used both as the primary
//! row store (row id -> row) and as the per-column secondary indexes
//! (column value -> row id).
//!
//! Nodes live in an arena owned by the tree and refer to each other by
//! [`NodeId`]. Leaves are chained left to right so range scans walk the
//! chain instead of re-descending. The tree only grows: there is no
//! physical deletion and no rebalancing, and nodes created by a split are
//! never reclaimed. Equal keys are allowed; they are kept in insertion
//! order.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default node order (maximum children per internal node)
pub const DEFAULT_ORDER: usize = 4;

const MIN_ORDER: usize = 3;

/// Index of a node in the tree's arena
pub type NodeId = usize;

/// B+ Tree Node
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node<K, V> {
    /// Internal node with separator keys and one more child than keys
    Internal { keys: Vec<K>, children: Vec<NodeId> },
    /// Leaf node with keys, parallel values and the next leaf in key order
    Leaf {
        keys: Vec<K>,
        values: Vec<V>,
        next: Option<NodeId>,
    },
}

impl<K, V> Node<K, V> {
    fn empty_leaf() -> Self {
        Node::Leaf {
            keys: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }

    fn key_count(&self) -> usize {
        match self {
            Node::Internal { keys, .. } | Node::Leaf { keys, .. } => keys.len(),
        }
    }
}

/// Ordered key -> value tree with leaf-chain range scans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTree<K, V> {
    /// Node arena; index 0 is the first leaf ever created
    nodes: Vec<Node<K, V>>,
    /// Root node
    root: NodeId,
    /// Maximum number of children per node
    order: usize,
    /// Number of entries
    size: usize,
}

impl<K: Ord + Clone, V> Default for SearchTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> SearchTree<K, V> {
    /// Create a new empty tree with the default order
    pub fn new() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }

    /// Create a new empty tree with the given order (clamped to at least 3)
    pub fn with_order(order: usize) -> Self {
        Self {
            nodes: vec![Node::empty_leaf()],
            root: 0,
            order: order.max(MIN_ORDER),
            size: 0,
        }
    }

    /// Node order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of entries in the tree
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of levels from the root down to the leaves
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        while let Node::Internal { children, .. } = &self.nodes[id] {
            id = children[0];
            height += 1;
        }
        height
    }

    fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Insert a key-value pair into the tree
    pub fn insert(&mut self, key: K, value: V) {
        if let Some((promoted, right)) = self.insert_into(self.root, key, value) {
            // Root split, create new root
            let left = self.root;
            self.root = self.push(Node::Internal {
                keys: vec![promoted],
                children: vec![left, right],
            });
            trace!(root = self.root, "search tree grew a new root");
        }
        self.size += 1;
    }

    fn insert_into(&mut self, id: NodeId, key: K, value: V) -> Option<(K, NodeId)> {
        // Equal keys go right so duplicates keep insertion order
        let descend = match &self.nodes[id] {
            Node::Internal { keys, children } => {
                let pos = keys.partition_point(|k| k <= &key);
                Some((pos, children[pos]))
            }
            Node::Leaf { .. } => None,
        };

        match descend {
            None => {
                if let Node::Leaf { keys, values, .. } = &mut self.nodes[id] {
                    let pos = keys.partition_point(|k| k <= &key);
                    keys.insert(pos, key);
                    values.insert(pos, value);
                }
            }
            Some((pos, child)) => {
                let (promoted, right) = self.insert_into(child, key, value)?;
                if let Node::Internal { keys, children } = &mut self.nodes[id] {
                    keys.insert(pos, promoted);
                    children.insert(pos + 1, right);
                }
            }
        }

        if self.nodes[id].key_count() > self.max_keys() {
            Some(self.split(id))
        } else {
            None
        }
    }

    /// Split an overflowing node, returning the promoted key and the new right sibling
    fn split(&mut self, id: NodeId) -> (K, NodeId) {
        let right_id = self.nodes.len();
        let (promoted, right) = match &mut self.nodes[id] {
            Node::Leaf { keys, values, next } => {
                let mid = keys.len() / 2;
                let right_keys = keys.split_off(mid);
                let right_values = values.split_off(mid);
                let promoted = right_keys[0].clone();
                let right = Node::Leaf {
                    keys: right_keys,
                    values: right_values,
                    next: next.replace(right_id),
                };
                (promoted, right)
            }
            Node::Internal { keys, children } => {
                let mid = keys.len() / 2;
                let right_keys = keys.split_off(mid + 1);
                let promoted = keys.remove(mid);
                let right_children = children.split_off(mid + 1);
                let right = Node::Internal {
                    keys: right_keys,
                    children: right_children,
                };
                (promoted, right)
            }
        };
        trace!(left = id, right = right_id, "split search tree node");
        (promoted, self.push(right))
    }

    fn push(&mut self, node: Node<K, V>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Descend to the leftmost leaf that may hold `key`
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut id = self.root;
        while let Node::Internal { keys, children } = &self.nodes[id] {
            id = children[keys.partition_point(|k| k < key)];
        }
        id
    }

    fn leftmost_leaf(&self) -> NodeId {
        let mut id = self.root;
        while let Node::Internal { children, .. } = &self.nodes[id] {
            id = children[0];
        }
        id
    }

    /// Find the leaf slot of the first entry equal to `key`
    fn locate(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut leaf = Some(self.find_leaf(key));
        while let Some(id) = leaf {
            let Node::Leaf { keys, next, .. } = &self.nodes[id] else {
                return None;
            };
            let pos = keys.partition_point(|k| k < key);
            if pos < keys.len() {
                return (keys[pos] == *key).then_some((id, pos));
            }
            // Every key here is smaller; duplicates may continue on the next leaf
            leaf = *next;
        }
        None
    }

    /// Search for a key, returning the first matching value in key order
    pub fn search(&self, key: &K) -> Option<&V> {
        let (id, pos) = self.locate(key)?;
        match &self.nodes[id] {
            Node::Leaf { values, .. } => values.get(pos),
            Node::Internal { .. } => None,
        }
    }

    /// Mutable variant of [`search`](Self::search)
    pub fn search_mut(&mut self, key: &K) -> Option<&mut V> {
        let (id, pos) = self.locate(key)?;
        match &mut self.nodes[id] {
            Node::Leaf { values, .. } => values.get_mut(pos),
            Node::Internal { .. } => None,
        }
    }

    /// Range scan: all entries with `start <= key <= end`, ascending.
    ///
    /// A missing bound is unbounded on that side.
    pub fn range_query(&self, start: Option<&K>, end: Option<&K>) -> Vec<(&K, &V)> {
        let mut result = Vec::new();
        let mut leaf = Some(match start {
            Some(s) => self.find_leaf(s),
            None => self.leftmost_leaf(),
        });

        while let Some(id) = leaf {
            let Node::Leaf { keys, values, next } = &self.nodes[id] else {
                break;
            };
            for (key, value) in keys.iter().zip(values) {
                if start.map_or(false, |s| key < s) {
                    continue;
                }
                if end.map_or(false, |e| key > e) {
                    return result;
                }
                result.push((key, value));
            }
            leaf = *next;
        }
        result
    }

    /// Get all entries in the tree (sorted)
    pub fn scan_all(&self) -> Vec<(&K, &V)> {
        self.range_query(None, None)
    }

    /// Visit every entry in key order with mutable access to its value
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        let mut leaf = Some(self.leftmost_leaf());
        while let Some(id) = leaf {
            let Node::Leaf { keys, values, next } = &mut self.nodes[id] else {
                break;
            };
            for (key, value) in keys.iter().zip(values.iter_mut()) {
                f(key, value);
            }
            leaf = *next;
        }
    }
}
