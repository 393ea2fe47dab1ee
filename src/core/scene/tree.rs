//=========================================================================
// Node Tree
//=========================================================================
//
// Minimal in-memory hierarchical scene graph implementing SceneGraph.
//
// Nodes live in a map keyed by NodeId; the hierarchy is stored as
// parent links plus ordered child lists. Only nodes reachable from the
// root are traversed, so a detached node keeps existing (and keeps its
// component) until it is removed outright.
//
// NodeIds come from a process-wide counter: instantiating a template
// remaps every node to fresh ids, so handles from two live scenes never
// compare equal.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

//=== Internal Dependencies ===============================================

use super::SceneGraph;

//=== NodeId ==============================================================

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity handle for a node in a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, useful for logging.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== NodeEntry ===========================================================

#[derive(Debug, Clone)]
struct NodeEntry {
    name: String,
    properties: HashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    animation_time: f64,
}

impl NodeEntry {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            properties: HashMap::new(),
            parent,
            children: Vec::new(),
            animation_time: 0.0,
        }
    }
}

//=== NodeTree ============================================================

/// Named tree of nodes with string properties and an animation clock.
#[derive(Debug)]
pub struct NodeTree {
    name: String,
    root: NodeId,
    nodes: HashMap<NodeId, NodeEntry>,
}

impl NodeTree {
    //--- Construction -----------------------------------------------------

    /// Creates a tree holding only a root node named `"Root"`.
    pub fn new(name: impl Into<String>) -> Self {
        let root = NodeId::fresh();
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeEntry::new("Root".to_string(), None));

        Self {
            name: name.into(),
            root,
            nodes,
        }
    }

    /// Root node of the tree.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes, attached or detached.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    //--- Structure --------------------------------------------------------

    /// Appends a new node under `parent`.
    ///
    /// Returns `None` if `parent` does not exist.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }

        let id = NodeId::fresh();
        self.nodes.insert(id, NodeEntry::new(name.into(), Some(parent)));
        self.nodes.get_mut(&parent)?.children.push(id);
        Some(id)
    }

    /// Unlinks a node (and its subtree) from its parent. The nodes stay in
    /// the tree and can be attached again.
    ///
    /// Returns false for the root, unknown nodes, and already detached nodes.
    pub fn detach(&mut self, node: NodeId) -> bool {
        if node == self.root {
            return false;
        }

        let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) else {
            return false;
        };

        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children.retain(|&c| c != node);
        }
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = None;
        }
        true
    }

    /// Moves a node under `parent`, appending it after existing children.
    ///
    /// Returns false if either node is unknown, `node` is the root, or
    /// `parent` lies inside `node`'s subtree.
    pub fn attach(&mut self, parent: NodeId, node: NodeId) -> bool {
        if node == self.root || !self.nodes.contains_key(&node) || !self.nodes.contains_key(&parent) {
            return false;
        }
        if self.is_within(parent, node) {
            return false;
        }

        self.detach(node);

        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children.push(node);
        }
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = Some(parent);
        }
        true
    }

    /// Deletes a node and its whole subtree. Returns the number of nodes
    /// removed; the root cannot be removed.
    pub fn remove(&mut self, node: NodeId) -> usize {
        if node == self.root || !self.nodes.contains_key(&node) {
            return 0;
        }

        self.detach(node);

        let mut removed = 0;
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(entry) = self.nodes.remove(&id) {
                pending.extend(entry.children);
                removed += 1;
            }
        }
        removed
    }

    //--- Queries ----------------------------------------------------------

    /// Name of a node.
    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    /// Parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// Children of a node in source order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_within(node, self.root)
    }

    /// First attached node with this name, in traversal order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find(|entry| entry.name == name)
    }

    /// First attached node whose property `key` equals `value`.
    pub fn find_by_property(&self, key: &str, value: &str) -> Option<NodeId> {
        self.find(|entry| entry.properties.get(key).is_some_and(|v| v == value))
    }

    /// Sets a string property on a node. Returns false if the node is unknown.
    pub fn set_property(&mut self, node: NodeId, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.nodes.get_mut(&node) {
            Some(entry) => {
                entry.properties.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Reads a string property from a node.
    pub fn property(&self, node: NodeId, key: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|n| n.properties.get(key))
            .map(String::as_str)
    }

    /// Accumulated animation time of a node in seconds.
    pub fn animation_time(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(&node).map(|n| n.animation_time)
    }

    //--- Internal Helpers -------------------------------------------------

    fn find(&self, mut predicate: impl FnMut(&NodeEntry) -> bool) -> Option<NodeId> {
        let mut found = None;
        self.visit_from(self.root, &mut |id| {
            if found.is_none() && self.nodes.get(&id).is_some_and(&mut predicate) {
                found = Some(id);
            }
        });
        found
    }

    // True if `node` is `ancestor` or sits somewhere below it.
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn visit_from(&self, start: NodeId, visit: &mut dyn FnMut(NodeId)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(entry) = self.nodes.get(&id) else {
                continue;
            };
            visit(id);
            stack.extend(entry.children.iter().rev().copied());
        }
    }
}

//=== SceneGraph Implementation ===========================================

impl SceneGraph for NodeTree {
    type NodeId = NodeId;

    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self) -> Self {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();

        let remap: HashMap<NodeId, NodeId> = ids.iter().map(|&old| (old, NodeId::fresh())).collect();

        let nodes = self
            .nodes
            .iter()
            .map(|(old, entry)| {
                let mut entry = entry.clone();
                entry.parent = entry.parent.map(|p| remap[&p]);
                entry.children = entry.children.iter().map(|c| remap[c]).collect();
                (remap[old], entry)
            })
            .collect();

        Self {
            name: self.name.clone(),
            root: remap[&self.root],
            nodes,
        }
    }

    fn for_each_node(&self, visit: &mut dyn FnMut(NodeId)) {
        self.visit_from(self.root, visit);
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn advance_animation(&mut self, node: NodeId, delta: f64) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.animation_time += delta;
        }
    }
}

//=== Tests ===============================================================
