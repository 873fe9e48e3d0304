//! Stream priority dependency tree (RFC 7540 Section 5.3)
//!
//! Every stream depends on exactly one other stream, with stream 0 as the
//! implicit root. PRIORITY frames may name streams in any state, including
//! ones never opened, so the tree tracks ids independently of the stream
//! table.

use crate::error::{Error, ErrorCode, Result};
use crate::frames::PrioritySpec;
use std::collections::HashMap;

/// The implicit root every stream ultimately depends on.
pub const ROOT: u32 = 0;

/// Default weight transmitted as 15, effective 16 (RFC 7540 Section 5.3.5).
pub const DEFAULT_WEIGHT: u8 = 15;

#[derive(Debug)]
struct Node {
    parent: u32,
    weight: u8,
    children: Vec<u32>,
}

impl Node {
    fn new(parent: u32) -> Self {
        Node {
            parent,
            weight: DEFAULT_WEIGHT,
            children: Vec::new(),
        }
    }
}

/// The dependency tree of one connection.
#[derive(Debug)]
pub struct PriorityTree {
    nodes: HashMap<u32, Node>,
}

impl PriorityTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, Node::new(ROOT));
        PriorityTree { nodes }
    }

    /// Declared (wire) weight of a stream; effective weight is this plus 1.
    pub fn weight(&self, stream_id: u32) -> u8 {
        self.nodes
            .get(&stream_id)
            .map(|n| n.weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn parent(&self, stream_id: u32) -> Option<u32> {
        if stream_id == ROOT {
            return None;
        }
        Some(self.nodes.get(&stream_id).map(|n| n.parent).unwrap_or(ROOT))
    }

    pub fn children(&self, stream_id: u32) -> &[u32] {
        self.nodes
            .get(&stream_id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Apply a dependency update from a PRIORITY frame or a HEADERS
    /// priority field.
    ///
    /// Depending on itself is a stream-level PROTOCOL_ERROR. If the named
    /// parent is currently a descendant of the stream, that parent is first
    /// moved up to the stream's old position (RFC 7540 Section 5.3.3).
    /// Exclusive updates adopt all of the parent's other children.
    pub fn update(&mut self, stream_id: u32, spec: &PrioritySpec) -> Result<()> {
        if spec.depends_on == stream_id {
            return Err(Error::stream(stream_id, ErrorCode::ProtocolError));
        }

        self.ensure_node(stream_id);
        self.ensure_node(spec.depends_on);

        if self.is_descendant(spec.depends_on, stream_id) {
            let old_parent = self.parent(stream_id).unwrap_or(ROOT);
            self.move_node(spec.depends_on, old_parent);
        }

        self.move_node(stream_id, spec.depends_on);
        if let Some(node) = self.nodes.get_mut(&stream_id) {
            node.weight = spec.weight;
        }

        if spec.exclusive {
            let siblings: Vec<u32> = self
                .children(spec.depends_on)
                .iter()
                .copied()
                .filter(|&c| c != stream_id)
                .collect();
            for sibling in siblings {
                self.move_node(sibling, stream_id);
            }
        }
        Ok(())
    }

    /// Drop a stream from the tree, splicing its children onto its parent.
    pub fn remove(&mut self, stream_id: u32) {
        if stream_id == ROOT {
            return;
        }
        let Some(node) = self.nodes.remove(&stream_id) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(&node.parent) {
            parent.children.retain(|&c| c != stream_id);
        }
        for child in node.children {
            if let Some(child_node) = self.nodes.get_mut(&child) {
                child_node.parent = node.parent;
            }
            if let Some(parent) = self.nodes.get_mut(&node.parent) {
                parent.children.push(child);
            }
        }
    }

    fn ensure_node(&mut self, stream_id: u32) {
        if !self.nodes.contains_key(&stream_id) {
            self.nodes.insert(stream_id, Node::new(ROOT));
            if let Some(root) = self.nodes.get_mut(&ROOT) {
                root.children.push(stream_id);
            }
        }
    }

    /// Whether `candidate` sits somewhere below `ancestor`.
    fn is_descendant(&self, candidate: u32, ancestor: u32) -> bool {
        let mut current = candidate;
        while current != ROOT {
            match self.nodes.get(&current).map(|n| n.parent) {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Reattach `stream_id` under `new_parent`, fixing both child lists.
    fn move_node(&mut self, stream_id: u32, new_parent: u32) {
        let old_parent = match self.nodes.get(&stream_id) {
            Some(node) => node.parent,
            None => return,
        };
        if let Some(parent) = self.nodes.get_mut(&old_parent) {
            parent.children.retain(|&c| c != stream_id);
        }
        if let Some(node) = self.nodes.get_mut(&stream_id) {
            node.parent = new_parent;
        }
        if let Some(parent) = self.nodes.get_mut(&new_parent) {
            parent.children.push(stream_id);
        }
    }
}

impl Default for PriorityTree {
    fn default() -> Self {
        PriorityTree::new()
    }
}
