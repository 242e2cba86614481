//! Tree Builder
//!
//! Construction front-end for `CommandTree`. The builder owns the
//! per-scope argument counters that assign each argument its 1-based
//! occurrence index, and is dropped once the tree is finished.

use std::collections::HashMap;

use super::tree::CommandTree;
use super::types::{ArgType, Node, NodeId, NodeKind, TreeError};

#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: CommandTree,
    /// Governing utility/flag -> occurrences per argument type
    counters: HashMap<NodeId, HashMap<ArgType, usize>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.tree.node(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.tree.node_mut(id)
    }

    /// Create a detached node
    pub fn create(&mut self, node: Node) -> Result<NodeId, TreeError> {
        self.tree.new_node(node)
    }

    /// Create `node` and append it under `parent`
    pub fn add(&mut self, parent: NodeId, node: Node) -> Result<NodeId, TreeError> {
        let id = self.tree.new_node(node)?;
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Append a detached node under `parent`.
    ///
    /// Arguments placed directly under a utility or flag get the next
    /// occurrence index for their type within that scope; parenthesis
    /// markers are not counted.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.tree.attach(parent, child)?;
        let scoped = matches!(self.tree.node(parent)?.kind, NodeKind::Utility | NodeKind::Flag);
        let node = self.tree.node(child)?;
        if scoped && node.is_argument() && !node.is_bracket() {
            let arg_type = node.arg_type();
            let count = self
                .counters
                .entry(parent)
                .or_default()
                .entry(arg_type)
                .or_insert(0);
            *count += 1;
            let index = *count;
            self.tree.node_mut(child)?.index = index;
        }
        Ok(())
    }

    pub fn replace_child(&mut self, container: NodeId, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.tree.replace_child(container, old, new)
    }

    pub fn remove_child(&mut self, container: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.tree.remove_child(container, child)
    }

    /// Insert a detached node at `index` among `container`'s children
    pub fn insert_child(&mut self, container: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        let children = self.tree.get_children(container).to_vec();
        if index >= children.len() {
            return self.add_child(container, child);
        }
        // Re-append the tail after the new node so sibling links stay exact.
        for &c in &children[index..] {
            self.tree.remove_child(container, c)?;
        }
        self.tree.attach(container, child)?;
        for &c in &children[index..] {
            self.tree.attach(container, c)?;
        }
        Ok(())
    }

    pub fn substitute_parentheses(
        &mut self,
        container: NodeId,
        lp: NodeId,
        rp: NodeId,
        new_child: NodeId,
    ) -> Result<usize, TreeError> {
        self.tree.substitute_parentheses(container, lp, rp, new_child)
    }

    pub fn finish(self) -> CommandTree {
        self.tree
    }
}
