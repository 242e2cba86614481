//! Command Tree Arena
//!
//! A `CommandTree` owns every node in a flat arena. Parent, child and
//! sibling relations are stored as `NodeId` indices, so the tree can be
//! edited in place without reference cycles.
//!
//! Nodes that are removed or replaced stay in the arena but become
//! detached; every traversal starts from the root and never visits them.

use indexmap::IndexSet;

use super::types::{Node, NodeId, NodeKind, TreeError};

#[derive(Debug, Clone, PartialEq)]
pub struct CommandTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena slots, including detached nodes
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id).ok_or(TreeError::InvalidNode { node: id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id).ok_or(TreeError::InvalidNode { node: id })
    }

    /// Direct access for ids obtained from this tree's own traversals
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn get_label(&self, id: NodeId) -> Result<String, TreeError> {
        Ok(self.node(id)?.get_label())
    }

    pub fn is_utility(&self, id: NodeId) -> bool {
        self.nodes.get(id).map(Node::is_utility).unwrap_or(false)
    }

    pub fn is_option(&self, id: NodeId) -> bool {
        self.nodes.get(id).map(Node::is_option).unwrap_or(false)
    }

    pub fn is_argument(&self, id: NodeId) -> bool {
        self.nodes.get(id).map(Node::is_argument).unwrap_or(false)
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].children.is_empty()
    }

    /// Number of nodes reachable from the root
    pub fn len(&self) -> usize {
        self.preorder().len()
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Place a node in the arena without attaching it
    pub fn new_node(&mut self, node: Node) -> Result<NodeId, TreeError> {
        if node.is_root() {
            return Err(TreeError::structural("a tree has exactly one root"));
        }
        let mut node = node;
        node.parent = None;
        node.children.clear();
        node.lsb = None;
        node.rsb = None;
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    /// Append a detached node as the last child of `parent`
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_attachable(parent, child)?;
        let kind = self.node(parent)?.kind;
        if let Some(max) = kind.max_children() {
            if self.nodes[parent].children.len() >= max {
                return Err(TreeError::structural(format!(
                    "{} node accepts at most {} children",
                    kind, max
                )));
            }
        }
        let lsb = self.nodes[parent].children.last().copied();
        self.nodes[parent].children.push(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.lsb = lsb;
        node.rsb = None;
        if let Some(lsb) = lsb {
            self.nodes[lsb].rsb = Some(child);
        }
        Ok(())
    }

    /// Swap `old` for the detached node `new`, keeping its position
    pub fn replace_child(&mut self, container: NodeId, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let index = self.child_position(container, old)?;
        self.check_attachable(container, new)?;
        self.nodes[container].children[index] = new;
        self.detach_links(old);
        self.relink_children(container);
        Ok(())
    }

    pub fn remove_child(&mut self, container: NodeId, child: NodeId) -> Result<(), TreeError> {
        let index = self.child_position(container, child)?;
        self.nodes[container].children.remove(index);
        self.detach_links(child);
        self.relink_children(container);
        Ok(())
    }

    /// Collapse the children between `lp` and `rp` into `new_child`, placed
    /// where `lp` was. Both parenthesis markers are removed.
    ///
    /// If `new_child` is the only node between the markers it is kept as
    /// is; otherwise the enclosed nodes become its children. Returns the
    /// insertion index.
    pub fn substitute_parentheses(
        &mut self,
        container: NodeId,
        lp: NodeId,
        rp: NodeId,
        new_child: NodeId,
    ) -> Result<usize, TreeError> {
        let lp_parent = self.node(lp)?.parent;
        let rp_parent = self.node(rp)?.parent;
        if lp_parent != rp_parent || lp_parent != Some(container) {
            return Err(TreeError::structural(
                "parenthesis markers do not share the same parent",
            ));
        }
        let left = self.child_position(container, lp)?;
        let right = self.child_position(container, rp)?;
        if right < left {
            return Err(TreeError::structural("right parenthesis precedes left parenthesis"));
        }

        let inner: Vec<NodeId> = self.nodes[container].children[left + 1..right].to_vec();
        let collapse_single = inner.len() == 1 && inner[0] == new_child;
        if !collapse_single {
            self.check_detached(new_child)?;
            if self.is_ancestor(new_child, container) {
                return Err(TreeError::structural("substitution would create a cycle"));
            }
            let kind = self.nodes[new_child].kind;
            if let Some(max) = kind.max_children() {
                if self.nodes[new_child].children.len() + inner.len() > max {
                    return Err(TreeError::structural(format!(
                        "{} node accepts at most {} children",
                        kind, max
                    )));
                }
            }
        }

        self.nodes[container].children.drain(left..=right);
        self.detach_links(lp);
        self.detach_links(rp);
        for &id in &inner {
            self.detach_links(id);
        }
        if !collapse_single {
            for &id in &inner {
                self.attach(new_child, id)?;
            }
        }
        self.nodes[container].children.insert(left, new_child);
        self.nodes[new_child].parent = Some(container);
        self.relink_children(container);
        Ok(left)
    }

    fn child_position(&self, container: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.node(child)?;
        self.node(container)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                TreeError::structural(format!("node {} is not a child of node {}", child, container))
            })
    }

    fn check_detached(&self, child: NodeId) -> Result<(), TreeError> {
        let node = self.node(child)?;
        if node.is_root() {
            return Err(TreeError::structural("the root cannot become a child"));
        }
        if node.parent.is_some() {
            return Err(TreeError::structural(format!("node {} already has a parent", child)));
        }
        Ok(())
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        self.check_detached(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TreeError::structural(format!(
                "attaching node {} under node {} would create a cycle",
                child, parent
            )));
        }
        Ok(())
    }

    fn detach_links(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.parent = None;
        node.lsb = None;
        node.rsb = None;
    }

    fn relink_children(&mut self, container: NodeId) {
        let children = self.nodes[container].children.clone();
        for (i, &child) in children.iter().enumerate() {
            let node = &mut self.nodes[child];
            node.parent = Some(container);
            node.lsb = if i > 0 { Some(children[i - 1]) } else { None };
            node.rsb = children.get(i + 1).copied();
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(c).and_then(|n| n.parent);
        }
        false
    }

    /// Nearest utility at or above `id`
    pub fn utility_of(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c)?;
            if node.is_utility() {
                return Ok(c);
            }
            current = node.parent;
        }
        Err(TreeError::NoUtilityFound { node: id })
    }

    pub fn grandparent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent.and_then(|p| self.nodes[p].parent)
    }

    /// Reachable nodes, parents before children
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Utility nodes in preorder, including nested ones
    pub fn utility_nodes(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_utility())
            .collect()
    }

    /// Distinct utility names; arguments are not searched
    pub fn get_utilities(&self) -> IndexSet<String> {
        let mut utilities = IndexSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_argument() {
                continue;
            }
            if node.is_utility() {
                utilities.insert(node.value.clone());
            }
            stack.extend(node.children.iter().rev());
        }
        utilities
    }

    /// All flag descendants of a utility, nested commands included
    pub fn flags_of(&self, utility: NodeId) -> Vec<NodeId> {
        let mut flags = Vec::new();
        let mut stack: Vec<NodeId> = self.get_children(utility).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.nodes[id].is_option() {
                flags.push(id);
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        flags
    }

    /// Direct flag children of a utility
    pub fn get_flags(&self, utility: NodeId) -> Vec<NodeId> {
        self.get_children(utility)
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_option())
            .collect()
    }

    pub fn get_subcommand(&self, utility: NodeId) -> Option<NodeId> {
        self.get_children(utility)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].is_utility())
    }

    /// First argument attached to a flag
    pub fn get_argument(&self, flag: NodeId) -> Option<NodeId> {
        self.get_children(flag)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].is_argument())
    }

    /// Whether the argument's type occurs more than once in its scope
    pub fn to_index(&self, argument: NodeId) -> bool {
        let Some(node) = self.nodes.get(argument) else {
            return false;
        };
        let Some(parent) = node.parent else {
            return false;
        };
        self.nodes[parent]
            .children
            .iter()
            .filter(|&&c| {
                let sibling = &self.nodes[c];
                sibling.is_argument() && !sibling.is_bracket() && sibling.arg_type == node.arg_type
            })
            .count()
            > 1
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Check parent, sibling and child-count invariants of the reachable tree
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.nodes[self.root].parent.is_some() {
            return Err(TreeError::structural("root has a parent"));
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if seen[id] {
                return Err(TreeError::structural(format!("node {} is reachable twice", id)));
            }
            seen[id] = true;
            let node = &self.nodes[id];
            if id != self.root && node.is_root() {
                return Err(TreeError::structural("more than one root"));
            }
            if node.children.len() < node.kind.min_children() {
                return Err(TreeError::structural(format!(
                    "{} node {} needs at least {} children",
                    node.kind,
                    id,
                    node.kind.min_children()
                )));
            }
            if let Some(max) = node.kind.max_children() {
                if node.children.len() > max {
                    return Err(TreeError::structural(format!(
                        "{} node {} has {} children",
                        node.kind,
                        id,
                        node.children.len()
                    )));
                }
            }
            for (i, &child) in node.children.iter().enumerate() {
                let c = self.node(child)?;
                if c.parent != Some(id) {
                    return Err(TreeError::structural(format!("node {} has a stale parent link", child)));
                }
                let lsb = if i > 0 { Some(node.children[i - 1]) } else { None };
                let rsb = node.children.get(i + 1).copied();
                if c.lsb != lsb || c.rsb != rsb {
                    return Err(TreeError::structural(format!("node {} has orphaned sibling links", child)));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Kind of the reachable child at `pos`, for terse assertions
    pub fn child_kind(&self, parent: NodeId, pos: usize) -> Option<NodeKind> {
        self.get_children(parent).get(pos).map(|&c| self.nodes[c].kind)
    }
}
