//! Tree Annotator
//!
//! Precomputes the postorder numbering, left-most leaf descendants and
//! keyroots of a tree. These drive the dynamic program in `distance`.

use std::collections::HashMap;

use crate::ast::{CommandTree, Node, NodeId};

/// Read access to an ordered, rooted tree stored by index
pub trait Tree {
    type Node: ?Sized;

    /// `None` for an empty tree
    fn root(&self) -> Option<NodeId>;
    fn children(&self, id: NodeId) -> &[NodeId];
    fn node(&self, id: NodeId) -> &Self::Node;
}

/// Nodes that carry a label for the cost policy to compare
pub trait Labeled {
    fn label(&self) -> String;
}

impl Labeled for Node {
    fn label(&self) -> String {
        self.get_label()
    }
}

impl Labeled for str {
    fn label(&self) -> String {
        self.to_string()
    }
}

impl Tree for CommandTree {
    type Node = Node;

    fn root(&self) -> Option<NodeId> {
        Some(CommandTree::root(self))
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_children(id)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.get(id)
    }
}

/// A plain labeled tree, handy for tests and for callers that do not
/// work with command trees
#[derive(Debug, Clone, Default)]
pub struct SimpleTree {
    labels: Vec<String>,
    children: Vec<Vec<NodeId>>,
}

impl SimpleTree {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            labels: vec![label.into()],
            children: vec![Vec::new()],
        }
    }

    /// Append a new node under `parent` and return its id.
    ///
    /// On an empty tree the first node becomes the root and `parent` is
    /// ignored.
    pub fn add(&mut self, parent: NodeId, label: impl Into<String>) -> NodeId {
        let id = self.labels.len();
        self.labels.push(label.into());
        self.children.push(Vec::new());
        if id > 0 {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.push(id);
            }
        }
        id
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Same shape and labels, whatever order the nodes were added in
impl PartialEq for SimpleTree {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        let mut stack = vec![(0, 0)];
        while let Some((a, b)) = stack.pop() {
            let (left, right) = (&self.children[a], &other.children[b]);
            if self.labels[a] != other.labels[b] || left.len() != right.len() {
                return false;
            }
            stack.extend(left.iter().copied().zip(right.iter().copied()));
        }
        true
    }
}

impl Tree for SimpleTree {
    type Node = str;

    fn root(&self) -> Option<NodeId> {
        if self.labels.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn node(&self, id: NodeId) -> &str {
        &self.labels[id]
    }
}

/// Postorder view of a tree
#[derive(Debug)]
pub struct AnnotatedTree<'a, N: ?Sized> {
    /// Nodes in postorder, children before parents
    pub nodes: Vec<&'a N>,
    /// Source node id -> postorder index
    pub ids: HashMap<NodeId, usize>,
    /// Postorder index of each node's left-most leaf descendant
    pub lmds: Vec<usize>,
    /// Highest postorder index for each distinct lmd, ascending
    pub keyroots: Vec<usize>,
}

impl<'a, N: ?Sized> AnnotatedTree<'a, N> {
    pub fn new<T: Tree<Node = N>>(tree: &'a T) -> Self {
        let mut nodes = Vec::new();
        let mut ids = HashMap::new();
        let mut lmds = Vec::new();

        if let Some(root) = tree.root() {
            // (node, next child to visit)
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (id, cursor) = *top;
                let children = tree.children(id);
                if cursor < children.len() {
                    top.1 += 1;
                    stack.push((children[cursor], 0));
                    continue;
                }
                stack.pop();
                let index = nodes.len();
                let lmd = match children.first() {
                    Some(first) => lmds[ids[first]],
                    None => index,
                };
                nodes.push(tree.node(id));
                ids.insert(id, index);
                lmds.push(lmd);
            }
        }

        let mut highest: HashMap<usize, usize> = HashMap::new();
        for (i, &lmd) in lmds.iter().enumerate() {
            let entry = highest.entry(lmd).or_insert(i);
            *entry = (*entry).max(i);
        }
        let mut keyroots: Vec<usize> = highest.into_values().collect();
        keyroots.sort_unstable();

        Self {
            nodes,
            ids,
            lmds,
            keyroots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds a `SimpleTree` from notation like `f(d(a,c(b)),e)`
#[cfg(test)]
pub(crate) fn tree_of(notation: &str) -> SimpleTree {
    fn flush(tree: &mut SimpleTree, label: &mut String, parents: &[NodeId]) -> Option<NodeId> {
        if label.is_empty() {
            return None;
        }
        let parent = parents.last().copied().unwrap_or(0);
        let id = tree.add(parent, label.as_str());
        label.clear();
        Some(id)
    }

    let mut tree = SimpleTree::empty();
    let mut parents: Vec<NodeId> = Vec::new();
    let mut last = None;
    let mut label = String::new();
    for c in notation.chars() {
        match c {
            '(' => {
                if let Some(id) = flush(&mut tree, &mut label, &parents) {
                    last = Some(id);
                }
                parents.extend(last);
            }
            ',' => {
                flush(&mut tree, &mut label, &parents);
            }
            ')' => {
                flush(&mut tree, &mut label, &parents);
                last = parents.pop();
            }
            ' ' => {}
            _ => label.push(c),
        }
    }
    flush(&mut tree, &mut label, &parents);
    tree
}
