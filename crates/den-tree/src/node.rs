//! Trie node implementation.
//!
//! A node is exactly one of empty, a branch, or a leaf. The tagged
//! [`NodeKind`] makes "both a branch and a leaf" unrepresentable.

use std::collections::HashMap;

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind<H> {
    /// Neither children nor a handler.
    Empty,
    /// Children keyed by path segment.
    Branch(HashMap<String, Node<H>>),
    /// A handler answering every path below this node.
    Leaf(H),
}

/// One path segment in a [`PageTree`](crate::PageTree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<H> {
    id: String,
    kind: NodeKind<H>,
}

impl<H> Node<H> {
    /// Creates an empty node for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Empty,
        }
    }

    /// Returns the segment this node represents.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns what this node holds.
    #[must_use]
    pub fn kind(&self) -> &NodeKind<H> {
        &self.kind
    }

    /// Returns `true` if this node has a handler.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Returns `true` if this node has children.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch(_))
    }

    /// Returns the handler, if this node is a leaf.
    #[must_use]
    pub fn handler(&self) -> Option<&H> {
        match &self.kind {
            NodeKind::Leaf(handler) => Some(handler),
            NodeKind::Empty | NodeKind::Branch(_) => None,
        }
    }

    /// Returns the child for `segment`, if this node is a branch that has one.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Self> {
        match &self.kind {
            NodeKind::Branch(children) => children.get(segment),
            NodeKind::Empty | NodeKind::Leaf(_) => None,
        }
    }

    /// Iterates over the children, in no particular order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        let children = match &self.kind {
            NodeKind::Branch(children) => Some(children.values()),
            NodeKind::Empty | NodeKind::Leaf(_) => None,
        };
        children.into_iter().flatten()
    }

    /// Returns the child for `segment`, creating it if needed.
    ///
    /// A leaf becomes a branch and loses its handler.
    pub fn child_or_insert(&mut self, segment: &str) -> &mut Self {
        match self.kind {
            NodeKind::Branch(ref mut children) => children
                .entry(segment.to_string())
                .or_insert_with(|| Self::new(segment)),
            NodeKind::Leaf(_) => {
                tracing::debug!(node = %self.id, child = segment, "leaf converted to branch, handler discarded");
                self.kind = NodeKind::Branch(HashMap::new());
                self.child_or_insert(segment)
            }
            NodeKind::Empty => {
                self.kind = NodeKind::Branch(HashMap::new());
                self.child_or_insert(segment)
            }
        }
    }

    /// Makes this node a leaf holding `handler`.
    ///
    /// A branch keeps its children and ignores the handler; returns whether
    /// the handler was stored.
    pub fn set_handler(&mut self, handler: H) -> bool {
        if self.is_branch() {
            tracing::debug!(node = %self.id, "branch keeps its children, handler ignored");
            return false;
        }
        self.kind = NodeKind::Leaf(handler);
        true
    }
}
