//! The virtual path trie.

use crate::node::{Node, NodeKind};
use crate::PageHandler;

/// Maps virtual paths to leaf handlers.
///
/// Lookups descend strictly: at each branch the next segment must match a
/// child exactly, with no backtracking into sibling branches. The first
/// leaf reached answers the lookup and receives the unconsumed segments.
///
/// Registration order matters for overlapping paths:
///
/// - registering `a/b` then `a` leaves `a` a branch (the second call is a no-op)
/// - registering `a` then `a/b` turns `a` into a branch and drops its handler
///
/// # Example
///
/// ```
/// use den_tree::PageTree;
///
/// let mut tree = PageTree::new();
/// tree.add_path(&["docs"], "docs handler");
///
/// let path = ["docs", "guide", "intro"];
/// let (handler, rest) = tree.resolve(&path);
/// assert_eq!(handler, Some(&"docs handler"));
/// assert_eq!(rest, ["guide", "intro"]);
/// ```
#[derive(Debug, Clone)]
pub struct PageTree<H> {
    root: Node<H>,
}

impl<H> PageTree<H> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new(""),
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &Node<H> {
        &self.root
    }

    /// Registers `handler` at `segments`. An empty path is ignored.
    pub fn add_path<S: AsRef<str>>(&mut self, segments: &[S], handler: H) {
        if segments.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for segment in segments {
            node = node.child_or_insert(segment.as_ref());
        }
        node.set_handler(handler);
    }

    /// Resolves `segments` to a handler and the segments it should serve.
    ///
    /// Returns `None` with the unmatched segments when descent stops before
    /// reaching a leaf.
    pub fn resolve<'p, S: AsRef<str>>(&self, segments: &'p [S]) -> (Option<&H>, &'p [S]) {
        let mut node = &self.root;
        let mut rest = segments;

        loop {
            match node.kind() {
                NodeKind::Leaf(handler) => return (Some(handler), rest),
                NodeKind::Empty => return (None, rest),
                NodeKind::Branch(children) => {
                    let Some((first, tail)) = rest.split_first() else {
                        return (None, rest);
                    };
                    match children.get(first.as_ref()) {
                        Some(child) => {
                            node = child;
                            rest = tail;
                        }
                        None => return (None, rest),
                    }
                }
            }
        }
    }

    /// Returns the number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                count += 1;
            }
            stack.extend(node.children());
        }
        count
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits every leaf with its registered path.
    fn for_each_leaf<'a>(&'a self, mut visit: impl FnMut(&[&'a str], &'a H)) {
        let mut stack: Vec<(Vec<&'a str>, &'a Node<H>)> = vec![(Vec::new(), &self.root)];
        while let Some((path, node)) = stack.pop() {
            match node.kind() {
                NodeKind::Leaf(handler) => visit(&path, handler),
                NodeKind::Empty => {}
                NodeKind::Branch(_) => {
                    for child in node.children() {
                        let mut child_path = path.clone();
                        child_path.push(child.id());
                        stack.push((child_path, child));
                    }
                }
            }
        }
    }
}

impl<H: PageHandler> PageTree<H> {
    /// Lists every page reachable in the tree, sorted.
    ///
    /// Each page is prefixed with the path its handler is registered at.
    #[must_use]
    pub fn all_pages(&self) -> Vec<String> {
        let mut pages = Vec::new();
        self.for_each_leaf(|path, handler| {
            let prefix = path.join("/");
            for page in handler.all_pages() {
                if page.is_empty() {
                    pages.push(prefix.clone());
                } else {
                    pages.push(format!("{prefix}/{page}"));
                }
            }
        });
        pages.sort();
        pages
    }
}

impl<H> Default for PageTree<H> {
    fn default() -> Self {
        Self::new()
    }
}
