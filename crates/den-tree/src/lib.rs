//! Virtual path dispatch for the den HTTP framework.
//!
//! A [`PageTree`] maps virtual paths (sequences of segments) to leaf
//! handlers. Resolving a path walks the trie one segment at a time and hands
//! the first leaf it reaches the segments it did not consume.
//!
//! # Example
//!
//! ```rust
//! use den_tree::{MultiPage, PageHandler, PageTree, SinglePage};
//!
//! let mut tree: PageTree<Box<dyn PageHandler>> = PageTree::new();
//! tree.add_path(&["about"], Box::new(SinglePage::new("", "about us")));
//! tree.add_path(
//!     &["docs"],
//!     Box::new(MultiPage::new().with_page("guide/intro", "intro")),
//! );
//!
//! let (handler, rest) = tree.resolve(&["docs", "guide", "intro"]);
//! assert!(handler.is_some());
//! assert_eq!(rest, ["guide", "intro"]);
//!
//! assert_eq!(tree.all_pages(), ["about", "docs/guide/intro"]);
//! ```
//!
//! # Architecture
//!
//! Every node is empty, a branch, or a leaf:
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!           "about"         "docs"
//!           (leaf)             │
//!                          "v1" (leaf)
//! ```
//!
//! A lookup for `docs/v1/guide/intro` reaches the `v1` leaf and passes it
//! `guide/intro`. A lookup for `docs/v2` stops at `docs` and finds nothing.

#![doc(html_root_url = "https://docs.rs/den-tree/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod handler;
mod node;
mod page;
mod tree;

pub use handler::PageTreeHandler;
pub use node::{Node, NodeKind};
pub use page::{MultiPage, PageError, PageHandler, SinglePage};
pub use tree::PageTree;
