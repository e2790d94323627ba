//! PDF Page Tree Parser
//!
//! Flattens the page tree (ISO 32000-1 Section 7.7.3) into document order.
//! Intermediate `/Pages` nodes contribute inheritable attributes
//! (`Resources`, `MediaBox`, `CropBox`, `Rotate`) to the pages below them.
//!
//! # Example
//!
//! ```rust
//! use pdfgraph::objects::{Dictionary, Object, ObjectArena, ObjectResolver};
//! use pdfgraph::parser::page_tree::PageTree;
//!
//! let arena = ObjectArena::new();
//! let mut page = Dictionary::new();
//! page.set("Type", Object::name("Page"));
//! let page = arena.add_object(Object::Dictionary(page));
//!
//! let mut root = Dictionary::new();
//! root.set("Type", Object::name("Pages"));
//! root.set("Kids", vec![Object::Reference(page.id())]);
//! root.set("Rotate", 90);
//! let root = arena.add_object(Object::Dictionary(root));
//!
//! let tree = PageTree::build(&arena, &root);
//! assert_eq!(tree.len(), 1);
//! assert_eq!(tree.get(0).unwrap().inherited().get_integer("Rotate"), Some(90));
//! ```

use crate::objects::{Dictionary, Object, ObjectHandle, ObjectResolver};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Page attributes that a page may take from its ancestors.
pub const INHERITABLE_KEYS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// A leaf of the page tree plus what it inherits.
#[derive(Debug, Clone)]
pub struct PageNode {
    handle: ObjectHandle,
    inherited: Dictionary,
}

impl PageNode {
    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    /// Inheritable attributes collected from the ancestors, nearest wins.
    /// The page's own entries are not included.
    pub fn inherited(&self) -> &Dictionary {
        &self.inherited
    }

    pub fn into_parts(self) -> (ObjectHandle, Dictionary) {
        (self.handle, self.inherited)
    }
}

/// All pages of a document in order
#[derive(Debug, Clone, Default)]
pub struct PageTree {
    pages: Vec<PageNode>,
}

impl PageTree {
    /// Walk `root` depth-first. Every node is visited at most once, so a
    /// `/Kids` entry that loops back up the tree is skipped.
    pub fn build(resolver: &dyn ObjectResolver, root: &ObjectHandle) -> Self {
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        // (node, attributes inherited by the node)
        let mut stack = vec![(root.clone(), Dictionary::new())];

        while let Some((node, inherited)) = stack.pop() {
            if !visited.insert(node.identity()) {
                warn!("Page tree node {} reached twice, skipping", node.id());
                continue;
            }

            let (is_leaf, kids, passed_down) = {
                let value = node.borrow();
                let Some(dict) = value.as_dict() else {
                    warn!("Page tree node {} is a {}", node.id(), value.type_name());
                    continue;
                };
                let is_leaf = match dict.get_type() {
                    Some("Page") => true,
                    Some("Pages") => false,
                    _ => !dict.contains_key("Kids"),
                };

                let mut passed_down = inherited.clone();
                if !is_leaf {
                    for key in INHERITABLE_KEYS {
                        if let Some(value) = dict.get(key) {
                            passed_down.set(key, value.clone());
                        }
                    }
                }
                let kids = match dict.get("Kids") {
                    Some(kids) if !is_leaf => resolver.deref(kids),
                    _ => Object::Null,
                };
                (is_leaf, kids, passed_down)
            };

            if is_leaf {
                pages.push(PageNode {
                    handle: node,
                    inherited,
                });
                continue;
            }

            let kids = match kids {
                Object::Array(kids) => kids,
                Object::Null => Vec::new(),
                other => {
                    warn!("/Kids of {} is a {}", node.id(), other.type_name());
                    Vec::new()
                }
            };
            // Reverse so the first kid is processed first
            for kid in kids.iter().rev() {
                match resolver.handle_of(kid) {
                    Some(handle) => stack.push((handle, passed_down.clone())),
                    None => warn!("Skipping page tree kid {:?} of {}", kid, node.id()),
                }
            }
        }

        debug!("Page tree holds {} pages", pages.len());
        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PageNode> {
        self.pages.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageNode> {
        self.pages.iter()
    }
}
