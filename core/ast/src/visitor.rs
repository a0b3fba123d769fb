//! Generic tree traversal.
//!
//! A [`Transformer`] visits a node and returns the id that should occupy the node's slot in its
//! parent: the same id for an in-place update, or a freshly allocated node (for example a cast
//! wrapping the original) for a rewrite. Read-only passes simply always return the id they were
//! given.

use crate::{arena::Arena, nodes::NodeId};

pub trait Transformer {
    fn arena_mut(&mut self) -> &mut Arena;

    /// Visits `id` and returns the node that replaces it.
    fn visit(&mut self, id: NodeId) -> NodeId;

    /// Visits every child of `id` in source order, redirecting the slots of replaced children.
    fn visit_children(&mut self, id: NodeId) {
        let children = self.arena_mut().children(id);
        for child in children {
            self.visit_child(id, child);
        }
    }

    /// Visits one child of `parent` and installs its replacement. Returns the resulting child id.
    fn visit_child(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let replacement = self.visit(child);
        if replacement != child {
            self.arena_mut().replace_child(parent, child, replacement);
        }
        replacement
    }
}
