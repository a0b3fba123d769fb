use streamc_types::Type;

use crate::nodes::{AnalysisStage, Location, Node, NodeId, NodeKind};

/// Index-addressed node storage.
///
/// Nodes are never removed. Rewrites allocate new nodes and redirect the parent's child slot
/// with [`Arena::replace_child`], so an id stays valid for the lifetime of the arena.
#[derive(Default, Clone, Debug)]
pub struct Arena {
    pub(crate) nodes: Vec<Node>,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, location: Location) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("arena exceeds u32::MAX nodes"));
        self.nodes.push(Node {
            id,
            location,
            kind,
            ty: None,
            stage: AnalysisStage::Unanalyzed,
        });
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    #[must_use]
    pub fn location(&self, id: NodeId) -> &Location {
        &self.get(id).location
    }

    #[must_use]
    pub fn ty(&self, id: NodeId) -> Option<&Type> {
        self.get(id).ty.as_ref()
    }

    pub fn set_type(&mut self, id: NodeId, ty: Type) {
        self.get_mut(id).ty = Some(ty);
    }

    #[must_use]
    pub fn stage(&self, id: NodeId) -> AnalysisStage {
        self.get(id).stage
    }

    /// Raises the watermark of `id` to `stage`.
    ///
    /// Returns `false` without touching the node when it is already at or past `stage`; the
    /// caller must then skip its visit.
    pub fn advance_stage(&mut self, id: NodeId, stage: AnalysisStage) -> bool {
        let node = self.get_mut(id);
        if node.stage >= stage {
            return false;
        }
        node.stage = stage;
        true
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Points every slot of `parent` that holds `old` at `new` instead.
    ///
    /// Returns whether any slot was rewritten.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let mut replaced = false;
        for slot in self.get_mut(parent).kind.child_slots_mut() {
            if *slot == old {
                *slot = new;
                replaced = true;
            }
        }
        replaced
    }

    /// Every node id in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Nodes reachable from `root`, depth-first in source order.
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        result
    }

    pub fn filter_nodes<T: Fn(&Node) -> bool>(&self, fn_predicate: T) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| fn_predicate(node))
            .map(|node| node.id)
            .collect()
    }
}
