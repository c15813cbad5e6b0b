use crate::node::NodeId;

/// Child-list change, as a structural observer would receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Root of the tree the change happened in (document or shadow root).
    pub root: NodeId,
    /// Node whose child list changed.
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(root: NodeId, target: NodeId, added: Vec<NodeId>) -> Self {
        Self {
            root,
            target,
            added,
            removed: Vec::new(),
        }
    }

    pub fn removed(root: NodeId, target: NodeId, removed: Vec<NodeId>) -> Self {
        Self {
            root,
            target,
            added: Vec::new(),
            removed,
        }
    }
}
