//! Uniqueness constraints checked at registration time.

use crate::tree::{Node, flatten_nodes};
use std::{collections::HashSet, sync::Arc};
use switchyard_core::{ComponentId, SingletonError};

/// The uniqueness constraint a component type places on any tree it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Singleton {
    /// Any number of instances may coexist.
    #[default]
    None,
    /// At most one instance of this exact type per tree.
    Type,
    /// At most one component carrying this role tag per tree.
    ///
    /// A component carries a tag when it lists it in
    /// [`Component::tags`](crate::Component::tags) or declares this same
    /// singleton.
    Tag(&'static str),
}

impl Singleton {
    /// Whether this is a real constraint.
    pub fn is_constrained(self) -> bool {
        !matches!(self, Singleton::None)
    }
}

fn carries(node: &Node, tag: &str) -> bool {
    node.tags.iter().any(|t| *t == tag)
        || matches!(node.singleton, Singleton::Tag(t) if t == tag)
}

/// Check whether registering `incoming` into the tree rooted at `root`
/// would violate any singleton declared inside `incoming`'s subtree.
///
/// Nodes that are part of `incoming` itself are never counted as conflicts,
/// so moving a subtree within its own tree is allowed.
pub(crate) fn check(incoming: &Arc<Node>, root: &Arc<Node>) -> Result<(), SingletonError> {
    let candidates: Vec<Arc<Node>> = flatten_nodes(incoming)
        .into_iter()
        .filter(|n| n.singleton.is_constrained())
        .collect();
    if candidates.is_empty() {
        return Ok(());
    }

    let moving: HashSet<ComponentId> = flatten_nodes(incoming).iter().map(|n| n.id).collect();
    let existing: Vec<Arc<Node>> = flatten_nodes(root)
        .into_iter()
        .filter(|n| !moving.contains(&n.id))
        .collect();

    for candidate in &candidates {
        let conflict = existing.iter().find(|e| match candidate.singleton {
            Singleton::None => false,
            Singleton::Type => e.type_id == candidate.type_id,
            Singleton::Tag(tag) => carries(e, tag),
        });
        if let Some(existing) = conflict {
            return Err(SingletonError {
                component: candidate.type_name,
                id: candidate.id,
                existing: existing.type_name,
                existing_id: existing.id,
            });
        }
    }
    Ok(())
}
