// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trees of histories mirroring a test hierarchy.
//!
//! Every node pairs a [`HistoryBuffer`] with a name, a publish flag, and its
//! position in the tree. Nodes live in a [`HistoryTree`] arena and refer to each
//! other by [`NodeId`]:
//!
//! - children are owned by the arena and listed by their parent in attach
//!   order;
//! - the parent link is a plain ID. It is set only by
//!   [`HistoryTree::attach_child`] and never implies ownership.
//!
//! # Tie-breaking
//!
//! When several children share the greatest flakiness (or the smallest
//! stability), the one attached first wins.

use crate::{
    buffer::HistoryBuffer,
    errors::AttachChildError,
    metrics::{self, StabilityMetrics},
    outcome::OutcomeRecord,
};
use std::{fmt, ops::Index};
use tracing::debug;

/// Identifies a node within a [`HistoryTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the position of this node in its tree's arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The history of one monitored unit: a test case, or an aggregate such as a
/// class or a suite.
#[derive(Clone, Debug)]
pub struct HistoryNode {
    name: String,
    should_publish: bool,
    buffer: HistoryBuffer,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl HistoryNode {
    /// Creates an unnamed node with an empty history of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self::with_buffer(HistoryBuffer::new(capacity))
    }

    /// Creates an unnamed node owning `buffer`.
    pub fn with_buffer(buffer: HistoryBuffer) -> Self {
        Self {
            name: String::new(),
            should_publish: false,
            buffer,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates an unnamed node whose history is a copy of `previous`'s
    /// chronological records, in a fresh buffer of the given capacity.
    pub fn cloned_from(previous: &HistoryBuffer, capacity: usize) -> Self {
        Self::with_buffer(previous.resized_copy(capacity))
    }

    /// Returns the name of the unit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name of the unit.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Returns true if this unit's results should be published in reports.
    pub fn should_publish(&self) -> bool {
        self.should_publish
    }

    /// Sets whether this unit's results should be published in reports.
    pub fn set_should_publish(&mut self, should_publish: bool) -> &mut Self {
        self.should_publish = should_publish;
        self
    }

    /// Returns the history buffer.
    pub fn buffer(&self) -> &HistoryBuffer {
        &self.buffer
    }

    /// Appends an outcome to the history. See [`HistoryBuffer::add`].
    pub fn add(&mut self, record: OutcomeRecord) -> bool {
        self.buffer.add(record)
    }

    /// Returns the parent of this node, if it has been attached to one.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children of this node, in attach order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the number of records in the history.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of failing records in the history.
    pub fn failed_count(&self) -> usize {
        metrics::failed_count(self.buffer.iter())
    }

    /// Returns the percentage of passing records in the history.
    pub fn stability(&self) -> u32 {
        metrics::stability(self.buffer.iter())
    }

    /// Returns the percentage of adjacent records whose status differs.
    pub fn flakiness(&self) -> u32 {
        metrics::flakiness(self.buffer.iter())
    }

    /// Returns all metrics at once.
    pub fn metrics(&self) -> StabilityMetrics {
        StabilityMetrics::for_buffer(&self.buffer)
    }

    /// Returns true if the unit passed in the previous run and failed in the
    /// latest one.
    pub fn is_most_recent_regressed(&self) -> bool {
        self.buffer.is_most_recent_regressed()
    }
}

/// An arena of [`HistoryNode`]s linked into trees.
///
/// Nodes are never deallocated individually: a node removed from its parent
/// stays in the arena, detached, until the tree is dropped.
#[derive(Clone, Debug, Default)]
pub struct HistoryTree {
    nodes: Vec<HistoryNode>,
}

impl HistoryTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached node to the arena and returns its ID.
    pub fn insert(&mut self, node: HistoryNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Returns the number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by this tree.
    pub fn node(&self, id: NodeId) -> &HistoryNode {
        &self.nodes[id.0]
    }

    /// Returns the node with the given ID, mutably.
    ///
    /// The tree structure can only be changed through
    /// [`Self::attach_child`] and [`Self::remove_child`].
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by this tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut HistoryNode {
        &mut self.nodes[id.0]
    }

    /// Iterates over every node in the arena, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HistoryNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Iterates over the direct children of `parent`, in attach order.
    pub fn children(
        &self,
        parent: NodeId,
    ) -> impl Iterator<Item = (NodeId, &HistoryNode)> + '_ {
        self.node(parent)
            .children
            .iter()
            .map(|&child| (child, self.node(child)))
    }

    /// Iterates over the ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, |&ancestor| {
            self.node(ancestor).parent
        })
    }

    /// Attaches `child` to `parent`.
    ///
    /// Returns `Ok(true)` if the child was attached, and `Ok(false)` if it was
    /// already a child of `parent` (in which case nothing changes).
    pub fn attach_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<bool, AttachChildError> {
        match self.node(child).parent {
            Some(existing) if existing == parent => return Ok(false),
            Some(existing_parent) => {
                return Err(AttachChildError::AlreadyAttached {
                    child,
                    existing_parent,
                });
            }
            None => {}
        }

        if child == parent || self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(AttachChildError::WouldCycle { parent, child });
        }

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(true)
    }

    /// Detaches every child of `parent` named `name`, returning the detached
    /// nodes in their former order.
    ///
    /// Children with the same name cannot be told apart here, so all of them
    /// are removed.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self
            .children(parent)
            .filter(|(_, child)| child.name == name)
            .map(|(id, _)| id)
            .collect();
        if removed.is_empty() {
            return removed;
        }

        self.nodes[parent.0]
            .children
            .retain(|child| !removed.contains(child));
        for &child in &removed {
            self.nodes[child.0].parent = None;
        }

        debug!(
            "removed {} children named {name:?} from {:?}",
            removed.len(),
            self.node(parent).name,
        );
        removed
    }

    /// Returns the direct child of `id` with the greatest flakiness.
    pub fn flakiest_child(&self, id: NodeId) -> Option<NodeId> {
        self.extreme_child(id, HistoryNode::flakiness, |candidate, best| {
            candidate > best
        })
    }

    /// Follows [`Self::flakiest_child`] down to a leaf, returning the deepest
    /// node reached.
    ///
    /// Returns `None` if `id` has no children.
    pub fn flakiest_descendant(&self, id: NodeId) -> Option<NodeId> {
        let mut deepest = None;
        let mut current = id;
        while let Some(child) = self.flakiest_child(current) {
            deepest = Some(child);
            current = child;
        }
        deepest
    }

    /// Returns the direct child of `id` with the smallest stability.
    pub fn least_stable_child(&self, id: NodeId) -> Option<NodeId> {
        self.extreme_child(id, HistoryNode::stability, |candidate, best| {
            candidate < best
        })
    }

    /// Returns the least stable descendant of `id`.
    ///
    /// Unlike [`Self::flakiest_descendant`], this only looks one level down:
    /// it returns the same node as [`Self::least_stable_child`].
    pub fn least_stable_descendant(&self, id: NodeId) -> Option<NodeId> {
        self.least_stable_child(id)
    }

    /// Picks the child whose metric beats every earlier child's. Earlier
    /// children win ties.
    fn extreme_child(
        &self,
        id: NodeId,
        metric: fn(&HistoryNode) -> u32,
        beats: fn(u32, u32) -> bool,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32)> = None;
        for (child, node) in self.children(id) {
            let value = metric(node);
            match best {
                Some((_, best_value)) if !beats(value, best_value) => {}
                _ => best = Some((child, value)),
            }
        }
        best.map(|(child, _)| child)
    }
}

impl Index<NodeId> for HistoryTree {
    type Output = HistoryNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.node(id)
    }
}
