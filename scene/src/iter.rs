//! Traversal of the node hierarchy.
//!
//! Both iterators borrow the scene and are `Clone`, so a traversal can be
//! restarted or forked at any point.

use std::collections::VecDeque;

use crate::node::NodeId;
use crate::scene::Scene;

/// Pre-order depth-first traversal.
#[derive(Clone)]
pub struct DepthFirstIterator<'a> {
    scene: &'a Scene,
    stack: Vec<NodeId>,
}

impl<'a> DepthFirstIterator<'a> {
    /// Visits `start` and then its descendants.
    pub fn new(scene: &'a Scene, start: NodeId) -> Self {
        let stack = if scene.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self { scene, stack }
    }

    /// Visits the descendants of `start`, excluding `start` itself.
    pub fn descendants(scene: &'a Scene, start: NodeId) -> Self {
        let stack = scene
            .node(start)
            .map(|node| node.children().iter().rev().copied().collect())
            .unwrap_or_default();
        Self { scene, stack }
    }
}

impl Iterator for DepthFirstIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.scene.node(id) {
            self.stack.extend(node.children().iter().rev().copied());
        }
        Some(id)
    }
}

/// Level-order breadth-first traversal.
#[derive(Clone)]
pub struct BreadthFirstIterator<'a> {
    scene: &'a Scene,
    queue: VecDeque<NodeId>,
}

impl<'a> BreadthFirstIterator<'a> {
    /// Visits `start` and then its descendants level by level.
    pub fn new(scene: &'a Scene, start: NodeId) -> Self {
        let mut queue = VecDeque::new();
        if scene.contains(start) {
            queue.push_back(start);
        }
        Self { scene, queue }
    }
}

impl Iterator for BreadthFirstIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        if let Some(node) = self.scene.node(id) {
            self.queue.extend(node.children().iter().copied());
        }
        Some(id)
    }
}
