//! Cycle-safe depth-first traversal.

use std::collections::HashSet;

use tracing::trace;

use crate::descriptor::describe;
use crate::descriptor::describe_line;
use crate::error::HostError;
use crate::lease::Lease;
use crate::platform::NodeHandle;
use crate::platform::NodeId;
use crate::record::NodeRecord;

/// Identities already walked during one capture.
///
/// Shared by every window of the capture, so a node reachable from two
/// windows, or from itself, is described once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<NodeId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` was already present.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One node on the walk stack. The walk root is borrowed from the caller,
/// so only descendants carry a lease.
struct Frame<H: NodeHandle> {
    lease: Option<Lease<H>>,
    record: NodeRecord,
    child_count: usize,
    next_child: usize,
}

pub struct TreeWalker<'a> {
    visited: &'a mut VisitedSet,
}

impl<'a> TreeWalker<'a> {
    pub fn new(visited: &'a mut VisitedSet) -> Self {
        Self { visited }
    }

    /// Describes `node` and everything reachable below it, in child index
    /// order.
    ///
    /// Returns `Ok(None)` when `node` was already visited in this capture.
    /// Children the platform cannot materialize are skipped. Every child
    /// handle is released before this returns, including on error.
    ///
    /// The walk keeps its own stack, so depth is bounded by memory rather
    /// than by the calling thread's stack.
    pub fn walk<H: NodeHandle>(&mut self, node: &H) -> Result<Option<NodeRecord>, HostError> {
        let Some((record, child_count)) = self.enter(node)? else {
            return Ok(None);
        };
        let mut stack = vec![Frame {
            lease: None,
            record,
            child_count,
            next_child: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next_child == frame.child_count {
                let Some(Frame { record, .. }) = stack.pop() else {
                    break;
                };
                match stack.last_mut() {
                    Some(parent) => parent.record.children.push(record),
                    None => return Ok(Some(record)),
                }
                continue;
            }

            let index = frame.next_child;
            frame.next_child += 1;
            let parent = frame.lease.as_deref().unwrap_or(node);
            let Some(child) = parent.child(index)? else {
                trace!(node = %parent.identity(), index, "child unavailable");
                continue;
            };
            let child = Lease::new(child);
            if let Some((record, child_count)) = self.enter(&*child)? {
                stack.push(Frame {
                    lease: Some(child),
                    record,
                    child_count,
                    next_child: 0,
                });
            }
        }

        Ok(None)
    }

    /// Marks `node` visited and describes it. `None` if it was seen before.
    fn enter<H: NodeHandle>(
        &mut self,
        node: &H,
    ) -> Result<Option<(NodeRecord, usize)>, HostError> {
        let id = node.identity();
        if !self.visited.insert(id) {
            trace!(node = %id, "cycle: node already visited");
            return Ok(None);
        }
        trace!(node = %id, "{}", describe_line(node));
        let record = describe(node);
        let child_count = node.child_count()?;
        Ok(Some((record, child_count)))
    }
}
