//! Structural duplication of subtrees and paths.
//!
//! Copies are planned in full against the current arena before anything is
//! inserted, so a failed lookup never leaves half a copy behind.

use std::collections::HashMap;

use tracing::debug;

use crate::error::TreeError;
use crate::node::{Node, NodeId};
use crate::tree::TransformationTree;

impl TransformationTree {
  /// Deep-copy `subtree` and all of its descendants under the same parent.
  ///
  /// Every non-empty tag in the copy gets `tag_suffix` appended. The copy is
  /// independent of the original: editing one never affects the other.
  /// Returns the id of the copied subtree root.
  pub fn replicate_subtree(&mut self, subtree: NodeId, tag_suffix: &str) -> Result<NodeId, TreeError> {
    let parent = self.node(subtree)?.parent.ok_or(TreeError::RootNode(subtree))?;

    let order = self.descendants(subtree)?;
    let base = self.nodes.len();
    let remap: HashMap<NodeId, NodeId> = order
      .iter()
      .enumerate()
      .map(|(offset, &id)| (id, NodeId(base + offset)))
      .collect();

    let mut copies = Vec::with_capacity(order.len());
    for &id in &order {
      let source = self.node(id)?;
      let mut copy = source.detached();
      copy.append_tag_suffix(tag_suffix);
      copy.parent = match source.parent.and_then(|p| remap.get(&p)) {
        Some(&mapped) => Some(mapped),
        None => Some(parent),
      };
      copy.children = source
        .children
        .iter()
        .filter_map(|child| remap.get(child).copied())
        .collect();
      copies.push(copy);
    }

    let top = self.commit(copies);
    self.node_mut(parent)?.children.push(top);

    debug!(original = %subtree, copy = %top, nodes = order.len(), "subtree replicated");
    Ok(top)
  }

  /// Copy the unbranched chain from `start` down to `end` and attach the copy
  /// under `start`'s parent. Returns the copy of `end`.
  ///
  /// Each copy keeps the operator, arguments, tag and save flag of its source
  /// but none of its other children. Fails with [`TreeError::Ancestry`] when
  /// `start` is not an ancestor of (or equal to) `end`.
  pub fn replicate_path(&mut self, start: NodeId, end: NodeId) -> Result<NodeId, TreeError> {
    let parent = self.node(start)?.parent.ok_or(TreeError::RootNode(start))?;
    self.node(end)?;

    let mut chain = Vec::new();
    for id in self.ancestors(end) {
      chain.push(id);
      if id == start {
        break;
      }
    }
    if chain.last() != Some(&start) {
      return Err(TreeError::Ancestry { start, end });
    }
    chain.reverse();

    let base = self.nodes.len();
    let last = chain.len() - 1;
    let mut copies = Vec::with_capacity(chain.len());
    for (offset, &id) in chain.iter().enumerate() {
      let mut copy = self.node(id)?.detached();
      copy.parent = Some(if offset == 0 {
        parent
      } else {
        NodeId(base + offset - 1)
      });
      if offset < last {
        copy.children.push(NodeId(base + offset + 1));
      }
      copies.push(copy);
    }

    let top = self.commit(copies);
    self.node_mut(parent)?.children.push(top);
    let leaf = NodeId(base + last);

    debug!(start = %start, end = %end, copy = %leaf, length = chain.len(), "path replicated");
    Ok(leaf)
  }

  /// Append planned copies to the arena and return the first id.
  fn commit(&mut self, copies: Vec<Node>) -> NodeId {
    let first = NodeId(self.nodes.len());
    self.nodes.extend(copies.into_iter().map(Some));
    first
  }
}
