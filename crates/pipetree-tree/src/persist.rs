//! Tree snapshots.
//!
//! A snapshot is the JSON encoding of the node arena. Operators are stored by
//! name and resolved against a registry on load, so a snapshot can only be
//! restored where the same operators are registered. Results are not part of
//! a snapshot.
//!
//! A pipeline snapshot bundles a tree snapshot with the end node of a
//! [`Pipeline`], so the path can be re-run after a restart.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pipetree_operator::OperatorRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::node::{Node, NodeId};
use crate::pipeline::Pipeline;
use crate::tree::TransformationTree;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
  version: u32,
  root: NodeId,
  nodes: Vec<Option<Node>>,
}

#[derive(Serialize, Deserialize)]
struct PipelineSnapshot {
  tree: Snapshot,
  end: NodeId,
}

impl TransformationTree {
  /// Encode the tree structure as a snapshot string.
  pub fn to_snapshot(&self) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&self.snapshot())?)
  }

  /// Rebuild a tree from a snapshot, resolving operators in `registry`.
  pub fn from_snapshot(
    snapshot: &str,
    registry: impl Into<Arc<OperatorRegistry>>,
  ) -> Result<Self, PersistenceError> {
    Self::restore(serde_json::from_str(snapshot)?, registry.into())
  }

  fn snapshot(&self) -> Snapshot {
    Snapshot {
      version: SNAPSHOT_VERSION,
      root: self.root,
      nodes: self.nodes.clone(),
    }
  }

  fn restore(snapshot: Snapshot, registry: Arc<OperatorRegistry>) -> Result<Self, PersistenceError> {
    if snapshot.version != SNAPSHOT_VERSION {
      return Err(PersistenceError::UnsupportedVersion {
        found: snapshot.version,
        expected: SNAPSHOT_VERSION,
      });
    }

    let tree = Self {
      nodes: snapshot.nodes,
      root: snapshot.root,
      registry,
      results: Vec::new(),
    };
    tree.validate()?;
    Ok(tree)
  }

  /// Check that the arena forms a single tree of registered operators.
  fn validate(&self) -> Result<(), PersistenceError> {
    let root = self.node(self.root).map_err(|_| corrupt("root node missing"))?;
    if root.parent.is_some() {
      return Err(corrupt("root node has a parent"));
    }

    for (index, slot) in self.nodes.iter().enumerate() {
      let Some(node) = slot else { continue };
      let id = NodeId(index);

      if !self.registry.contains(node.operator()) {
        return Err(PersistenceError::UnknownOperator(node.operator().to_string()));
      }
      if let Some(parent) = node.parent {
        let listed = self
          .node(parent)
          .is_ok_and(|p| p.children.contains(&id));
        if !listed {
          return Err(corrupt(format!("node {} is not listed by its parent {}", id, parent)));
        }
      } else if id != self.root {
        return Err(corrupt(format!("node {} has no parent", id)));
      }
      for &child in &node.children {
        let linked = self.node(child).is_ok_and(|c| c.parent == Some(id));
        if !linked {
          return Err(corrupt(format!("child {} of node {} does not link back", child, id)));
        }
      }
    }

    // Every live node must be reachable exactly once from the root.
    let mut seen = HashSet::new();
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      if !seen.insert(id) {
        return Err(corrupt(format!("node {} is reachable more than once", id)));
      }
      if let Ok(node) = self.node(id) {
        stack.extend(node.children.iter().copied());
      }
    }
    if seen.len() != self.len() {
      return Err(corrupt("tree contains unreachable nodes"));
    }

    Ok(())
  }
}

impl Pipeline {
  /// Encode this pipeline together with the tree it runs on.
  pub fn to_snapshot(&self, tree: &TransformationTree) -> Result<String, PersistenceError> {
    if !tree.contains(self.end()) {
      return Err(corrupt(format!("pipeline end {} is not in the tree", self.end())));
    }
    let snapshot = PipelineSnapshot {
      tree: tree.snapshot(),
      end: self.end(),
    };
    Ok(serde_json::to_string(&snapshot)?)
  }

  /// Rebuild a tree and the pipeline ending in it from a pipeline snapshot.
  pub fn from_snapshot(
    snapshot: &str,
    registry: impl Into<Arc<OperatorRegistry>>,
  ) -> Result<(TransformationTree, Pipeline), PersistenceError> {
    let snapshot: PipelineSnapshot = serde_json::from_str(snapshot)?;
    let tree = TransformationTree::restore(snapshot.tree, registry.into())?;
    let pipeline = tree
      .export_pipeline(snapshot.end)
      .map_err(|_| corrupt(format!("pipeline end {} is not in the tree", snapshot.end)))?;
    Ok((tree, pipeline))
  }
}

fn corrupt(message: impl Into<String>) -> PersistenceError {
  PersistenceError::Corrupt {
    message: message.into(),
  }
}

/// Write a snapshot of `tree` to `path`.
///
/// Failures are reported, never raised: callers must check the result.
pub fn save(tree: &TransformationTree, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
  let path = path.as_ref();
  let outcome = tree
    .to_snapshot()
    .and_then(|snapshot| fs::write(path, snapshot).map_err(PersistenceError::from));

  match &outcome {
    Ok(()) => debug!(path = %path.display(), nodes = tree.len(), "tree saved"),
    Err(e) => warn!(path = %path.display(), error = %e, "failed to save tree"),
  }
  outcome
}

/// Read a snapshot from `path` and rebuild the tree against `registry`.
pub fn load(
  path: impl AsRef<Path>,
  registry: impl Into<Arc<OperatorRegistry>>,
) -> Result<TransformationTree, PersistenceError> {
  let path = path.as_ref();
  let outcome = fs::read_to_string(path)
    .map_err(PersistenceError::from)
    .and_then(|snapshot| TransformationTree::from_snapshot(&snapshot, registry));

  match &outcome {
    Ok(tree) => debug!(path = %path.display(), nodes = tree.len(), "tree loaded"),
    Err(e) => warn!(path = %path.display(), error = %e, "failed to load tree"),
  }
  outcome
}

/// Write `pipeline` and the tree it runs on to `path`.
pub fn save_pipeline(
  tree: &TransformationTree,
  pipeline: &Pipeline,
  path: impl AsRef<Path>,
) -> Result<(), PersistenceError> {
  let path = path.as_ref();
  let outcome = pipeline
    .to_snapshot(tree)
    .and_then(|snapshot| fs::write(path, snapshot).map_err(PersistenceError::from));

  match &outcome {
    Ok(()) => debug!(path = %path.display(), end = %pipeline.end(), "pipeline saved"),
    Err(e) => warn!(path = %path.display(), error = %e, "failed to save pipeline"),
  }
  outcome
}

/// Read a pipeline snapshot from `path`, returning the rebuilt tree and the
/// pipeline that ends in it.
pub fn load_pipeline(
  path: impl AsRef<Path>,
  registry: impl Into<Arc<OperatorRegistry>>,
) -> Result<(TransformationTree, Pipeline), PersistenceError> {
  let path = path.as_ref();
  let outcome = fs::read_to_string(path)
    .map_err(PersistenceError::from)
    .and_then(|snapshot| Pipeline::from_snapshot(&snapshot, registry));

  match &outcome {
    Ok((tree, pipeline)) => debug!(path = %path.display(), nodes = tree.len(), end = %pipeline.end(), "pipeline loaded"),
    Err(e) => warn!(path = %path.display(), error = %e, "failed to load pipeline"),
  }
  outcome
}
