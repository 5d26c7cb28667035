use std::sync::Arc;

use pipetree_operator::OperatorRegistry;
use pipetree_tree::{NodeId, NodeSpec, TransformationTree, TreeError};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::pipeline::{NodeDef, PipelineDef};

/// Build a tree from `def`, adding nodes depth-first in definition order.
///
/// Every node goes through [`TransformationTree::add_operator`], so an
/// operator whose inputs are not produced upstream fails the build with
/// [`ConfigError::Build`] pointing at the offending definition.
pub fn build_tree(
  def: &PipelineDef,
  registry: impl Into<Arc<OperatorRegistry>>,
) -> Result<TransformationTree, ConfigError> {
  let mut tree = TransformationTree::new(registry, &def.root).map_err(|source| ConfigError::Build {
    path: "root".to_string(),
    source,
  })?;

  let root = tree.root();
  for (index, node) in def.nodes.iter().enumerate() {
    add_subtree(&mut tree, root, node, format!("nodes[{index}]"))?;
  }

  info!(pipeline = %def.name, nodes = tree.len(), "pipeline built");
  Ok(tree)
}

fn add_subtree(
  tree: &mut TransformationTree,
  parent: NodeId,
  def: &NodeDef,
  path: String,
) -> Result<(), ConfigError> {
  let id = tree
    .add_operator(parent, spec(def))
    .map_err(|source: TreeError| ConfigError::Build {
      path: path.clone(),
      source,
    })?;
  debug!(node = %id, path = %path, "node built");

  for (index, child) in def.children.iter().enumerate() {
    add_subtree(tree, id, child, format!("{path}.children[{index}]"))?;
  }
  Ok(())
}

fn spec(def: &NodeDef) -> NodeSpec {
  let mut spec = NodeSpec::new(def.operator.clone())
    .args(def.args.iter().cloned())
    .save_result(def.save_result);
  if let Some(tag) = &def.tag {
    spec = spec.tag(tag.clone());
  }
  spec
}
