use pipetree_operator::Output;
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, TreeError};
use crate::node::NodeId;
use crate::tree::TransformationTree;

/// A single root-to-leaf path exported from a tree.
///
/// Running a pipeline executes only its path and keeps a copy of the results.
/// A pipeline names its end node only, so it must be run against the tree it
/// was exported from. Use [`save_pipeline`](crate::save_pipeline) to persist
/// the two together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
  end: NodeId,
  #[serde(default)]
  results: Vec<(Output, NodeId)>,
}

impl Pipeline {
  pub fn end(&self) -> NodeId {
    self.end
  }

  /// Results of the last [`run`](Self::run).
  pub fn results(&self) -> &[(Output, NodeId)] {
    &self.results
  }

  pub fn run(&mut self, tree: &mut TransformationTree) -> Result<&[(Output, NodeId)], ExecutionError> {
    self.results = tree.execute_path(self.end)?.to_vec();
    Ok(&self.results)
  }
}

impl TransformationTree {
  /// Export the path ending at `end` as a re-runnable pipeline.
  pub fn export_pipeline(&self, end: NodeId) -> Result<Pipeline, TreeError> {
    self.node(end)?;
    Ok(Pipeline {
      end,
      results: Vec::new(),
    })
  }
}
