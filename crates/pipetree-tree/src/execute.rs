//! Breadth-first execution of a tree.
//!
//! Every branch carries its own key -> value state. A node runs only when all
//! of its input keys are present in that state; otherwise it and its subtree
//! are skipped without error. Operator failures abort the whole call.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use pipetree_operator::{Output, Value};
use tracing::{debug, error, info, instrument};

use crate::error::ExecutionError;
use crate::node::NodeId;
use crate::tree::TransformationTree;

/// Values accumulated along one branch.
pub type BranchState = HashMap<String, Value>;

impl TransformationTree {
  /// Execute every branch of the tree.
  ///
  /// Returns the outputs of all reached nodes flagged with `save_result`.
  /// The same list stays available through [`results`](Self::results).
  #[instrument(name = "execute_tree", skip(self), fields(nodes = self.len()))]
  pub fn execute_tree(&mut self) -> Result<&[(Output, NodeId)], ExecutionError> {
    self.run(None)
  }

  /// Execute only the chain from the root down to `end`.
  #[instrument(name = "execute_path", skip(self))]
  pub fn execute_path(&mut self, end: NodeId) -> Result<&[(Output, NodeId)], ExecutionError> {
    let path: HashSet<NodeId> = self.path_to(end)?.into_iter().collect();
    self.run(Some(&path))
  }

  fn run(&mut self, path: Option<&HashSet<NodeId>>) -> Result<&[(Output, NodeId)], ExecutionError> {
    let mut results = Vec::new();
    let outcome = self.traverse(path, &mut results);
    self.results = results;

    match outcome {
      Ok(stats) => {
        info!(
          invoked = stats.invoked,
          pruned = stats.pruned,
          results = self.results.len(),
          "execution completed"
        );
        Ok(&self.results)
      }
      Err(err) => {
        error!(error = %err, results = self.results.len(), "execution aborted");
        Err(err)
      }
    }
  }

  fn traverse(
    &self,
    path: Option<&HashSet<NodeId>>,
    results: &mut Vec<(Output, NodeId)>,
  ) -> Result<TraversalStats, ExecutionError> {
    let mut stats = TraversalStats::default();
    let mut queue: VecDeque<(NodeId, Rc<BranchState>)> = VecDeque::new();
    queue.push_back((self.root, Rc::default()));

    while let Some((id, mut state)) = queue.pop_front() {
      let node = self.node(id)?;
      let operator = self.operator(node.operator())?;
      let signature = operator.signature();

      let Some(bound) = bind_inputs(&signature.inputs, &state) else {
        debug!(node = %id, operator = %node.operator(), "inputs not produced upstream, skipping branch");
        stats.pruned += 1;
        continue;
      };

      stats.invoked += 1;
      let output = node
        .apply(operator.as_ref(), bound)
        .map_err(|source| ExecutionError::Operator {
          node: id,
          operator: node.operator().to_string(),
          source,
        })?;

      if node.save_result() {
        results.push((output.clone(), id));
      }

      if output.arity() != signature.outputs.len() {
        debug!(
          node = %id,
          operator = %node.operator(),
          expected = signature.outputs.len(),
          actual = output.arity(),
          "output arity mismatch, branch stops"
        );
        continue;
      }

      if !signature.outputs.is_empty() {
        let branch = Rc::make_mut(&mut state);
        for (key, value) in signature.outputs.iter().zip(output.into_values()) {
          branch.insert(key.clone(), value);
        }
      }

      for &child in node.children() {
        if path.is_none_or(|p| p.contains(&child)) {
          queue.push_back((child, Rc::clone(&state)));
        }
      }
    }

    Ok(stats)
  }
}

#[derive(Debug, Default)]
struct TraversalStats {
  invoked: usize,
  pruned: usize,
}

/// Look up `keys` in order. `None` if any key is absent.
fn bind_inputs(keys: &[String], state: &BranchState) -> Option<Vec<Value>> {
  keys.iter().map(|key| state.get(key).cloned()).collect()
}
