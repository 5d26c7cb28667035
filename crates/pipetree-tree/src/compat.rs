//! Static data-flow compatibility between an operator and a branch.

use std::collections::{BTreeSet, HashSet};

use pipetree_operator::Operator;

use crate::error::{CompatibilityError, TreeError};
use crate::node::NodeId;
use crate::tree::TransformationTree;

impl TransformationTree {
  /// Keys produced on the branch from the root down to `node`, inclusive.
  pub fn available_keys(&self, node: NodeId) -> Result<BTreeSet<String>, TreeError> {
    Ok(
      self
        .branch_keys(node)?
        .into_iter()
        .map(str::to_string)
        .collect(),
    )
  }

  /// Check that every input of `operator` is produced by `parent` or one of
  /// its ancestors. Nothing is mutated.
  pub fn check_compatibility(&self, parent: NodeId, operator: &str) -> Result<(), TreeError> {
    let candidate = self.operator(operator)?;
    let available = self.branch_keys(parent)?;
    Self::ensure_satisfied(candidate.as_ref(), &available)?;
    Ok(())
  }

  pub(crate) fn branch_keys(&self, node: NodeId) -> Result<HashSet<&str>, TreeError> {
    self.node(node)?;
    let mut keys = HashSet::new();
    for id in self.ancestors(node) {
      let operator = self.operator(self.node(id)?.operator())?;
      keys.extend(operator.signature().outputs.iter().map(String::as_str));
    }
    Ok(keys)
  }

  pub(crate) fn ensure_satisfied(
    operator: &dyn Operator,
    available: &HashSet<&str>,
  ) -> Result<(), CompatibilityError> {
    let missing: Vec<String> = operator
      .signature()
      .inputs
      .iter()
      .filter(|key| !available.contains(key.as_str()))
      .cloned()
      .collect();

    if missing.is_empty() {
      Ok(())
    } else {
      Err(CompatibilityError {
        operator: operator.name().to_string(),
        missing,
      })
    }
  }
}
