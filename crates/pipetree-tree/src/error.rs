//! Error types for tree editing, execution and persistence.

use pipetree_operator::OperatorError;
use thiserror::Error;

use crate::node::NodeId;

/// An operator's declared inputs are not produced by its ancestor chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("operator '{operator}' requires keys not produced upstream: {}", missing.join(", "))]
pub struct CompatibilityError {
  pub operator: String,
  /// Unsatisfied input keys, in declared order.
  pub missing: Vec<String>,
}

/// Errors raised by tree mutation and lookup operations.
///
/// Every operation that returns one of these leaves the tree unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
  #[error(transparent)]
  Compatibility(#[from] CompatibilityError),

  /// The operator is not in the tree's registry.
  #[error("operator not registered: {0}")]
  UnknownOperator(String),

  /// The handle does not refer to a live node of this tree.
  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  /// The operation needs a parent, and the node is the root.
  #[error("node {0} is the root and has no parent")]
  RootNode(NodeId),

  /// `start` is not on the ancestor chain of `end`.
  #[error("node {start} is not an ancestor of node {end}")]
  Ancestry { start: NodeId, end: NodeId },

  /// The root operator must be runnable from an empty branch state.
  #[error("root operator '{operator}' must not declare inputs")]
  InvalidRoot { operator: String },
}

/// Errors that abort an execution call.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// An operator failed. Execution stops at the first failure.
  #[error("operator '{operator}' failed at node {node}: {source}")]
  Operator {
    node: NodeId,
    operator: String,
    #[source]
    source: OperatorError,
  },

  #[error(transparent)]
  Tree(#[from] TreeError),
}

/// Errors from saving or loading a tree snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("snapshot io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("snapshot encoding error: {0}")]
  Serialize(#[from] serde_json::Error),

  /// A node refers to an operator the supplied registry cannot resolve.
  #[error("snapshot references unregistered operator: {0}")]
  UnknownOperator(String),

  #[error("unsupported snapshot version {found} (expected {expected})")]
  UnsupportedVersion { found: u32, expected: u32 },

  /// The node graph is not a well-formed tree.
  #[error("corrupt snapshot: {message}")]
  Corrupt { message: String },
}
