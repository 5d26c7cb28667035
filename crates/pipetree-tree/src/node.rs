use std::fmt;

use pipetree_operator::{Operator, OperatorError, Output, Value};
use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`TransformationTree`].
///
/// Handles are arena indices. They stay valid for the lifetime of the node
/// and are never reused by the same tree.
///
/// [`TransformationTree`]: crate::TransformationTree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Description of a node to place in the tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSpec {
  pub operator: String,
  /// Literal values appended after the bound inputs on every call.
  pub args: Vec<Value>,
  pub tag: Option<String>,
  /// Record this node's output in the tree's results.
  pub save_result: bool,
}

impl NodeSpec {
  pub fn new(operator: impl Into<String>) -> Self {
    Self {
      operator: operator.into(),
      ..Self::default()
    }
  }

  pub fn args<I>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = Value>,
  {
    self.args = args.into_iter().collect();
    self
  }

  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = Some(tag.into());
    self
  }

  pub fn save_result(mut self, save: bool) -> Self {
    self.save_result = save;
    self
  }
}

/// One placement of an operator inside the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  operator: String,
  #[serde(default)]
  args: Vec<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  tag: Option<String>,
  #[serde(default)]
  save_result: bool,
  #[serde(default)]
  pub(crate) parent: Option<NodeId>,
  #[serde(default)]
  pub(crate) children: Vec<NodeId>,
}

impl Node {
  pub(crate) fn from_spec(spec: NodeSpec, parent: Option<NodeId>) -> Self {
    Self {
      operator: spec.operator,
      args: spec.args,
      tag: spec.tag.filter(|t| !t.is_empty()),
      save_result: spec.save_result,
      parent,
      children: Vec::new(),
    }
  }

  /// Copy of the payload with no structural links.
  pub(crate) fn detached(&self) -> Self {
    Self {
      operator: self.operator.clone(),
      args: self.args.clone(),
      tag: self.tag.clone(),
      save_result: self.save_result,
      parent: None,
      children: Vec::new(),
    }
  }

  pub(crate) fn append_tag_suffix(&mut self, suffix: &str) {
    if let Some(tag) = self.tag.as_mut() {
      tag.push_str(suffix);
    }
  }

  /// Name of the operator this node invokes.
  pub fn operator(&self) -> &str {
    &self.operator
  }

  pub fn args(&self) -> &[Value] {
    &self.args
  }

  pub fn args_mut(&mut self) -> &mut Vec<Value> {
    &mut self.args
  }

  pub fn tag(&self) -> Option<&str> {
    self.tag.as_deref()
  }

  pub fn set_tag(&mut self, tag: Option<String>) {
    self.tag = tag.filter(|t| !t.is_empty());
  }

  pub fn save_result(&self) -> bool {
    self.save_result
  }

  pub fn set_save_result(&mut self, save: bool) {
    self.save_result = save;
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  pub fn children(&self) -> &[NodeId] {
    &self.children
  }

  /// Invoke `operator` with the bound inputs followed by this node's fixed
  /// arguments. Operator errors are returned unchanged.
  pub fn apply(&self, operator: &dyn Operator, bound_inputs: Vec<Value>) -> Result<Output, OperatorError> {
    let mut call_args = bound_inputs;
    call_args.extend(self.args.iter().cloned());
    operator.invoke(call_args)
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.tag {
      Some(tag) => write!(f, "{}:{}", self.operator, tag),
      None => f.write_str(&self.operator),
    }
  }
}
