//! The transformation tree and its editing operations.

use std::collections::VecDeque;
use std::sync::Arc;

use pipetree_operator::{Operator, OperatorRegistry, Output};
use tracing::{debug, warn};

use crate::error::TreeError;
use crate::node::{Node, NodeId, NodeSpec};

/// Separator between nodes in [`TransformationTree::get_path_str`].
pub const PATH_SEPARATOR: &str = " -> ";

/// Tag given to the root node.
pub const ROOT_TAG: &str = "root";

/// A tree of operator nodes.
///
/// Nodes live in an arena owned by the tree and refer to each other by
/// [`NodeId`]. Each node has exactly one parent (the root has none), so the
/// structure stays a tree under every mutation.
#[derive(Debug, Clone)]
pub struct TransformationTree {
  pub(crate) nodes: Vec<Option<Node>>,
  pub(crate) root: NodeId,
  pub(crate) registry: Arc<OperatorRegistry>,
  pub(crate) results: Vec<(Output, NodeId)>,
}

impl TransformationTree {
  /// Create a tree whose root invokes `root_operator`.
  ///
  /// The root operator must be registered and must not declare inputs.
  pub fn new(
    registry: impl Into<Arc<OperatorRegistry>>,
    root_operator: &str,
  ) -> Result<Self, TreeError> {
    let registry = registry.into();
    let operator = registry
      .get(root_operator)
      .ok_or_else(|| TreeError::UnknownOperator(root_operator.to_string()))?;
    if !operator.signature().inputs.is_empty() {
      return Err(TreeError::InvalidRoot {
        operator: root_operator.to_string(),
      });
    }

    let root = Node::from_spec(NodeSpec::new(root_operator).tag(ROOT_TAG), None);
    Ok(Self {
      nodes: vec![Some(root)],
      root: NodeId(0),
      registry,
      results: Vec::new(),
    })
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  pub fn registry(&self) -> &Arc<OperatorRegistry> {
    &self.registry
  }

  /// Results captured by the most recent execution.
  pub fn results(&self) -> &[(Output, NodeId)] {
    &self.results
  }

  /// Number of live nodes, root included.
  pub fn len(&self) -> usize {
    self.nodes.iter().filter(|slot| slot.is_some()).count()
  }

  /// A tree always holds at least its root.
  pub fn is_empty(&self) -> bool {
    false
  }

  pub fn contains(&self, id: NodeId) -> bool {
    matches!(self.nodes.get(id.0), Some(Some(_)))
  }

  pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
    self
      .nodes
      .get(id.0)
      .and_then(Option::as_ref)
      .ok_or(TreeError::NodeNotFound(id))
  }

  /// Mutable access to a node's payload (arguments, tag, save flag).
  /// Structural links can only change through the tree's own operations.
  pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
    self
      .nodes
      .get_mut(id.0)
      .and_then(Option::as_mut)
      .ok_or(TreeError::NodeNotFound(id))
  }

  pub(crate) fn operator(&self, name: &str) -> Result<&Arc<dyn Operator>, TreeError> {
    self
      .registry
      .get(name)
      .ok_or_else(|| TreeError::UnknownOperator(name.to_string()))
  }

  pub(crate) fn insert(&mut self, node: Node) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(Some(node));
    id
  }

  /// Append a node for `spec` under `parent`.
  ///
  /// Fails with [`TreeError::Compatibility`] when the operator's inputs are
  /// not produced on the branch ending at `parent`; the tree is unchanged.
  pub fn add_operator(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId, TreeError> {
    self.check_compatibility(parent, &spec.operator)?;

    let id = self.insert(Node::from_spec(spec, Some(parent)));
    self.node_mut(parent)?.children.push(id);

    debug!(node = %id, parent = %parent, operator = %self.node(id)?.operator(), "operator added");
    Ok(id)
  }

  /// Swap the operator at `target` for a new node built from `spec`.
  ///
  /// The new node must be compatible with `target`'s parent, and every
  /// immediate child of `target` must be compatible with the new node. Only
  /// then does the new node take `target`'s place and adopt its children.
  /// Otherwise nothing changes and the first incompatibility is returned.
  pub fn replace_operator(&mut self, target: NodeId, spec: NodeSpec) -> Result<NodeId, TreeError> {
    let parent = self.node(target)?.parent.ok_or(TreeError::RootNode(target))?;
    self.check_compatibility(parent, &spec.operator)?;

    {
      let replacement = self.operator(&spec.operator)?;
      let mut available = self.branch_keys(parent)?;
      available.extend(replacement.signature().outputs.iter().map(String::as_str));

      for &child in self.node(target)?.children() {
        let child_operator = self.operator(self.node(child)?.operator())?;
        if let Err(err) = Self::ensure_satisfied(child_operator.as_ref(), &available) {
          warn!(
            target = %target,
            child = %child,
            operator = %spec.operator,
            error = %err,
            "replacement rejected by child"
          );
          return Err(err.into());
        }
      }
    }

    let children = std::mem::take(&mut self.node_mut(target)?.children);
    let mut node = Node::from_spec(spec, Some(parent));
    node.children = children;
    let id = self.insert(node);

    let adopted = self.node(id)?.children.clone();
    for child in adopted {
      self.node_mut(child)?.parent = Some(id);
    }

    let siblings = &mut self.node_mut(parent)?.children;
    if let Some(slot) = siblings.iter_mut().find(|c| **c == target) {
      *slot = id;
    }
    if let Some(slot) = self.nodes.get_mut(target.0) {
      *slot = None;
    }

    debug!(old = %target, new = %id, "operator replaced");
    Ok(id)
  }

  /// Node ids in breadth-first order starting at `start`.
  pub fn descendants(&self, start: NodeId) -> Result<Vec<NodeId>, TreeError> {
    let mut order = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
      queue.extend(self.node(id)?.children.iter().copied());
      order.push(id);
    }
    Ok(order)
  }

  fn find_nodes(&self, matches: impl Fn(&Node) -> bool) -> Vec<NodeId> {
    self
      .descendants(self.root)
      .unwrap_or_default()
      .into_iter()
      .filter(|&id| self.node(id).is_ok_and(&matches))
      .collect()
  }

  /// All nodes carrying `tag`, in breadth-first order.
  pub fn get_nodes_by_tag(&self, tag: &str) -> Vec<NodeId> {
    self.find_nodes(|node| node.tag() == Some(tag))
  }

  /// All nodes invoking `operator`, in breadth-first order.
  pub fn get_nodes_by_operator(&self, operator: &str) -> Vec<NodeId> {
    self.find_nodes(|node| node.operator() == operator)
  }

  /// Ids of `node` and its ancestors, nearest first.
  pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
    Ancestors {
      tree: self,
      next: Some(node),
    }
  }

  /// Ids from the root down to `end`.
  pub fn path_to(&self, end: NodeId) -> Result<Vec<NodeId>, TreeError> {
    self.node(end)?;
    let mut path: Vec<NodeId> = self.ancestors(end).collect();
    path.reverse();
    Ok(path)
  }

  /// Render the chain from the root to `end` as `op[:tag] -> op[:tag] ...`.
  pub fn get_path_str(&self, end: NodeId) -> Result<String, TreeError> {
    let tokens = self
      .path_to(end)?
      .into_iter()
      .map(|id| self.node(id).map(ToString::to_string))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(tokens.join(PATH_SEPARATOR))
  }

  /// Nodes without children, in breadth-first order.
  pub fn leaves(&self) -> Vec<NodeId> {
    self.find_nodes(|node| node.children.is_empty())
  }
}

/// Iterator over a node and its ancestors. See [`TransformationTree::ancestors`].
pub struct Ancestors<'a> {
  tree: &'a TransformationTree,
  next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let current = self.next?;
    self.next = self.tree.node(current).ok()?.parent;
    Some(current)
  }
}
