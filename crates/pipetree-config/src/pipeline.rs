use std::fs;
use std::path::Path;

use pipetree_operator::Value;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A complete pipeline tree definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
  /// Human readable name, used as the default snapshot name.
  pub name: String,
  /// Operator invoked by the root node. Must declare no inputs.
  pub root: String,
  /// Children of the root.
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
}

/// One node and the subtree below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub operator: String,
  /// Fixed arguments appended after the bound inputs.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub args: Vec<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag: Option<String>,
  #[serde(default)]
  pub save_result: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<NodeDef>,
}

impl PipelineDef {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let json = fs::read_to_string(path)?;
    Self::from_json(&json)
  }

  /// Total number of node definitions, root excluded.
  pub fn node_count(&self) -> usize {
    fn count(nodes: &[NodeDef]) -> usize {
      nodes.iter().map(|n| 1 + count(&n.children)).sum()
    }
    count(&self.nodes)
  }
}
