use pipetree_tree::TreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read pipeline definition: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid pipeline definition: {0}")]
  Parse(#[from] serde_json::Error),

  /// A node could not be placed. `path` locates it in the definition,
  /// e.g. `nodes[0].children[2]`.
  #[error("cannot build node at {path}: {source}")]
  Build {
    path: String,
    #[source]
    source: TreeError,
  },
}
