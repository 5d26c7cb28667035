//! Pipetree Config
//!
//! Serializable pipeline definitions. A [`PipelineDef`] describes a whole
//! transformation tree as nested JSON: the root operator plus a forest of
//! [`NodeDef`]s, each with its own children.
//!
//! Definitions are loaded from JSON files (the CLI's `run` command) and
//! turned into a [`TransformationTree`](pipetree_tree::TransformationTree)
//! by [`build_tree`], which applies the same compatibility rules as adding
//! nodes by hand.

mod build;
mod error;
mod pipeline;

pub use build::build_tree;
pub use error::ConfigError;
pub use pipeline::{NodeDef, PipelineDef};
