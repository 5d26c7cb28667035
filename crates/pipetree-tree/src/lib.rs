//! Pipetree Tree
//!
//! This crate provides the [`TransformationTree`]: a tree of operator nodes
//! used to build and compare many variants of a data-processing pipeline.
//!
//! - Nodes are added through [`TransformationTree::add_operator`], which
//!   rejects operators whose inputs are not produced upstream
//! - Subtrees and paths can be replicated and operators replaced in place
//! - Execution walks the tree breadth-first with an isolated key -> value
//!   state per branch, collecting the outputs of flagged nodes
//! - Trees round-trip through JSON snapshots via [`save`] and [`load`];
//!   [`save_pipeline`] and [`load_pipeline`] keep a [`Pipeline`] with its tree

mod compat;
mod error;
mod execute;
mod node;
mod persist;
mod pipeline;
mod replicate;
mod tree;

pub use error::{CompatibilityError, ExecutionError, PersistenceError, TreeError};
pub use execute::BranchState;
pub use node::{Node, NodeId, NodeSpec};
pub use persist::{load, load_pipeline, save, save_pipeline};
pub use pipeline::Pipeline;
pub use tree::{Ancestors, PATH_SEPARATOR, ROOT_TAG, TransformationTree};
