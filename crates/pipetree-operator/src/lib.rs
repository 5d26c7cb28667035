//! Pipetree Operator
//!
//! This crate defines the narrow interface through which the transformation
//! tree consumes computation. An operator is an opaque unit of work that
//! declares a static key contract:
//! - the ordered keys it reads from branch state (bound positionally)
//! - the ordered keys its result populates
//!
//! The engine never inspects operator internals, only the [`Signature`] and
//! the [`Operator::invoke`] call. Embedding applications collect their
//! operators in an [`OperatorRegistry`] which is handed to a tree at
//! construction.

mod args;
mod error;
mod operator;
mod registry;

pub use args::Args;
pub use error::{OperatorError, RegistryError};
pub use operator::{FnOperator, Operator, OperatorKind, Output, Signature};
pub use registry::OperatorRegistry;

/// Values that flow between operators.
pub use serde_json::Value;
