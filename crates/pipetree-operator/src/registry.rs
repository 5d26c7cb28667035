use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::operator::{Operator, Signature};

/// Lookup table from operator name to operator.
///
/// The registry is the single source of each operator's key contract. Trees
/// hold it behind an `Arc` and never mutate it.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
  operators: HashMap<String, Arc<dyn Operator>>,
}

impl OperatorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an operator under its signature name.
  pub fn register(&mut self, operator: impl Operator + 'static) -> Result<(), RegistryError> {
    self.register_arc(Arc::new(operator))
  }

  pub fn register_arc(&mut self, operator: Arc<dyn Operator>) -> Result<(), RegistryError> {
    let name = operator.name().to_string();
    if self.operators.contains_key(&name) {
      return Err(RegistryError::Duplicate { name });
    }
    self.operators.insert(name, operator);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&Arc<dyn Operator>> {
    self.operators.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.operators.contains_key(name)
  }

  /// Keys the operator reads from branch state.
  pub fn input_keys(&self, name: &str) -> Option<&[String]> {
    self.get(name).map(|op| op.signature().inputs.as_slice())
  }

  /// Keys the operator's result populates.
  pub fn output_keys(&self, name: &str) -> Option<&[String]> {
    self.get(name).map(|op| op.signature().outputs.as_slice())
  }

  /// All signatures, sorted by name.
  pub fn signatures(&self) -> Vec<&Signature> {
    let mut signatures: Vec<&Signature> = self.operators.values().map(|op| op.signature()).collect();
    signatures.sort_by(|a, b| a.name.cmp(&b.name));
    signatures
  }

  pub fn len(&self) -> usize {
    self.operators.len()
  }

  pub fn is_empty(&self) -> bool {
    self.operators.is_empty()
  }
}

impl fmt::Debug for OperatorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
    names.sort_unstable();
    f.debug_struct("OperatorRegistry")
      .field("operators", &names)
      .finish()
  }
}
