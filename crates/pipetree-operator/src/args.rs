//! Positional argument access for operator bodies.

use serde_json::Value;

use crate::error::OperatorError;

/// Borrowed view over the arguments handed to [`Operator::invoke`].
///
/// [`Operator::invoke`]: crate::Operator::invoke
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
  values: &'a [Value],
}

impl<'a> Args<'a> {
  pub fn new(values: &'a [Value]) -> Self {
    Self { values }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Get an argument, treating `null` the same as absent.
  pub fn get(&self, index: usize) -> Option<&'a Value> {
    self.values.get(index).filter(|v| !v.is_null())
  }

  pub fn required(&self, index: usize, name: &'static str) -> Result<&'a Value, OperatorError> {
    self
      .get(index)
      .ok_or(OperatorError::MissingArgument { index, name })
  }

  pub fn f64(&self, index: usize, name: &'static str) -> Result<f64, OperatorError> {
    let value = self.required(index, name)?;
    value
      .as_f64()
      .ok_or_else(|| invalid(index, name, format!("expected a number, got {}", value)))
  }

  pub fn opt_f64(&self, index: usize, name: &'static str) -> Result<Option<f64>, OperatorError> {
    match self.get(index) {
      Some(_) => self.f64(index, name).map(Some),
      None => Ok(None),
    }
  }

  pub fn usize(&self, index: usize, name: &'static str) -> Result<usize, OperatorError> {
    let value = self.required(index, name)?;
    value
      .as_u64()
      .and_then(|n| usize::try_from(n).ok())
      .ok_or_else(|| invalid(index, name, format!("expected a non-negative integer, got {}", value)))
  }

  pub fn opt_usize(&self, index: usize, name: &'static str) -> Result<Option<usize>, OperatorError> {
    match self.get(index) {
      Some(_) => self.usize(index, name).map(Some),
      None => Ok(None),
    }
  }

  pub fn str(&self, index: usize, name: &'static str) -> Result<&'a str, OperatorError> {
    let value = self.required(index, name)?;
    value
      .as_str()
      .ok_or_else(|| invalid(index, name, format!("expected a string, got {}", value)))
  }

  /// A numeric series. `null` elements become `NaN` so missing samples survive
  /// the round trip through JSON.
  pub fn series(&self, index: usize, name: &'static str) -> Result<Vec<f64>, OperatorError> {
    let value = self.required(index, name)?;
    series_from_value(value).map_err(|message| invalid(index, name, message))
  }

  /// A row-major matrix of numbers.
  pub fn matrix(&self, index: usize, name: &'static str) -> Result<Vec<Vec<f64>>, OperatorError> {
    let value = self.required(index, name)?;
    let rows = value
      .as_array()
      .ok_or_else(|| invalid(index, name, "expected an array of rows".to_string()))?;
    rows
      .iter()
      .map(|row| series_from_value(row).map_err(|message| invalid(index, name, message)))
      .collect()
  }
}

fn series_from_value(value: &Value) -> Result<Vec<f64>, String> {
  let items = value
    .as_array()
    .ok_or_else(|| format!("expected an array of numbers, got {}", value))?;
  items
    .iter()
    .map(|item| match item {
      Value::Null => Ok(f64::NAN),
      other => other
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {}", other)),
    })
    .collect()
}

fn invalid(index: usize, name: &'static str, message: String) -> OperatorError {
  OperatorError::InvalidArgument {
    index,
    name,
    message,
  }
}
