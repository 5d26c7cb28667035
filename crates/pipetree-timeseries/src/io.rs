//! Reading and writing series as CSV.

use std::fs;
use std::path::Path;

use pipetree_operator::{Args, OperatorError, OperatorKind, OperatorRegistry, Output, RegistryError, Signature, Value};
use serde_json::json;
use tracing::debug;

use crate::series::{define, to_value};

/// Which CSV column holds the samples.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Column<'a> {
  Name(&'a str),
  Index(usize),
  Last,
}

impl<'a> Column<'a> {
  fn from_arg(args: &Args<'a>, index: usize) -> Result<Self, OperatorError> {
    match args.get(index) {
      None => Ok(Self::Last),
      Some(Value::String(_)) => args.str(index, "column").map(Self::Name),
      Some(_) => args.usize(index, "column").map(Self::Index),
    }
  }
}

pub(crate) fn register(registry: &mut OperatorRegistry) -> Result<(), RegistryError> {
  define(
    registry,
    Signature::new("time_series", OperatorKind::Source).outputs(["series_source"]),
    |_| Ok(Output::Single(json!({ "source": "time_series" }))),
  )?;

  // args: source, path, column?
  define(
    registry,
    Signature::new("read_csv", OperatorKind::Source)
      .inputs(["series_source"])
      .outputs(["series"]),
    |values| {
      let args = Args::new(&values);
      let path = args.str(1, "path")?;
      let column = Column::from_arg(&args, 2)?;
      let series = read_csv(path, &column)?;
      debug!(path, samples = series.len(), "series read");
      Ok(Output::Single(to_value(&series)))
    },
  )?;

  // args: series, path
  define(
    registry,
    Signature::new("write_csv", OperatorKind::Sink).inputs(["series"]),
    |values| {
      let args = Args::new(&values);
      let series = args.series(0, "series")?;
      let path = args.str(1, "path")?;
      write_csv(path, &series)?;
      debug!(path, samples = series.len(), "series written");
      Ok(Output::None)
    },
  )
}

/// Read one column of a headed CSV file. Empty or non-numeric cells are
/// missing samples; rows too short to reach the column are too.
pub(crate) fn read_csv(path: impl AsRef<Path>, column: &Column<'_>) -> Result<Vec<f64>, OperatorError> {
  let text = fs::read_to_string(path)?;
  parse_csv(&text, column)
}

pub(crate) fn parse_csv(text: &str, column: &Column<'_>) -> Result<Vec<f64>, OperatorError> {
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(text.as_bytes());

  let header = reader.headers().map_err(csv_error)?;
  if header.is_empty() {
    return Err(OperatorError::failed("csv file is empty"));
  }
  let index = match column {
    Column::Name(name) => header
      .iter()
      .position(|h| h == *name)
      .ok_or_else(|| OperatorError::failed(format!("csv has no column named '{name}'")))?,
    Column::Index(index) if *index < header.len() => *index,
    Column::Index(index) => {
      return Err(OperatorError::failed(format!(
        "csv has {} columns, column {index} requested",
        header.len()
      )));
    }
    Column::Last => header.len() - 1,
  };

  reader
    .records()
    .map(|record| {
      let record = record.map_err(csv_error)?;
      Ok(
        record
          .get(index)
          .and_then(|cell| cell.parse::<f64>().ok())
          .unwrap_or(f64::NAN),
      )
    })
    .collect()
}

/// Write `series` as a single `value` column. Missing samples become empty
/// cells.
pub(crate) fn write_csv(path: impl AsRef<Path>, series: &[f64]) -> Result<(), OperatorError> {
  let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
  writer.write_record(["value"]).map_err(csv_error)?;
  for value in series {
    let cell = if value.is_nan() { String::new() } else { value.to_string() };
    writer.write_record([cell]).map_err(csv_error)?;
  }
  writer.flush()?;
  Ok(())
}

fn csv_error(err: csv::Error) -> OperatorError {
  let message = err.to_string();
  match err.into_kind() {
    csv::ErrorKind::Io(e) => OperatorError::Io(e),
    _ => OperatorError::failed(format!("invalid csv: {message}")),
  }
}
