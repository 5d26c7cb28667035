//! Series transformations and the design-matrix builder.

use pipetree_operator::{Args, OperatorError, OperatorKind, OperatorRegistry, Output, RegistryError, Signature};

use crate::series::{define, has_missing, matrix_to_value, mean, to_value};

const DEFAULT_DENOISE_WINDOW: usize = 5;

/// Quantiles bounding the samples kept by [`impute_outliers`].
const OUTLIER_LOW: f64 = 0.01;
const OUTLIER_HIGH: f64 = 0.99;

fn series_step(name: &str) -> Signature {
  Signature::new(name, OperatorKind::Preprocess)
    .inputs(["series"])
    .outputs(["series"])
}

/// Register a `series -> series` operator that takes no extra arguments.
fn define_map(
  registry: &mut OperatorRegistry,
  name: &str,
  transform: fn(&[f64]) -> Result<Vec<f64>, OperatorError>,
) -> Result<(), RegistryError> {
  define(registry, series_step(name), move |values| {
    let series = Args::new(&values).series(0, "series")?;
    Ok(Output::Single(to_value(&transform(&series)?)))
  })
}

pub(crate) fn register(registry: &mut OperatorRegistry) -> Result<(), RegistryError> {
  define(registry, series_step("clip"), |values| {
    let args = Args::new(&values);
    let series = args.series(0, "series")?;
    let clipped = clip(&series, args.usize(1, "start")?, args.usize(2, "end")?)?;
    Ok(Output::Single(to_value(&clipped)))
  })?;

  define(registry, series_step("denoise"), |values| {
    let args = Args::new(&values);
    let series = args.series(0, "series")?;
    let window = args.opt_usize(1, "window")?.unwrap_or(DEFAULT_DENOISE_WINDOW);
    Ok(Output::Single(to_value(&denoise(&series, window)?)))
  })?;

  define(registry, series_step("scale"), |values| {
    let args = Args::new(&values);
    let series = args.series(0, "series")?;
    let min = args.opt_f64(1, "min")?.unwrap_or(0.0);
    let max = args.opt_f64(2, "max")?.unwrap_or(1.0);
    Ok(Output::Single(to_value(&scale(&series, min, max))))
  })?;

  define_map(registry, "impute_missing", |s| Ok(impute_missing(s)))?;
  define_map(registry, "impute_outliers", |s| Ok(impute_outliers(s)))?;
  define_map(registry, "longest_continuous_run", |s| Ok(longest_continuous_run(s)))?;
  define_map(registry, "difference", |s| Ok(difference(s)))?;
  define_map(registry, "standardize", |s| Ok(standardize(s)))?;
  define_map(registry, "logarithm", logarithm)?;
  define_map(registry, "cubic_root", |s| Ok(cubic_root(s)))?;

  // args: series, window, train_fraction
  define(
    registry,
    Signature::new("design_matrix", OperatorKind::Preprocess)
      .inputs(["series"])
      .outputs(["x_train", "y_train", "x_test", "y_test"]),
    |values| {
      let args = Args::new(&values);
      let series = args.series(0, "series")?;
      let matrix = design_matrix(&series, args.usize(1, "window")?, args.f64(2, "train_fraction")?)?;
      Ok(Output::Many(vec![
        matrix_to_value(&matrix.x_train),
        to_value(&matrix.y_train),
        matrix_to_value(&matrix.x_test),
        to_value(&matrix.y_test),
      ]))
    },
  )
}

/// Samples `start..end`. `end` is clamped to the series length.
pub fn clip(series: &[f64], start: usize, end: usize) -> Result<Vec<f64>, OperatorError> {
  let end = end.min(series.len());
  if start > end {
    return Err(OperatorError::failed(format!(
      "clip range {start}..{end} is empty for a series of {} samples",
      series.len()
    )));
  }
  Ok(series[start..end].to_vec())
}

/// Fill each gap with the next present sample; a trailing gap takes the last
/// present one. A series with no present samples is returned unchanged.
pub fn impute_missing(series: &[f64]) -> Vec<f64> {
  let mut filled = series.to_vec();
  let mut next = f64::NAN;
  for value in filled.iter_mut().rev() {
    if value.is_nan() {
      *value = next;
    } else {
      next = *value;
    }
  }
  let mut last = f64::NAN;
  for value in filled.iter_mut() {
    if value.is_nan() {
      *value = last;
    } else {
      last = *value;
    }
  }
  filled
}

/// Drop samples outside the open band between the 1% and 99% quantiles of
/// the present samples. Missing samples are dropped too, so the result may be
/// shorter than the input.
pub fn impute_outliers(series: &[f64]) -> Vec<f64> {
  let mut sorted: Vec<f64> = series.iter().copied().filter(|v| !v.is_nan()).collect();
  sorted.sort_by(f64::total_cmp);
  let (Some(low), Some(high)) = (quantile(&sorted, OUTLIER_LOW), quantile(&sorted, OUTLIER_HIGH)) else {
    return Vec::new();
  };

  series
    .iter()
    .copied()
    .filter(|v| !v.is_nan())
    .filter(|&v| low == high || (v > low && v < high))
    .collect()
}

/// Quantile `q` of an ascending slice, interpolating linearly between the
/// neighbouring order statistics.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
  let last = sorted.len().checked_sub(1)?;
  let position = q * last as f64;
  let below = position.floor() as usize;
  let above = position.ceil() as usize;
  Some(sorted[below] + (sorted[above] - sorted[below]) * (position - below as f64))
}

/// The longest stretch of consecutive present samples. The earliest stretch
/// wins a tie.
pub fn longest_continuous_run(series: &[f64]) -> Vec<f64> {
  series
    .split(|v| v.is_nan())
    .fold(&[][..], |best, run| if run.len() > best.len() { run } else { best })
    .to_vec()
}

/// Impute gaps, then smooth with a trailing moving average over `window`
/// samples. The first samples average over the shorter prefix.
pub fn denoise(series: &[f64], window: usize) -> Result<Vec<f64>, OperatorError> {
  if window == 0 {
    return Err(OperatorError::InvalidArgument {
      index: 1,
      name: "window",
      message: "window must be at least 1".to_string(),
    });
  }
  let filled = impute_missing(series);
  Ok(
    (0..filled.len())
      .map(|i| {
        let from = (i + 1).saturating_sub(window);
        let slice = &filled[from..=i];
        slice.iter().sum::<f64>() / slice.len() as f64
      })
      .collect(),
  )
}

/// First difference: `x[i + 1] - x[i]`, one sample shorter than the input.
pub fn difference(series: &[f64]) -> Vec<f64> {
  series.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Min-max scale the present samples into `[min, max]`. A constant series
/// maps to `min`.
pub fn scale(series: &[f64], min: f64, max: f64) -> Vec<f64> {
  let (lo, hi) = series
    .iter()
    .filter(|v| !v.is_nan())
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
  let span = hi - lo;
  series
    .iter()
    .map(|&v| {
      if span > 0.0 {
        min + (v - lo) / span * (max - min)
      } else {
        min + v * 0.0
      }
    })
    .collect()
}

/// Shift and scale to zero mean and unit (population) variance.
pub fn standardize(series: &[f64]) -> Vec<f64> {
  let Some(mu) = mean(series) else {
    return series.to_vec();
  };
  let variance = mean(&series.iter().map(|v| (v - mu).powi(2)).collect::<Vec<_>>()).unwrap_or(0.0);
  let sigma = variance.sqrt();
  series
    .iter()
    .map(|v| if sigma > 0.0 { (v - mu) / sigma } else { v - mu })
    .collect()
}

/// Base-10 logarithm. Every present sample must be positive.
pub fn logarithm(series: &[f64]) -> Result<Vec<f64>, OperatorError> {
  if let Some(bad) = series.iter().find(|&&v| v <= 0.0) {
    return Err(OperatorError::failed(format!(
      "logarithm needs positive samples, found {bad}"
    )));
  }
  Ok(series.iter().map(|v| v.log10()).collect())
}

pub fn cubic_root(series: &[f64]) -> Vec<f64> {
  series.iter().map(|v| v.cbrt()).collect()
}

/// Supervised view of a series: each row of `x` holds `window` consecutive
/// samples and the matching `y` is the sample that follows them.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
  pub x_train: Vec<Vec<f64>>,
  pub y_train: Vec<f64>,
  pub x_test: Vec<Vec<f64>>,
  pub y_test: Vec<f64>,
}

/// Split `series` at `train_fraction` and window each part.
pub fn design_matrix(series: &[f64], window: usize, train_fraction: f64) -> Result<DesignMatrix, OperatorError> {
  if window == 0 {
    return Err(OperatorError::InvalidArgument {
      index: 1,
      name: "window",
      message: "window must be at least 1".to_string(),
    });
  }
  if !(train_fraction > 0.0 && train_fraction < 1.0) {
    return Err(OperatorError::InvalidArgument {
      index: 2,
      name: "train_fraction",
      message: format!("expected a fraction strictly between 0 and 1, got {train_fraction}"),
    });
  }
  if has_missing(series) {
    return Err(OperatorError::failed(
      "series has missing samples; impute before building a design matrix",
    ));
  }

  let split = (series.len() as f64 * train_fraction).floor() as usize;
  let (train, test) = series.split_at(split);
  let (x_train, y_train) = windowed(train, window);
  let (x_test, y_test) = windowed(test, window);
  if x_train.is_empty() || x_test.is_empty() {
    return Err(OperatorError::failed(format!(
      "{} samples split at {train_fraction} leave no rows for window {window}",
      series.len()
    )));
  }

  Ok(DesignMatrix {
    x_train,
    y_train,
    x_test,
    y_test,
  })
}

fn windowed(part: &[f64], window: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
  part
    .windows(window + 1)
    .map(|w| (w[..window].to_vec(), w[window]))
    .unzip()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pipetree_operator::Value;
  use serde_json::json;

  fn approx(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
      assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
  }

  #[test]
  fn test_clip() {
    let series = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(clip(&series, 1, 3).unwrap(), vec![2.0, 3.0]);
    assert_eq!(clip(&series, 2, 99).unwrap(), vec![3.0, 4.0]);
    assert!(clip(&series, 3, 1).is_err());
  }

  #[test]
  fn test_impute_missing() {
    let nan = f64::NAN;
    assert_eq!(impute_missing(&[nan, 1.0, nan, nan, 4.0, nan]), vec![1.0, 1.0, 4.0, 4.0, 4.0, 4.0]);
    assert!(impute_missing(&[nan, nan]).iter().all(|v| v.is_nan()));
  }

  #[test]
  fn test_impute_outliers_trims_both_tails() {
    let series: Vec<f64> = (1..=100).map(f64::from).collect();

    // q01 = 1.99, q99 = 99.01
    let kept = impute_outliers(&series);
    assert_eq!(kept, (2..=99).map(f64::from).collect::<Vec<_>>());

    let mut spiked = series.clone();
    spiked[40] = 1e6;
    spiked.push(f64::NAN);
    let kept = impute_outliers(&spiked);
    assert!(!kept.contains(&1e6));
    assert!(kept.iter().all(|v| !v.is_nan()));
    assert_eq!(kept.first(), Some(&2.0));
  }

  #[test]
  fn test_impute_outliers_degenerate_series() {
    let nan = f64::NAN;
    assert!(impute_outliers(&[nan, nan, nan]).is_empty());
    assert!(impute_outliers(&[]).is_empty());
    assert_eq!(impute_outliers(&[3.0, nan, 3.0, 3.0]), vec![3.0, 3.0, 3.0]);
  }

  #[test]
  fn test_quantile_interpolates() {
    assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), Some(3.0));
    assert!((quantile(&[0.0, 10.0], 0.25).unwrap() - 2.5).abs() < 1e-12);
    assert_eq!(quantile(&[7.0], 0.99), Some(7.0));
    assert_eq!(quantile(&[], 0.5), None);
  }

  #[test]
  fn test_longest_continuous_run() {
    let nan = f64::NAN;
    assert_eq!(longest_continuous_run(&[1.0, nan, 2.0, 3.0, nan, 4.0]), vec![2.0, 3.0]);
    assert_eq!(longest_continuous_run(&[1.0, 2.0, nan, 3.0, 4.0]), vec![1.0, 2.0]);
    assert_eq!(longest_continuous_run(&[nan, 5.0, 6.0, 7.0]), vec![5.0, 6.0, 7.0]);
  }

  #[test]
  fn test_longest_continuous_run_edges() {
    let nan = f64::NAN;
    assert_eq!(longest_continuous_run(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    assert!(longest_continuous_run(&[nan, nan]).is_empty());
    assert!(longest_continuous_run(&[]).is_empty());
  }

  #[test]
  fn test_denoise_moving_average() {
    approx(&denoise(&[1.0, 3.0, 5.0, 7.0], 2).unwrap(), &[1.0, 2.0, 4.0, 6.0]);
    approx(&denoise(&[2.0, f64::NAN, 4.0], 1).unwrap(), &[2.0, 4.0, 4.0]);
    assert!(denoise(&[1.0], 0).is_err());
  }

  #[test]
  fn test_difference() {
    assert_eq!(difference(&[1.0, 4.0, 2.0]), vec![3.0, -2.0]);
    assert!(difference(&[1.0]).is_empty());
  }

  #[test]
  fn test_scale() {
    approx(&scale(&[2.0, 4.0, 6.0], 0.0, 1.0), &[0.0, 0.5, 1.0]);
    approx(&scale(&[2.0, 4.0, 6.0], -1.0, 1.0), &[-1.0, 0.0, 1.0]);
    approx(&scale(&[3.0, 3.0], 0.0, 1.0), &[0.0, 0.0]);
    assert!(scale(&[1.0, f64::NAN, 3.0], 0.0, 1.0)[1].is_nan());
  }

  #[test]
  fn test_standardize() {
    let z = standardize(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(mean(&z).unwrap().abs() < 1e-12);
    let variance = z.iter().map(|v| v * v).sum::<f64>() / z.len() as f64;
    assert!((variance - 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_logarithm_and_cubic_root() {
    approx(&logarithm(&[1.0, 10.0, 1000.0]).unwrap(), &[0.0, 1.0, 3.0]);
    assert!(logarithm(&[1.0, 0.0]).is_err());
    approx(&cubic_root(&[8.0, -27.0]), &[2.0, -3.0]);
  }

  #[test]
  fn test_design_matrix_windows() {
    let series: Vec<f64> = (1..=10).map(f64::from).collect();
    let matrix = design_matrix(&series, 2, 0.6).unwrap();

    // train = 1..=6, test = 7..=10
    assert_eq!(matrix.x_train.len(), 4);
    assert_eq!(matrix.x_train[0], vec![1.0, 2.0]);
    assert_eq!(matrix.y_train, vec![3.0, 4.0, 5.0, 6.0]);
    assert_eq!(matrix.x_test, vec![vec![7.0, 8.0], vec![8.0, 9.0]]);
    assert_eq!(matrix.y_test, vec![9.0, 10.0]);
  }

  #[test]
  fn test_design_matrix_rejects_bad_input() {
    let series: Vec<f64> = (1..=10).map(f64::from).collect();
    assert!(design_matrix(&series, 0, 0.5).is_err());
    assert!(design_matrix(&series, 2, 1.0).is_err());
    assert!(design_matrix(&series, 5, 0.5).is_err());
    assert!(design_matrix(&[1.0, f64::NAN, 3.0, 4.0], 1, 0.5).is_err());
  }

  #[test]
  fn test_registered_operators_use_fixed_args() {
    let mut registry = OperatorRegistry::new();
    register(&mut registry).unwrap();

    let denoise = registry.get("denoise").unwrap();
    let out = denoise.invoke(vec![json!([1.0, 3.0, 5.0]), json!(2)]).unwrap();
    assert_eq!(out, Output::Single(json!([1.0, 2.0, 4.0])));

    let run = registry.get("longest_continuous_run").unwrap();
    let out = run.invoke(vec![json!([1.0, null, 2.0, 3.0])]).unwrap();
    assert_eq!(out, Output::Single(json!([2.0, 3.0])));

    let dm = registry.get("design_matrix").unwrap();
    let out = dm
      .invoke(vec![json!([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), json!(1), json!(0.5)])
      .unwrap();
    let values: Vec<Value> = out.into_values();
    assert_eq!(values.len(), 4);
    assert_eq!(values[0], json!([[1.0], [2.0]]));
    assert_eq!(values[3], json!([5.0, 6.0]));
  }
}
