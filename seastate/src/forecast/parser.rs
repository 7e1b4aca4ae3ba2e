//! Parser for the gridded model's ASCII response.
//!
//! The response is a sequence of variable blocks. A block opens with a
//! header line containing the variable name and a comma, e.g.
//!
//! ```text
//! htsgw, [56][1][1]
//! [0][0], 1.23
//! [1][0], 1.31
//! ```
//!
//! Each data line `[<i>][0], <float>` assigns the value at step `i`.
//! The model's missing-value sentinel (9.999e+20) reads as absent.

use std::collections::HashMap;

/// Values at or above this are the model's missing-data sentinel.
const MISSING_SENTINEL: f64 = 9.0e20;

/// Per-variable time series extracted from an ASCII response.
pub type VariableSeries = HashMap<String, Vec<Option<f64>>>;

/// Parse every variable block into step-indexed series of length `steps`.
pub fn parse_ascii(body: &str, steps: usize) -> VariableSeries {
    let mut series: VariableSeries = HashMap::new();
    let mut current: Option<String> = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            current = None;
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let Some(var) = &current else { continue };
            let Some((index_part, value_part)) = rest.split_once(',') else {
                continue;
            };
            let Some(step) = parse_step(index_part) else {
                continue;
            };
            if step >= steps {
                continue;
            }
            let value = value_part
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.abs() < MISSING_SENTINEL);
            if let Some(slot) = series
                .get_mut(var.as_str())
                .and_then(|values| values.get_mut(step))
            {
                *slot = value;
            }
        } else if let Some((name, _)) = line.split_once(',') {
            let name = name.trim();
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                series
                    .entry(name.to_string())
                    .or_insert_with(|| vec![None; steps]);
                current = Some(name.to_string());
            } else {
                current = None;
            }
        }
    }

    series
}

/// Extract the leading step index from `<i>][0]`.
fn parse_step(index_part: &str) -> Option<usize> {
    index_part.split(']').next()?.trim().parse().ok()
}

/// Convenience accessor: the value of `name` at `step`, if sampled.
pub fn sample(series: &VariableSeries, name: &str, step: usize) -> Option<f64> {
    series.get(name)?.get(step).copied().flatten()
}
