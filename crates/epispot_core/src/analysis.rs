//! Cleaning and normalising raw case data before it is compared with a
//! model.
//!
//! Case series are usually reported as new cases per day (`deltas`) or as
//! running totals (`cumulative`); the helpers here convert between the two
//! and derive active, recovered and bounded death counts.

use crate::error::{EpiError, Result};

/// Scales every count by `1 + percent` to correct consistent under- or
/// over-reporting. `percent` is expected to lie in `[-1, 1]`.
pub fn count(cases: &[f64], percent: f64) -> Vec<f64> {
    cases.iter().map(|c| c * (1.0 + percent)).collect()
}

/// Active cases from new cases per day: a trailing sum over the infectious
/// `period`, looking `delay` days ahead to account for testing delay.
///
/// The result is `delay` entries shorter than `deltas`.
pub fn active(deltas: &[f64], period: usize, delay: usize) -> Vec<f64> {
    let len = deltas.len().saturating_sub(delay);
    (0..len)
        .map(|i| {
            let end = (i + delay + 1).min(deltas.len());
            let start = (i + delay).saturating_sub(period);
            deltas[start..end].iter().sum()
        })
        .collect()
}

pub fn cumulative(deltas: &[f64]) -> Vec<f64> {
    deltas
        .iter()
        .scan(0.0, |total, d| {
            *total += d;
            Some(*total)
        })
        .collect()
}

pub fn deltas(cumulative: &[f64]) -> Vec<f64> {
    let Some(&first) = cumulative.first() else {
        return Vec::new();
    };
    std::iter::once(first)
        .chain(cumulative.windows(2).map(|w| w[1] - w[0]))
        .collect()
}

/// Drops the first `delay` entries.
pub fn shift(count: &[f64], delay: usize) -> Vec<f64> {
    count.get(delay..).map(<[f64]>::to_vec).unwrap_or_default()
}

/// Caps new deaths per day at the most people that could have left the
/// active pool that day. All three series must share length and delay.
pub fn bound(active: &[f64], deltas: &[f64], deaths: &[f64]) -> Result<Vec<f64>> {
    same_length(&[("active", active), ("deltas", deltas), ("deaths", deaths)])?;
    Ok(deaths
        .iter()
        .enumerate()
        .map(|(i, &death)| {
            if i == 0 {
                death
            } else {
                death.min(outflow(active, deltas, i))
            }
        })
        .collect())
}

/// New recoveries per day: the outflow from the active pool minus deaths.
/// The first entry is always zero. Bound deaths first to avoid negative
/// recoveries.
pub fn recovered(active: &[f64], deltas: &[f64], deaths: &[f64]) -> Result<Vec<f64>> {
    same_length(&[("active", active), ("deltas", deltas), ("deaths", deaths)])?;
    if active.is_empty() {
        return Ok(Vec::new());
    }
    Ok(std::iter::once(0.0)
        .chain((1..active.len()).map(|i| outflow(active, deltas, i) - deaths[i]))
        .collect())
}

fn outflow(active: &[f64], deltas: &[f64], i: usize) -> f64 {
    -(active[i] - active[i - 1] - deltas[i])
}

fn same_length(series: &[(&str, &[f64])]) -> Result<()> {
    let Some(&(first_name, first)) = series.first() else {
        return Ok(());
    };
    for &(name, values) in &series[1..] {
        if values.len() != first.len() {
            return Err(EpiError::Data(format!(
                "`{name}` has {} entries but `{first_name}` has {}",
                values.len(),
                first.len()
            )));
        }
    }
    Ok(())
}
