//! Fitting model parameters to observed data.
//!
//! The fitters treat the model as a black box: callers supply a closure that
//! maps a parameter vector to a [`Trajectory`], usually by building a model
//! and integrating it.

use crate::error::{EpiError, Result};
use crate::models::Trajectory;
use anyhow::{bail, Context};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Observed compartment populations.
///
/// The CSV header lists the compartment indices being observed; every other
/// row holds the observed values for those compartments at one time index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedData {
    pub columns: Vec<usize>,
    pub rows: Vec<Vec<f64>>,
}

impl ObservedData {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = csv
            .headers()?
            .iter()
            .map(|h| {
                h.parse::<usize>()
                    .map_err(|_| EpiError::Data(format!("header `{h}` is not a compartment index")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::new();
        for (line, record) in csv.records().enumerate() {
            let record = record?;
            if record.len() != columns.len() {
                return Err(EpiError::Data(format!(
                    "row {} has {} values for {} columns",
                    line + 1,
                    record.len(),
                    columns.len()
                )));
            }
            let row = record
                .iter()
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|_| EpiError::Data(format!("`{v}` is not a number")))
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Step size `mu`; tune it so the loss falls every epoch.
    pub learning_rate: f64,
    pub epochs: usize,
    /// Finite-difference step; raise it if the gradients come out zero.
    pub delta: f64,
    /// Time indices compared against the data; empty means every row.
    pub samples: Vec<usize>,
    /// Total population used to normalise the cost.
    pub population: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epochs: 100,
            delta: 1e-4,
            samples: Vec::new(),
            population: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub params: Vec<f64>,
    /// Loss at the start of every epoch.
    pub losses: Vec<f64>,
}

/// Quadratic cost between a prediction and the observed data, normalised by
/// the population.
pub fn quadratic_cost(
    prediction: &Trajectory,
    data: &ObservedData,
    samples: &[usize],
    population: f64,
) -> anyhow::Result<f64> {
    let mut cost = 0.0;
    for &sample in samples {
        let predicted = prediction
            .states
            .get(sample)
            .with_context(|| format!("prediction has no time index {sample}"))?;
        let observed = data
            .rows
            .get(sample)
            .with_context(|| format!("observed data has no row {sample}"))?;
        for (&column, &real) in data.columns.iter().zip(observed) {
            let pred = predicted
                .get(column)
                .with_context(|| format!("prediction has no compartment {column}"))?;
            let err = (pred - real) / population;
            cost += err * err;
        }
    }
    Ok(cost)
}

/// Plain (non-stochastic) gradient descent with forward-difference gradients.
///
/// Each epoch evaluates `predict` once per parameter plus once for the base
/// loss, so long time spans can be slow to converge.
pub fn gradient_descent<F>(
    mut predict: F,
    data: &ObservedData,
    initial_params: &[f64],
    settings: &FitSettings,
) -> anyhow::Result<FitReport>
where
    F: FnMut(&[f64]) -> anyhow::Result<Trajectory>,
{
    if !(settings.delta > 0.0) {
        bail!("Finite-difference step delta must be positive.");
    }
    if !(settings.population > 0.0) {
        bail!("Population must be positive.");
    }
    if data.rows.is_empty() {
        bail!("Observed data has no rows.");
    }
    let samples: Vec<usize> = if settings.samples.is_empty() {
        (0..data.rows.len()).collect()
    } else {
        settings.samples.clone()
    };

    let mut params = initial_params.to_vec();
    let mut losses = Vec::with_capacity(settings.epochs);
    let mut probe = params.clone();
    let mut gradients = vec![0.0; params.len()];

    for epoch in 0..settings.epochs {
        let base = predict(&params).context("Model prediction failed")?;
        let base_cost = quadratic_cost(&base, data, &samples, settings.population)?;
        info!(epoch, loss = base_cost, "gradient descent");

        probe.copy_from_slice(&params);
        for (i, grad) in gradients.iter_mut().enumerate() {
            probe[i] += settings.delta;
            let pred = predict(&probe)
                .with_context(|| format!("Model prediction failed for parameter {i}"))?;
            *grad = (quadratic_cost(&pred, data, &samples, settings.population)? - base_cost)
                / settings.delta;
            probe[i] = params[i];
        }
        debug!(epoch, ?gradients, "gradients");

        for (p, g) in params.iter_mut().zip(&gradients) {
            *p -= settings.learning_rate * g;
        }
        losses.push(base_cost);
    }

    Ok(FitReport { params, losses })
}
