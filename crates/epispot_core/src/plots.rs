//! Figure data for compartment populations over time.
//!
//! Nothing here draws pixels. A [`Figure`] carries everything a front-end
//! needs (labels, colours, series) and can be exported as JSON or CSV.

use crate::comps::CompartmentRole;
use crate::error::{EpiError, Result};
use crate::models::Model;
use crate::solvers::IntegrationSettings;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

pub const DEFAULT_TITLE: &str = "Compartment Populations over Time";

pub const PALETTE: [&str; 10] = [
    "#545454", "#5386e4", "#d138bf", "#f87666", "#f8f272", "#822e81", "#9fbbcc", "#ff784f",
    "#45cb85", "#a5cc6b",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    pub title: String,
    /// Include Susceptible compartments, which usually dwarf the others.
    pub show_susceptible: bool,
    pub log_scale: bool,
    /// Only plot these compartment indices.
    pub compartments: Option<Vec<usize>>,
    /// CSS colours cycled through in series order; defaults to [`PALETTE`]
    /// keyed by compartment index.
    pub colors: Option<Vec<String>>,
    pub starting_state: Option<Vec<f64>>,
    /// Solver settings; forward Euler when unset.
    pub integration: Option<IntegrationSettings>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            show_susceptible: false,
            log_scale: false,
            compartments: None,
            colors: None,
            starting_state: None,
            integration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    Line,
    Stacked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub kind: FigureKind,
    pub x_label: String,
    pub y_label: String,
    pub log_scale: bool,
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Writes one row per time point: the time, then every series.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec!["time".to_string()];
        header.extend(self.series.iter().map(|s| s.name.clone()));
        csv.write_record(&header)?;
        for (i, t) in self.x.iter().enumerate() {
            let mut row = vec![t.to_string()];
            row.extend(self.series.iter().map(|s| s.values[i].to_string()));
            csv.write_record(&row)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Running totals in series order, i.e. the upper edge of every band of a
    /// stacked area chart.
    pub fn stacked_totals(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.0; self.x.len()];
        self.series
            .iter()
            .map(|s| {
                for (acc, v) in running.iter_mut().zip(&s.values) {
                    *acc += v;
                }
                running.clone()
            })
            .collect()
    }
}

/// Line chart of every (selected) compartment.
pub fn model(model: &mut Model, timesteps: &[f64], options: &PlotOptions) -> Result<Figure> {
    build(model, timesteps, options, FigureKind::Line)
}

/// Stacked area chart of every (selected) compartment.
pub fn stacked(model: &mut Model, timesteps: &[f64], options: &PlotOptions) -> Result<Figure> {
    build(model, timesteps, options, FigureKind::Stacked)
}

fn build(
    model: &mut Model,
    timesteps: &[f64],
    options: &PlotOptions,
    kind: FigureKind,
) -> Result<Figure> {
    if let Some(colors) = &options.colors {
        if colors.is_empty() {
            return Err(EpiError::InvalidModel("colour list is empty".into()));
        }
    }
    let trajectory = model.integrate_with(
        timesteps,
        options.starting_state.as_deref(),
        options.integration.unwrap_or_default(),
    )?;

    let comps = model.compartments();
    let selected: Vec<usize> = match &options.compartments {
        Some(indices) => {
            if let Some(&bad) = indices.iter().find(|&&i| i >= comps.len()) {
                return Err(EpiError::InvalidModel(format!(
                    "cannot plot compartment {bad}; the model has {}",
                    comps.len()
                )));
            }
            indices.clone()
        }
        None => (0..comps.len()).collect(),
    };

    let series = selected
        .into_iter()
        .filter(|&i| options.show_susceptible || comps[i].role() != CompartmentRole::Susceptible)
        .enumerate()
        .map(|(n, i)| {
            let color = match &options.colors {
                Some(colors) => colors[n % colors.len()].clone(),
                None => PALETTE[i % PALETTE.len()].to_string(),
            };
            Series {
                name: comps[i].name.clone(),
                color,
                values: trajectory.series(i),
            }
        })
        .collect();

    Ok(Figure {
        title: options.title.clone(),
        kind,
        x_label: "Time (days)".to_string(),
        y_label: "People".to_string(),
        log_scale: options.log_scale,
        x: trajectory.times,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeFrame;
    use crate::pre;

    #[test]
    fn line_figure_hides_susceptible_by_default() {
        let mut sir = pre::sir(2.5, 0.5, 1e4).expect("sir");
        let days = TimeFrame::days(30).points();
        let fig = model(&mut sir, &days, &PlotOptions::default()).expect("figure");

        assert_eq!(fig.title, DEFAULT_TITLE);
        assert_eq!(fig.kind, FigureKind::Line);
        assert_eq!(fig.x, days);
        let names: Vec<_> = fig.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Infected", "Removed"]);
        assert_eq!(fig.series[0].color, PALETTE[1]);
        assert_eq!(fig.series[0].values.len(), 30);
    }

    #[test]
    fn options_select_and_colour_series() {
        let mut sir = pre::sir(2.5, 0.5, 1e4).expect("sir");
        let days = TimeFrame::days(10).points();
        let options = PlotOptions {
            title: "Outbreak".into(),
            show_susceptible: true,
            log_scale: true,
            compartments: Some(vec![0, 2]),
            colors: Some(vec!["red".into()]),
            ..PlotOptions::default()
        };
        let fig = stacked(&mut sir, &days, &options).expect("figure");
        assert_eq!(fig.kind, FigureKind::Stacked);
        assert!(fig.log_scale);
        let names: Vec<_> = fig.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Susceptible", "Removed"]);
        assert!(fig.series.iter().all(|s| s.color == "red"));

        let bad = PlotOptions {
            compartments: Some(vec![7]),
            ..PlotOptions::default()
        };
        assert!(model(&mut sir, &days, &bad).is_err());
    }

    #[test]
    fn solver_is_unset_unless_options_name_one() {
        let options: PlotOptions = serde_json::from_str(r#"{"title": "SIR"}"#).expect("options");
        assert_eq!(options.integration, None);

        let options: PlotOptions =
            serde_json::from_str(r#"{"integration": {"method": "rk4", "substeps": 2}}"#)
                .expect("options");
        let settings = options.integration.expect("explicit solver");
        assert_eq!(settings.method, crate::solvers::IntegrationMethod::Rk4);
        assert_eq!(settings.substeps, 2);

        let mut sir = pre::sir(2.5, 0.5, 1e4).expect("sir");
        let days = [0.0, 1.0, 2.0];
        let rk4 = model(&mut sir, &days, &options).expect("rk4 figure");
        let euler = model(&mut sir, &days, &PlotOptions::default()).expect("euler figure");
        assert_ne!(rk4.series[0].values[1], euler.series[0].values[1]);
    }

    #[test]
    fn stacked_totals_sum_to_population() {
        let mut sir = pre::sir(2.5, 0.5, 1e4).expect("sir");
        let days = TimeFrame::days(20).points();
        let options = PlotOptions {
            show_susceptible: true,
            ..PlotOptions::default()
        };
        let fig = stacked(&mut sir, &days, &options).expect("figure");
        let totals = fig.stacked_totals();
        for top in totals.last().expect("three bands") {
            assert!((top - 1e4).abs() < 1e-6);
        }
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let mut sir = pre::sir(2.0, 0.5, 100.0).expect("sir");
        let fig = model(&mut sir, &[0.0, 1.0, 2.0], &PlotOptions::default()).expect("figure");
        let mut buf = Vec::new();
        fig.write_csv(&mut buf).expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "time,Infected,Removed");
        assert!(lines[1].starts_with("0,"));

        let json: serde_json::Value =
            serde_json::from_str(&fig.to_json().expect("json")).expect("valid json");
        assert_eq!(json["kind"], "line");
        assert_eq!(json["x_label"], "Time (days)");
    }
}
