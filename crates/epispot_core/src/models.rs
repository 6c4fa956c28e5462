//! The compartmental model: a directed graph of compartments whose edges
//! carry time-dependent transfers.
//!
//! Build a model by adding compartments (or through [`Model::from_parts`]),
//! `compile` it to validate the graph, then `integrate` it over a range of
//! timesteps.

use crate::comps::{Compartment, CompartmentRole};
use crate::error::{EpiError, Result};
use crate::params::Transfer;
use crate::solvers::IntegrationSettings;
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Indices gathered at compile time.
#[derive(Debug, Clone)]
struct Layout {
    infectious: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    initial_population: f64,
    compartments: Vec<Compartment>,
    /// `map[i]` lists the compartments compartment `i` feeds.
    map: Vec<Vec<usize>>,
    /// `matrix[i][j]` parameterises the edge from `i` to `j`.
    matrix: Vec<Vec<Transfer>>,
    #[serde(default)]
    custom: bool,
    version: String,
    #[serde(skip)]
    layout: Option<Layout>,
}

impl Model {
    pub fn new(initial_population: f64) -> Self {
        Self {
            initial_population,
            compartments: Vec::new(),
            map: Vec::new(),
            matrix: Vec::new(),
            custom: false,
            version: crate::VERSION.to_string(),
            layout: None,
        }
    }

    pub fn from_parts(
        initial_population: f64,
        compartments: Vec<Compartment>,
        map: Vec<Vec<usize>>,
        matrix: Vec<Vec<Transfer>>,
    ) -> Result<Self> {
        if map.len() != compartments.len() || matrix.len() != compartments.len() {
            return Err(EpiError::InvalidModel(format!(
                "{} compartments but {} layer map rows and {} matrix rows",
                compartments.len(),
                map.len(),
                matrix.len()
            )));
        }
        Ok(Self {
            compartments,
            map,
            matrix,
            ..Self::new(initial_population)
        })
    }

    /// Appends a compartment. `row` holds the transfers out of the new
    /// compartment and must have one entry per compartment (including the new
    /// one); existing rows are padded with the `(1, 1)` placeholder.
    ///
    /// Adding a compartment invalidates any previous compile.
    pub fn add(&mut self, compartment: Compartment, connections: Vec<usize>, row: Vec<Transfer>) {
        debug!(name = %compartment.name, ?connections, "adding compartment");
        self.compartments.push(compartment);
        self.map.push(connections);
        for existing in &mut self.matrix {
            existing.push(Transfer::default());
        }
        self.matrix.push(row);
        self.layout = None;
    }

    /// Validates the graph and prepares it for integration.
    ///
    /// With `custom` set, per-kind connection rules are skipped; this is
    /// required for models that contain custom compartments.
    pub fn compile(&mut self, custom: bool) -> Result<()> {
        if self.layout.is_some() {
            warn!("model was already compiled; compiling again");
        }
        self.validate()?;
        if !custom {
            for (comp, connections) in self.compartments.iter().zip(&self.map) {
                comp.check(connections, &self.compartments)?;
            }
        }

        let infectious = self
            .compartments
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role() == CompartmentRole::Infectious)
            .map(|(i, _)| i)
            .collect();
        self.layout = Some(Layout { infectious });
        self.custom = custom;
        info!(compartments = self.compartments.len(), custom, "model compiled");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let n = self.compartments.len();
        if n == 0 {
            return Err(EpiError::InvalidModel("model has no compartments".into()));
        }
        if self.map.len() != n {
            return Err(EpiError::InvalidModel(format!(
                "layer map has {} rows for {n} compartments",
                self.map.len()
            )));
        }
        if self.matrix.len() != n {
            return Err(EpiError::InvalidModel(format!(
                "transfer matrix has {} rows for {n} compartments",
                self.matrix.len()
            )));
        }
        for (i, row) in self.matrix.iter().enumerate() {
            if row.len() != n {
                return Err(EpiError::InvalidModel(format!(
                    "transfer matrix row {i} has {} entries, expected {n}",
                    row.len()
                )));
            }
        }
        for (i, connections) in self.map.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for &c in connections {
                if c >= n {
                    return Err(EpiError::InvalidModel(format!(
                        "compartment {i} connects to index {c}, but there are only {n} compartments"
                    )));
                }
                if !seen.insert(c) {
                    return Err(EpiError::InvalidModel(format!(
                        "compartment {i} connects to compartment {c} more than once"
                    )));
                }
            }
        }
        for (i, comp) in self.compartments.iter().enumerate() {
            if let Some(triage) = comp.kind.triage() {
                if triage.overflow >= n {
                    return Err(EpiError::InvalidModel(format!(
                        "compartment {i} overflows into index {}, but there are only {n} compartments",
                        triage.overflow
                    )));
                }
            }
        }
        Ok(())
    }

    fn ensure_compiled(&mut self) -> Result<()> {
        if self.layout.is_none() {
            warn!("model has not been compiled; compiling now");
            self.compile(self.custom)?;
        }
        Ok(())
    }

    fn check_state(&self, state: &[f64]) -> Result<()> {
        if state.len() != self.compartments.len() {
            return Err(EpiError::StateDimension {
                expected: self.compartments.len(),
                found: state.len(),
            });
        }
        Ok(())
    }

    /// Time derivative of every compartment at time `t`.
    pub fn diff(&mut self, t: f64, state: &[f64]) -> Result<Vec<f64>> {
        self.ensure_compiled()?;
        self.check_state(state)?;
        let flow = self.flow()?;
        let mut out = vec![0.0; state.len()];
        flow.apply(t, state, &mut out);
        Ok(out)
    }

    /// `[N - 1, 1, 0, ...]`: one infected individual in an otherwise
    /// susceptible population.
    pub fn default_state(&self) -> Result<Vec<f64>> {
        let n = self.compartments.len();
        if n < 2 {
            return Err(EpiError::InvalidModel(
                "a default starting state needs at least two compartments".into(),
            ));
        }
        let mut state = vec![0.0; n];
        state[0] = self.initial_population - 1.0;
        state[1] = 1.0;
        Ok(state)
    }

    /// Integrates with the default forward Euler scheme.
    pub fn integrate(
        &mut self,
        timesteps: &[f64],
        starting_state: Option<&[f64]>,
    ) -> Result<Trajectory> {
        self.integrate_with(timesteps, starting_state, IntegrationSettings::default())
    }

    /// Integrates over `timesteps`, which must be evenly spaced; only the
    /// first two points determine the step size.
    ///
    /// Entry `i` of the result is the state after advancing from
    /// `timesteps[i]` by one step.
    pub fn integrate_with(
        &mut self,
        timesteps: &[f64],
        starting_state: Option<&[f64]>,
        settings: IntegrationSettings,
    ) -> Result<Trajectory> {
        self.ensure_compiled()?;
        if timesteps.len() < 2 {
            return Err(EpiError::Timesteps(
                "at least two time points are required to infer the step size".into(),
            ));
        }
        let delta = timesteps[1] - timesteps[0];
        if !(delta.is_finite() && delta > 0.0) {
            return Err(EpiError::Timesteps(format!(
                "step size must be positive, got {delta}"
            )));
        }
        if settings.substeps == 0 {
            return Err(EpiError::Timesteps("substeps must be at least 1".into()));
        }

        let mut state = match starting_state {
            Some(s) => {
                self.check_state(s)?;
                s.to_vec()
            }
            None => self.default_state()?,
        };

        let flow = self.flow()?;
        let mut stepper = settings.method.build(state.len());
        let dt = delta / settings.substeps as f64;
        let mut states = Vec::with_capacity(timesteps.len());
        for &start in timesteps {
            let mut t = start;
            for _ in 0..settings.substeps {
                stepper.step(&flow, &mut t, &mut state, dt);
            }
            states.push(state.clone());
        }
        debug!(
            steps = timesteps.len(),
            method = ?settings.method,
            substeps = settings.substeps,
            "integration finished"
        );

        Ok(Trajectory {
            times: timesteps.to_vec(),
            states,
        })
    }

    fn flow(&self) -> Result<Flow<'_>> {
        let layout = self.layout.as_ref().ok_or(EpiError::NotCompiled)?;
        Ok(Flow {
            model: self,
            layout,
            scratch: RefCell::new(vec![0.0; self.compartments.len()]),
        })
    }

    /// Replaces every compartment name, in order.
    pub fn rename<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.compartments.len() {
            return Err(EpiError::InvalidModel(format!(
                "{} names given for {} compartments",
                names.len(),
                self.compartments.len()
            )));
        }
        for (comp, name) in self.compartments.iter_mut().zip(names) {
            comp.name = name;
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.compartments.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn layer_map(&self) -> &[Vec<usize>] {
        &self.map
    }

    pub fn matrix(&self) -> &[Vec<Transfer>] {
        &self.matrix
    }

    pub fn initial_population(&self) -> f64 {
        self.initial_population
    }

    pub fn is_compiled(&self) -> bool {
        self.layout.is_some()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn to_json(&self) -> Result<String> {
        if !self.is_compiled() {
            return Err(EpiError::NotCompiled);
        }
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the compiled model to `path` as JSON, overwriting any existing
    /// file. Models holding closure params cannot be saved.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json)?;
        info!(path = %path.display(), "model saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;
        info!(path = %path.display(), "model loaded");
        Ok(model)
    }

    /// Parses a saved model and compiles it with the flags it was saved with.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut model: Model = serde_json::from_str(json)?;
        if model.version != crate::VERSION {
            warn!(
                saved = %model.version,
                current = crate::VERSION,
                "model was saved by a different version; it may not behave the same"
            );
        }
        model.compile(model.custom)?;
        Ok(model)
    }
}

/// Derivative view over a compiled model.
struct Flow<'a> {
    model: &'a Model,
    layout: &'a Layout,
    scratch: RefCell<Vec<f64>>,
}

impl DynamicalSystem<f64> for Flow<'_> {
    fn dimension(&self) -> usize {
        self.model.compartments.len()
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        let mut local = self.scratch.borrow_mut();
        out.fill(0.0);
        for (pos, comp) in self.model.compartments.iter().enumerate() {
            local.fill(0.0);
            comp.contribute(
                t,
                x,
                pos,
                &self.model.map[pos],
                &self.model.matrix[pos],
                &self.layout.infectious,
                &mut local,
            );
            for (o, l) in out.iter_mut().zip(local.iter()) {
                *o += l;
            }
        }
    }
}

/// Compartment populations over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub times: Vec<f64>,
    /// One state vector per time point.
    pub states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    /// Population of one compartment at every time point.
    pub fn series(&self, compartment: usize) -> Vec<f64> {
        self.states
            .iter()
            .map(|s| s.get(compartment).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

/// A half-open range of evenly spaced time points, like `start..stop` with a
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl TimeFrame {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(EpiError::Timesteps(format!(
                "time frame step must be positive, got {step}"
            )));
        }
        if !(start.is_finite() && stop.is_finite()) {
            return Err(EpiError::Timesteps("time frame bounds must be finite".into()));
        }
        Ok(Self { start, stop, step })
    }

    /// Days `0..days` with a step of one.
    pub fn days(days: usize) -> Self {
        Self {
            start: 0.0,
            stop: days as f64,
            step: 1.0,
        }
    }

    pub fn points(&self) -> Vec<f64> {
        let mut points = Vec::new();
        let mut i = 0usize;
        loop {
            let t = self.start + i as f64 * self.step;
            if t >= self.stop {
                break;
            }
            points.push(t);
            i += 1;
        }
        points
    }
}

/// `num` evenly spaced points from `start` to `stop`, both inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + i as f64 * step).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comps::Triage;
    use crate::params::{r_naught, transfer_matrix};

    fn tutorial_sir() -> Model {
        let r_0 = r_naught::logistic(2.0, 0.1, 50.0, 0.0).expect("valid preset");
        let gamma = 0.2;
        let n = 1e5;
        let mut matrix = transfer_matrix(3);
        matrix[1][2] = Transfer::new(1.0, gamma);
        Model::from_parts(
            n,
            vec![
                Compartment::susceptible(r_0, gamma, n),
                Compartment::infected(),
                Compartment::recovered(),
            ],
            vec![vec![1], vec![2], vec![]],
            matrix,
        )
        .expect("lengths agree")
    }

    fn simple_sir(r_0: f64, gamma: f64, n: f64) -> Model {
        let mut matrix = transfer_matrix(3);
        matrix[1][2] = Transfer::new(1.0, gamma);
        let mut model = Model::from_parts(
            n,
            vec![
                Compartment::susceptible(r_0, gamma, n),
                Compartment::infected(),
                Compartment::removed(),
            ],
            vec![vec![1], vec![2], vec![]],
            matrix,
        )
        .expect("lengths agree");
        model.compile(false).expect("valid model");
        model
    }

    #[test]
    fn tutorial_model_conserves_population_and_peaks() {
        let mut model = tutorial_sir();
        model.compile(false).expect("valid model");
        let days = TimeFrame::days(150).points();
        let traj = model.integrate(&days, None).expect("integrates");
        assert_eq!(traj.len(), 150);

        for state in &traj.states {
            let total: f64 = state.iter().sum();
            assert!((total - 1e5).abs() < 1e-6, "population drifted to {total}");
        }

        let infected = traj.series(1);
        let (peak_day, peak) = infected
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        assert!(peak > 800.0 && peak < 900.0, "unexpected peak {peak}");
        assert!(peak_day > 30 && peak_day < 70, "unexpected peak day {peak_day}");
        assert!(infected[149] < 1e-3);

        let last = traj.last().expect("non-empty");
        assert!((last[0] - 95_569.0).abs() < 1.0);
        assert!((last[2] - 4_431.0).abs() < 1.0);
    }

    #[test]
    fn sir_outbreak_reaches_expected_final_size() {
        let mut model = simple_sir(2.5, 0.5, 1e6);
        let days = TimeFrame::days(100).points();
        let traj = model.integrate(&days, None).expect("integrates");
        let last = traj.last().expect("non-empty");
        assert!((last[0] - 70_873.3).abs() < 1.0, "susceptible {}", last[0]);
        assert!(last[1] < 1e-6);
        assert!((last[2] - 929_126.7).abs() < 1.0, "removed {}", last[2]);
    }

    #[test]
    fn first_row_is_state_after_one_step() {
        let mut model = simple_sir(2.0, 0.5, 100.0);
        let traj = model
            .integrate(&[0.0, 1.0], Some(&[90.0, 10.0, 0.0][..]))
            .expect("integrates");
        // S -> I: 2 * 0.5 * 90 * 10 / 100 = 9; I -> R: 0.5 * 10 = 5
        assert_eq!(traj.states[0], vec![81.0, 14.0, 5.0]);
    }

    #[test]
    fn uncompiled_models_compile_on_demand() {
        let mut model = tutorial_sir();
        assert!(!model.is_compiled());
        let d = model.diff(0.0, &[99_999.0, 1.0, 0.0]).expect("diff");
        assert!(model.is_compiled());
        assert_eq!(d.len(), 3);
        assert!((d.iter().sum::<f64>()).abs() < 1e-12);
        assert!(d[0] < 0.0);
    }

    #[test]
    fn rejects_invalid_connections() {
        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::susceptible(2.0, 0.5, 100.0),
                Compartment::infected(),
                Compartment::dead(),
            ],
            vec![vec![1], vec![2], vec![1]],
            transfer_matrix(3),
        )
        .expect("lengths agree");
        let err = model.compile(false).expect_err("dead feeds infected");
        assert!(matches!(err, EpiError::InvalidConnection { .. }));
        assert!(!model.is_compiled());
    }

    #[test]
    fn rejects_susceptible_fan_out() {
        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::susceptible(2.0, 0.5, 100.0),
                Compartment::exposed(),
                Compartment::infected(),
            ],
            vec![vec![1, 2], vec![2], vec![]],
            transfer_matrix(3),
        )
        .expect("lengths agree");
        let err = model.compile(false).expect_err("two connections");
        assert!(matches!(err, EpiError::SusceptibleFanOut(_)));
    }

    #[test]
    fn rejects_bad_indices_and_shapes() {
        let mut model = Model::from_parts(
            100.0,
            vec![Compartment::susceptible(2.0, 0.5, 100.0), Compartment::infected()],
            vec![vec![5], vec![]],
            transfer_matrix(2),
        )
        .expect("lengths agree");
        assert!(matches!(model.compile(false), Err(EpiError::InvalidModel(_))));

        let mut model = Model::from_parts(
            100.0,
            vec![Compartment::susceptible(2.0, 0.5, 100.0), Compartment::infected()],
            vec![vec![1], vec![]],
            vec![vec![Transfer::default()], vec![Transfer::default(); 2]],
        )
        .expect("row counts agree");
        assert!(matches!(model.compile(false), Err(EpiError::InvalidModel(_))));

        let mut model = Model::from_parts(
            100.0,
            vec![Compartment::susceptible(2.0, 0.5, 100.0), Compartment::infected()],
            vec![vec![1, 1], vec![]],
            transfer_matrix(2),
        )
        .expect("lengths agree");
        match model.compile(false) {
            Err(EpiError::InvalidModel(msg)) => assert!(msg.contains("more than once"), "{msg}"),
            other => panic!("duplicate connection accepted: {other:?}"),
        }

        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::infected(),
                Compartment::hospitalized(Some(Triage {
                    max_capacity: 10.0,
                    overflow: 9,
                })),
            ],
            vec![vec![1], vec![]],
            transfer_matrix(2),
        )
        .expect("lengths agree");
        match model.compile(false) {
            Err(EpiError::InvalidModel(msg)) => assert!(msg.contains("index 9"), "{msg}"),
            other => panic!("out-of-range overflow accepted: {other:?}"),
        }

        let err = Model::from_parts(100.0, vec![Compartment::infected()], vec![], vec![])
            .expect_err("missing rows");
        assert!(matches!(err, EpiError::InvalidModel(_)));

        assert!(matches!(
            Model::new(10.0).compile(false),
            Err(EpiError::InvalidModel(_))
        ));
    }

    #[test]
    fn custom_compartments_need_custom_compile() {
        let mut model = simple_sir(2.0, 0.5, 100.0);
        model.add(Compartment::custom("Vaccinated", false), vec![], transfer_matrix(4).remove(0));
        assert!(!model.is_compiled());
        assert!(matches!(
            model.compile(false),
            Err(EpiError::UncheckedCustom(_))
        ));
        model.compile(true).expect("unchecked compile");
        assert_eq!(model.matrix().len(), 4);
        assert!(model.matrix().iter().all(|row| row.len() == 4));
    }

    #[test]
    fn infectious_custom_compartments_drive_infection() {
        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::susceptible(2.0, 0.5, 100.0),
                Compartment::custom("Asymptomatic", true),
            ],
            vec![vec![1], vec![]],
            transfer_matrix(2),
        )
        .expect("lengths agree");
        model.compile(true).expect("custom compile");
        let d = model.diff(0.0, &[90.0, 10.0]).expect("diff");
        assert_eq!(d, vec![-9.0, 9.0]);
    }

    #[test]
    fn triage_overflow_drains_capped_compartment() {
        let mut matrix = transfer_matrix(4);
        matrix[1][3] = Transfer::new(1.0, 0.0);
        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::infected(),
                Compartment::hospitalized(Some(Triage {
                    max_capacity: 20.0,
                    overflow: 2,
                })),
                Compartment::dead(),
                Compartment::recovered(),
            ],
            vec![vec![1], vec![3], vec![], vec![]],
            matrix,
        )
        .expect("lengths agree");
        model.compile(false).expect("valid model");
        let d = model.diff(0.0, &[0.0, 50.0, 0.0, 0.0]).expect("diff");
        assert_eq!(d, vec![0.0, -30.0, 30.0, 0.0]);
    }

    #[test]
    fn state_and_timestep_errors() {
        let mut model = simple_sir(2.0, 0.5, 100.0);
        assert!(matches!(
            model.integrate(&[0.0], None),
            Err(EpiError::Timesteps(_))
        ));
        assert!(matches!(
            model.integrate(&[1.0, 0.0], None),
            Err(EpiError::Timesteps(_))
        ));
        assert!(matches!(
            model.integrate(&[0.0, 1.0], Some(&[1.0, 2.0][..])),
            Err(EpiError::StateDimension { expected: 3, found: 2 })
        ));
        assert!(matches!(
            model.diff(0.0, &[1.0]),
            Err(EpiError::StateDimension { .. })
        ));
    }

    #[test]
    fn substeps_refine_the_euler_solution() {
        use crate::solvers::IntegrationMethod;
        let mut model = simple_sir(2.5, 0.5, 1e6);
        let days = TimeFrame::days(60).points();
        let coarse = model.integrate(&days, None).expect("coarse");
        let fine = model
            .integrate_with(
                &days,
                None,
                IntegrationSettings {
                    method: IntegrationMethod::Euler,
                    substeps: 10,
                },
            )
            .expect("fine");
        let rk4 = model
            .integrate_with(
                &days,
                None,
                IntegrationSettings {
                    method: IntegrationMethod::Rk4,
                    substeps: 1,
                },
            )
            .expect("rk4");
        for traj in [&coarse, &fine, &rk4] {
            let total: f64 = traj.last().expect("non-empty").iter().sum();
            assert!((total - 1e6).abs() < 1e-3);
        }
        assert_ne!(coarse.states, fine.states);
        let zero_substeps = IntegrationSettings {
            method: IntegrationMethod::Euler,
            substeps: 0,
        };
        assert!(model.integrate_with(&days, None, zero_substeps).is_err());
    }

    #[test]
    fn rename_and_names() {
        let mut model = simple_sir(2.0, 0.5, 100.0);
        assert_eq!(model.names(), vec!["Susceptible", "Infected", "Removed"]);
        model.rename(["S", "I", "R"]).expect("three names");
        assert_eq!(model.names(), vec!["S", "I", "R"]);
        assert!(model.rename(["S"]).is_err());
    }

    #[test]
    fn save_and_load_reproduce_trajectory() {
        let mut model = tutorial_sir();
        model.compile(false).expect("valid model");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tutorial.epi");
        model.save(&path).expect("save");

        let mut loaded = Model::load(&path).expect("load");
        assert!(loaded.is_compiled());
        assert_eq!(loaded.version(), crate::VERSION);

        let days = TimeFrame::days(80).points();
        let a = model.integrate(&days, None).expect("saved model");
        let b = loaded.integrate(&days, None).expect("loaded");
        for (x, y) in a.states.iter().flatten().zip(b.states.iter().flatten()) {
            assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }

    #[test]
    fn saving_requires_compiled_serializable_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.epi");

        let model = tutorial_sir();
        assert!(matches!(model.save(&path), Err(EpiError::NotCompiled)));

        let mut matrix = transfer_matrix(3);
        matrix[1][2] = Transfer::new(1.0, crate::params::Param::function(|t| 0.1 + 0.0 * t));
        let mut model = Model::from_parts(
            100.0,
            vec![
                Compartment::susceptible(2.0, 0.5, 100.0),
                Compartment::infected(),
                Compartment::removed(),
            ],
            vec![vec![1], vec![2], vec![]],
            matrix,
        )
        .expect("lengths agree");
        model.compile(false).expect("valid model");
        assert!(matches!(model.save(&path), Err(EpiError::Json(_))));
    }

    #[test]
    fn loading_older_versions_still_compiles() {
        let model = simple_sir(2.0, 0.5, 100.0);
        let mut json: serde_json::Value =
            serde_json::from_str(&model.to_json().expect("json")).expect("value");
        json["version"] = serde_json::Value::from("2.1.0");
        let loaded = Model::from_json(&json.to_string()).expect("loads");
        assert_eq!(loaded.version(), "2.1.0");
        assert!(loaded.is_compiled());
    }

    #[test]
    fn time_frames_behave_like_ranges() {
        assert_eq!(TimeFrame::days(3).points(), vec![0.0, 1.0, 2.0]);
        let frame = TimeFrame::new(0.0, 1.0, 0.25).expect("valid");
        assert_eq!(frame.points(), vec![0.0, 0.25, 0.5, 0.75]);
        assert!(TimeFrame::new(0.0, 1.0, 0.0).is_err());
        assert!(TimeFrame::new(0.0, 1.0, -1.0).is_err());
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
