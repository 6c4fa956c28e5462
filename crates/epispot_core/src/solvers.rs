use crate::traits::{DynamicalSystem, Scalar, Steppable};
use serde::{Deserialize, Serialize};

/// Converts an `f64` literal into the solver's scalar type.
fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Forward Euler solver.
///
/// This is the default integrator: epidemiological parameters are usually
/// estimated per day, and a one-day Euler step is how the classic SIR
/// tables are produced.
pub struct Euler<T: Scalar> {
    deriv: Vec<T>,
}

impl<T: Scalar> Euler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            deriv: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Euler<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.apply(*t, state, &mut self.deriv);
        for (x, dx) in state.iter_mut().zip(&self.deriv) {
            *x = *x + dt * *dx;
        }
        *t = *t + dt;
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k: [Vec<T>; 4],
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k: [vec![z; dim], vec![z; dim], vec![z; dim], vec![z; dim]],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = lit::<T>(0.5);
        let two = lit::<T>(2.0);
        let sixth = lit::<T>(1.0 / 6.0);
        let t0 = *t;
        let [k1, k2, k3, k4] = &mut self.k;

        // k1 = f(t, y)
        system.apply(t0, state, k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * k1[i];
        }
        system.apply(t0 + dt * half, &self.tmp, k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * k2[i];
        }
        system.apply(t0 + dt * half, &self.tmp, k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * k3[i];
        }
        system.apply(t0 + dt, &self.tmp, k4);

        for i in 0..state.len() {
            state[i] = state[i] + dt * sixth * (k1[i] + two * k2[i] + two * k3[i] + k4[i]);
        }

        *t = t0 + dt;
    }
}

// Tsitouras 5(4) tableau, fifth-order weights only (fixed step).
const TSIT5_C: [f64; 6] = [0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0];
const TSIT5_A: [[f64; 5]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [0.161, 0.0, 0.0, 0.0, 0.0],
    [-0.008480655492356989, 0.335480655492357, 0.0, 0.0, 0.0],
    [2.897153057105493, -6.359448489975075, 4.3622954328695815, 0.0, 0.0],
    [
        5.325864828439257,
        -11.748883564062828,
        7.4955393428898365,
        -0.09249506636175525,
        0.0,
    ],
    [
        5.86145544294642,
        -12.92096931784711,
        8.159367898576159,
        -0.071584973281401,
        -0.028269050394068383,
    ],
];
const TSIT5_B: [f64; 6] = [
    0.09646076681806523,
    0.01,
    0.4798896504144996,
    1.379008574103742,
    -3.290069515436099,
    2.324710524099774,
];

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    k: Vec<Vec<T>>,
    tmp: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k: vec![vec![T::zero(); dim]; TSIT5_B.len()],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;

        for stage in 0..TSIT5_B.len() {
            for i in 0..state.len() {
                let mut acc = T::zero();
                for (prev, &a) in TSIT5_A[stage].iter().enumerate().take(stage) {
                    acc = acc + lit::<T>(a) * self.k[prev][i];
                }
                self.tmp[i] = state[i] + dt * acc;
            }
            system.apply(t0 + lit::<T>(TSIT5_C[stage]) * dt, &self.tmp, &mut self.k[stage]);
        }

        for i in 0..state.len() {
            let mut acc = T::zero();
            for (stage, &b) in TSIT5_B.iter().enumerate() {
                acc = acc + lit::<T>(b) * self.k[stage][i];
            }
            state[i] = state[i] + dt * acc;
        }

        *t = t0 + dt;
    }
}

/// Integration scheme used by `Model::integrate_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    #[default]
    Euler,
    Rk4,
    Tsit5,
}

impl IntegrationMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "euler" => Some(Self::Euler),
            "rk4" => Some(Self::Rk4),
            "tsit5" => Some(Self::Tsit5),
            _ => None,
        }
    }

    pub(crate) fn build(self, dim: usize) -> Stepper {
        match self {
            IntegrationMethod::Euler => Stepper::Euler(Euler::new(dim)),
            IntegrationMethod::Rk4 => Stepper::Rk4(RK4::new(dim)),
            IntegrationMethod::Tsit5 => Stepper::Tsit5(Tsit5::new(dim)),
        }
    }
}

pub(crate) enum Stepper {
    Euler(Euler<f64>),
    Rk4(RK4<f64>),
    Tsit5(Tsit5<f64>),
}

impl Stepper {
    pub(crate) fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) {
        match self {
            Stepper::Euler(s) => s.step(system, t, state, dt),
            Stepper::Rk4(s) => s.step(system, t, state, dt),
            Stepper::Tsit5(s) => s.step(system, t, state, dt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    pub method: IntegrationMethod,
    /// Number of equal sub-steps taken inside every timestep.
    pub substeps: usize,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Euler,
            substeps: 1,
        }
    }
}
