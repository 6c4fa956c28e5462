pub mod analysis;
pub mod comps;
pub mod equation_engine;
pub mod error;
pub mod estimates;
pub mod fitters;
pub mod models;
pub mod params;
pub mod plots;
pub mod pre;
pub mod solvers;
/// The `epispot_core` crate is the modelling engine behind epispot: compartmental
/// epidemiological models built as a graph of compartments and integrated over time.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (compartment ODEs), `Steppable` (Solvers).
/// - **Equation Engine**: A bytecode VM for parameters written as expressions of time.
/// - **Params / Comps / Models**: parameter functions, compartment kinds and the `Model` graph itself.
/// - **Solvers**: Fixed-step integrators (Euler, RK4, Tsit5).
/// - **Pre / Plots / Fitters**: preset models, figure data and gradient-descent fitting.
/// - **Analysis / Estimates**: case-data normalisation and literature parameter estimates.
pub mod traits;

pub use error::{EpiError, Result};
pub use models::{Model, Trajectory};

/// Written into saved models; loading a model saved by a different version warns.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
