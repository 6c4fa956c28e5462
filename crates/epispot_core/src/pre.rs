//! Pre-compiled models for the classic compartmental structures.

use crate::comps::Compartment;
use crate::error::Result;
use crate::models::Model;
use crate::params::{transfer_matrix, Param, Transfer};

/// Susceptible → Infected → Removed.
pub fn sir(r_0: impl Into<Param>, gamma: impl Into<Param>, n: f64) -> Result<Model> {
    let gamma = gamma.into();
    let mut matrix = transfer_matrix(3);
    matrix[1][2] = Transfer::new(1.0, gamma.clone());

    let mut model = Model::from_parts(
        n,
        vec![
            Compartment::susceptible(r_0, gamma, n),
            Compartment::infected(),
            Compartment::removed(),
        ],
        vec![vec![1], vec![2], vec![]],
        matrix,
    )?;
    model.compile(false)?;
    Ok(model)
}

/// Susceptible → Exposed → Infected → Removed, where `delta` is the rate at
/// which exposed individuals become infectious.
pub fn seir(
    r_0: impl Into<Param>,
    gamma: impl Into<Param>,
    n: f64,
    delta: impl Into<Param>,
) -> Result<Model> {
    let gamma = gamma.into();
    let mut matrix = transfer_matrix(4);
    matrix[1][2] = Transfer::new(1.0, delta);
    matrix[2][3] = Transfer::new(1.0, gamma.clone());

    let mut model = Model::from_parts(
        n,
        vec![
            Compartment::susceptible(r_0, gamma, n),
            Compartment::exposed(),
            Compartment::infected(),
            Compartment::removed(),
        ],
        vec![vec![1], vec![2], vec![3], vec![]],
        matrix,
    )?;
    model.compile(false)?;
    Ok(model)
}

/// Susceptible → Infected → {Removed, Dead}. A fraction `alpha` of the
/// infected die at rate `rho`; the rest recover at rate `gamma`.
pub fn sird(
    r_0: impl Into<Param>,
    gamma: impl Into<Param>,
    n: f64,
    alpha: impl Into<Param>,
    rho: impl Into<Param>,
) -> Result<Model> {
    let gamma = gamma.into();
    let alpha: Param = alpha.into();
    let mut matrix = transfer_matrix(4);
    matrix[1][2] = Transfer::new(Param::constant(1.0) - alpha.clone(), gamma.clone());
    matrix[1][3] = Transfer::new(alpha, rho);

    let mut model = Model::from_parts(
        n,
        vec![
            Compartment::susceptible(r_0, gamma, n),
            Compartment::infected(),
            Compartment::removed(),
            Compartment::dead(),
        ],
        vec![vec![1], vec![2, 3], vec![], vec![]],
        matrix,
    )?;
    model.compile(false)?;
    Ok(model)
}
