//! Compartments: the nodes of a compartmental model.
//!
//! A compartment on its own only knows which kinds of compartments it may
//! feed and how to compute its share of the model derivative. Strung
//! together in a [`Model`](crate::models::Model) they form the full system.

use crate::error::{EpiError, Result};
use crate::params::{Param, Transfer};
use serde::{Deserialize, Serialize};

/// Capacity limit of a Hospitalized or Critical compartment. Population
/// above `max_capacity` is moved into the compartment at index `overflow`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triage {
    pub max_capacity: f64,
    pub overflow: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompartmentKind {
    /// Individuals not yet exposed to the disease.
    Susceptible { r_0: Param, gamma: Param, n: Param },
    /// Individuals actively spreading the disease.
    Infected,
    /// Recovered and dead combined; a terminal state (may re-feed Susceptible).
    Removed,
    /// Individuals who had the infection and recovered.
    Recovered,
    /// Incubating individuals, not yet infectious.
    Exposed,
    /// Fully terminal.
    Dead,
    Hospitalized {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        triage: Option<Triage>,
    },
    /// Hospitalized and using limited resources (ICU beds, ventilators).
    Critical {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        triage: Option<Triage>,
    },
    /// User-defined compartment; bypasses connection checks.
    Custom {
        #[serde(default)]
        infectious: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompartmentRole {
    Susceptible,
    Infectious,
    Other,
}

impl CompartmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            CompartmentKind::Susceptible { .. } => "Susceptible",
            CompartmentKind::Infected => "Infected",
            CompartmentKind::Removed => "Removed",
            CompartmentKind::Recovered => "Recovered",
            CompartmentKind::Exposed => "Exposed",
            CompartmentKind::Dead => "Dead",
            CompartmentKind::Hospitalized { .. } => "Hospitalized",
            CompartmentKind::Critical { .. } => "Critical",
            CompartmentKind::Custom { .. } => "Custom",
        }
    }

    pub fn role(&self) -> CompartmentRole {
        match self {
            CompartmentKind::Susceptible { .. } => CompartmentRole::Susceptible,
            CompartmentKind::Infected | CompartmentKind::Custom { infectious: true } => {
                CompartmentRole::Infectious
            }
            _ => CompartmentRole::Other,
        }
    }

    pub fn triage(&self) -> Option<Triage> {
        match self {
            CompartmentKind::Hospitalized { triage } | CompartmentKind::Critical { triage } => {
                *triage
            }
            _ => None,
        }
    }

    /// Whether a compartment of this kind may feed one of kind `target`.
    pub fn accepts(&self, target: &CompartmentKind) -> bool {
        use CompartmentKind::*;
        match self {
            Susceptible { .. } => matches!(target, Exposed | Infected),
            Infected => matches!(
                target,
                Recovered | Hospitalized { .. } | Critical { .. } | Dead | Removed
            ),
            Removed | Recovered => matches!(target, Susceptible { .. }),
            Exposed => matches!(target, Infected),
            Dead => false,
            Hospitalized { .. } => matches!(target, Critical { .. } | Recovered | Removed | Dead),
            Critical { .. } => matches!(target, Recovered | Removed | Dead),
            Custom { .. } => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compartment {
    pub name: String,
    pub kind: CompartmentKind,
}

impl Compartment {
    pub fn new(name: impl Into<String>, kind: CompartmentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    fn of(kind: CompartmentKind) -> Self {
        Self::new(kind.label(), kind)
    }

    /// `r_0`: basic reproduction number; `gamma`: total recovery rate
    /// (one over the average infectious period); `n`: total population.
    pub fn susceptible(
        r_0: impl Into<Param>,
        gamma: impl Into<Param>,
        n: impl Into<Param>,
    ) -> Self {
        Self::of(CompartmentKind::Susceptible {
            r_0: r_0.into(),
            gamma: gamma.into(),
            n: n.into(),
        })
    }

    pub fn infected() -> Self {
        Self::of(CompartmentKind::Infected)
    }

    pub fn removed() -> Self {
        Self::of(CompartmentKind::Removed)
    }

    pub fn recovered() -> Self {
        Self::of(CompartmentKind::Recovered)
    }

    pub fn exposed() -> Self {
        Self::of(CompartmentKind::Exposed)
    }

    pub fn dead() -> Self {
        Self::of(CompartmentKind::Dead)
    }

    pub fn hospitalized(triage: Option<Triage>) -> Self {
        Self::of(CompartmentKind::Hospitalized { triage })
    }

    pub fn critical(triage: Option<Triage>) -> Self {
        Self::of(CompartmentKind::Critical { triage })
    }

    pub fn custom(name: impl Into<String>, infectious: bool) -> Self {
        Self::new(name, CompartmentKind::Custom { infectious })
    }

    pub fn role(&self) -> CompartmentRole {
        self.kind.role()
    }

    /// Validates this compartment's outgoing connections against the kinds
    /// of the compartments they point at.
    pub fn check(&self, connections: &[usize], compartments: &[Compartment]) -> Result<()> {
        if let CompartmentKind::Custom { .. } = self.kind {
            return Err(EpiError::UncheckedCustom(self.name.clone()));
        }
        for &idx in connections {
            let target = &compartments[idx];
            if !self.kind.accepts(&target.kind) {
                return Err(EpiError::InvalidConnection {
                    from: self.name.clone(),
                    target: target.name.clone(),
                });
            }
        }
        if matches!(self.kind, CompartmentKind::Susceptible { .. }) && connections.len() != 1 {
            return Err(EpiError::SusceptibleFanOut(self.name.clone()));
        }
        Ok(())
    }

    /// Writes this compartment's contribution to the model derivative into
    /// `local` (which must be zeroed and have one entry per compartment).
    ///
    /// Every flow `d` to a connection `c` is clamped so that it neither
    /// drains the target below zero nor moves more than the compartment holds.
    pub(crate) fn contribute(
        &self,
        t: f64,
        system: &[f64],
        pos: usize,
        connections: &[usize],
        row: &[Transfer],
        infectious: &[usize],
        local: &mut [f64],
    ) {
        let here = system[pos];
        let per_capita = match &self.kind {
            CompartmentKind::Susceptible { r_0, gamma, n } => {
                let infected: f64 = infectious.iter().map(|&i| system[i]).sum();
                r_0.eval(t) * gamma.eval(t) * infected / n.eval(t)
            }
            _ => 1.0,
        };

        for &c in connections {
            let mut deriv = per_capita * here * row[c].coefficient(t);
            deriv = deriv.max(-system[c]);
            deriv = deriv.min(here);
            local[c] += deriv;
            local[pos] -= deriv;
        }

        if let Some(triage) = self.kind.triage() {
            if here > triage.max_capacity {
                local[pos] = triage.max_capacity - here;
                local[triage.overflow] = -local[pos];
            }
        }
    }
}
