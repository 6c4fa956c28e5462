//! Time-dependent model parameters.
//!
//! Every rate, probability and population size in a model is a [`Param`]: a
//! scalar that may vary with time. Params can be constants, expressions of
//! `t` compiled by the equation engine, arithmetic combinations of other
//! params, or native closures. All but closures survive a save/load round
//! trip.
//!
//! The [`Distribution`] type names a param and attaches citation metadata;
//! the [`r_naught`], [`gamma`] and [`population`] modules hold the common
//! presets.

use crate::equation_engine::{parse, Bytecode, Compiler, VM};
use crate::error::Result;
use rand::Rng;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

thread_local! {
    // VM stack reused by every expression evaluated on this thread.
    static STACK: RefCell<Vec<f64>> = RefCell::new(Vec::with_capacity(64));
}

/// An expression of the time `t`, with optional named constants.
#[derive(Clone, PartialEq)]
pub struct TimeExpression {
    source: String,
    constants: BTreeMap<String, f64>,
    values: Vec<f64>,
    bytecode: Bytecode,
}

impl TimeExpression {
    pub fn new(source: &str) -> Result<Self> {
        Self::with_constants(source, BTreeMap::new())
    }

    pub fn with_constants(source: &str, constants: BTreeMap<String, f64>) -> Result<Self> {
        let expr = parse(source)?;
        let names: Vec<String> = constants.keys().cloned().collect();
        let bytecode = Compiler::new(&["t".to_string()], &names).compile(&expr)?;
        let values = constants.values().copied().collect();
        Ok(Self {
            source: source.to_string(),
            constants,
            values,
            bytecode,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn constants(&self) -> &BTreeMap<String, f64> {
        &self.constants
    }

    pub fn eval(&self, t: f64) -> f64 {
        STACK.with(|stack| {
            VM::execute(&self.bytecode, &[t], &self.values, &mut stack.borrow_mut())
        })
    }
}

impl fmt::Debug for TimeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeExpression")
            .field("source", &self.source)
            .field("constants", &self.constants)
            .finish()
    }
}

/// Binary operator joining two params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamOp {
    Add,
    Sub,
    Mul,
    Div,
}

type NativeFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A scalar parameter as a function of time.
#[derive(Clone)]
pub enum Param {
    Constant(f64),
    Expression(TimeExpression),
    Combined {
        op: ParamOp,
        lhs: Box<Param>,
        rhs: Box<Param>,
    },
    /// Native closure; cannot be saved.
    Function(NativeFn),
}

impl Param {
    pub fn constant(value: f64) -> Self {
        Param::Constant(value)
    }

    /// Compiles an expression of `t`, e.g. `"2 / (1 + exp(0.1 * (t - 50)))"`.
    pub fn expression(source: &str) -> Result<Self> {
        Ok(Param::Expression(TimeExpression::new(source)?))
    }

    /// Compiles an expression of `t` that may refer to the given named constants.
    pub fn expression_with<I, S>(source: &str, constants: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let constants = constants.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Ok(Param::Expression(TimeExpression::with_constants(
            source, constants,
        )?))
    }

    pub fn function(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Param::Function(Arc::new(f))
    }

    pub fn combine(op: ParamOp, lhs: Param, rhs: Param) -> Self {
        Param::Combined {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Param::Constant(value) => *value,
            Param::Expression(expr) => expr.eval(t),
            Param::Combined { op, lhs, rhs } => {
                let (a, b) = (lhs.eval(t), rhs.eval(t));
                match op {
                    ParamOp::Add => a + b,
                    ParamOp::Sub => a - b,
                    ParamOp::Mul => a * b,
                    ParamOp::Div => a / b,
                }
            }
            Param::Function(f) => f(t),
        }
    }

    /// Whether the param (and everything it is built from) can be serialized.
    pub fn is_serializable(&self) -> bool {
        match self {
            Param::Constant(_) | Param::Expression(_) => true,
            Param::Combined { lhs, rhs, .. } => lhs.is_serializable() && rhs.is_serializable(),
            Param::Function(_) => false,
        }
    }

    fn to_repr(&self) -> std::result::Result<ParamRepr, String> {
        Ok(match self {
            Param::Constant(value) => ParamRepr::Constant(*value),
            Param::Expression(expr) => ParamRepr::Expression {
                source: expr.source.clone(),
                constants: expr.constants.clone(),
            },
            Param::Combined { op, lhs, rhs } => ParamRepr::Combined {
                op: *op,
                lhs: Box::new(lhs.to_repr()?),
                rhs: Box::new(rhs.to_repr()?),
            },
            Param::Function(_) => {
                return Err("native function parameters cannot be serialized; \
                     use a constant or an expression of `t` instead"
                    .to_string())
            }
        })
    }

    fn from_repr(repr: ParamRepr) -> Result<Self> {
        Ok(match repr {
            ParamRepr::Constant(value) => Param::Constant(value),
            ParamRepr::Expression { source, constants } => {
                Param::Expression(TimeExpression::with_constants(&source, constants)?)
            }
            ParamRepr::Combined { op, lhs, rhs } => {
                Param::combine(op, Param::from_repr(*lhs)?, Param::from_repr(*rhs)?)
            }
        })
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Constant(value) => write!(f, "Constant({value})"),
            Param::Expression(expr) => write!(f, "Expression({:?})", expr.source),
            Param::Combined { op, lhs, rhs } => write!(f, "{op:?}({lhs:?}, {rhs:?})"),
            Param::Function(_) => f.write_str("Function(<native>)"),
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Constant(value)
    }
}

impl From<TimeExpression> for Param {
    fn from(expr: TimeExpression) -> Self {
        Param::Expression(expr)
    }
}

macro_rules! param_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Param>> $trait<R> for Param {
            type Output = Param;
            fn $method(self, rhs: R) -> Param {
                Param::combine($op, self, rhs.into())
            }
        }
    };
}

param_op!(Add, add, ParamOp::Add);
param_op!(Sub, sub, ParamOp::Sub);
param_op!(Mul, mul, ParamOp::Mul);
param_op!(Div, div, ParamOp::Div);

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ParamRepr {
    Constant(f64),
    Expression {
        source: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        constants: BTreeMap<String, f64>,
    },
    Combined {
        op: ParamOp,
        lhs: Box<ParamRepr>,
        rhs: Box<ParamRepr>,
    },
}

impl Serialize for Param {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_repr()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Param {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = ParamRepr::deserialize(deserializer)?;
        Param::from_repr(repr).map_err(D::Error::custom)
    }
}

/// Probability and rate attached to one edge of the layer map.
///
/// The flow along the edge is proportional to `probability(t) * rate(t)`.
/// Entries the model never reads use the `(1, 1)` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub probability: Param,
    pub rate: Param,
}

impl Transfer {
    pub fn new(probability: impl Into<Param>, rate: impl Into<Param>) -> Self {
        Self {
            probability: probability.into(),
            rate: rate.into(),
        }
    }

    pub fn coefficient(&self, t: f64) -> f64 {
        self.probability.eval(t) * self.rate.eval(t)
    }
}

impl Default for Transfer {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// A full `n x n` transfer matrix filled with the `(1, 1)` placeholder.
pub fn transfer_matrix(n: usize) -> Vec<Vec<Transfer>> {
    vec![vec![Transfer::default(); n]; n]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Full,
    Short,
    Both,
}

/// A named parameter distribution with optional citation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub name: Option<String>,
    pub description: Option<String>,
    pub citation: Option<String>,
    pub in_text: Option<String>,
    pub param: Param,
}

impl Distribution {
    pub fn new(param: impl Into<Param>) -> Self {
        Self {
            name: None,
            description: None,
            citation: None,
            in_text: None,
            param: param.into(),
        }
    }

    pub fn named(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    pub fn cited(mut self, citation: &str, in_text: &str) -> Self {
        self.citation = Some(citation.to_string());
        self.in_text = Some(in_text.to_string());
        self
    }

    pub fn value(&self, t: f64) -> f64 {
        self.param.eval(t)
    }

    /// `value(t)` plus uniform noise of magnitude `z`.
    pub fn sample<R: Rng + ?Sized>(&self, t: f64, z: f64, rng: &mut R) -> f64 {
        self.value(t) + z * rng.gen::<f64>()
    }

    pub fn cite(&self, style: CitationStyle) -> Option<String> {
        match style {
            CitationStyle::Full => self.citation.clone(),
            CitationStyle::Short => self.in_text.clone(),
            CitationStyle::Both => match (&self.citation, &self.in_text) {
                (Some(full), Some(short)) => Some(format!("{full} ({short})")),
                _ => None,
            },
        }
    }
}

impl From<Distribution> for Param {
    fn from(dist: Distribution) -> Self {
        dist.param
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or("Unnamed Distribution"))
    }
}

/// Distributions of the basic reproduction number.
pub mod r_naught {
    use super::{Distribution, Param};
    use crate::error::Result;

    /// Reverse logistic curve `c / (1 + e^(k (t - x_0))) + y_0`: starts high and drops.
    pub fn logistic(c: f64, k: f64, x_0: f64, y_0: f64) -> Result<Distribution> {
        let param = Param::expression_with(
            "c / (1 + exp(k * (t - x_0))) + y_0",
            [("c", c), ("k", k), ("x_0", x_0), ("y_0", y_0)],
        )?;
        Ok(Distribution::new(param).named(
            "Reverse Logistic Distribution",
            "A reverse logistic distribution (starts high and then drops)",
        ))
    }

    /// Bell curve `e^(-k (t - x_0)^2) + y_0`, peaking at `x_0`.
    pub fn bell(k: f64, x_0: f64, y_0: f64) -> Result<Distribution> {
        let param = Param::expression_with(
            "exp(-k * (t - x_0)^2) + y_0",
            [("k", k), ("x_0", x_0), ("y_0", y_0)],
        )?;
        Ok(Distribution::new(param).named(
            "Bell Curve",
            "Follows the equation of a normal distribution (peaks near the center)",
        ))
    }

    /// `beta / gamma`.
    pub fn rel_beta(gamma: impl Into<Param>, beta: impl Into<Param>) -> Distribution {
        let (gamma, beta): (Param, Param) = (gamma.into(), beta.into());
        Distribution::new(beta / gamma).named(
            "Relative-β Distribution",
            "Distribution of R_0 relative to β",
        )
    }
}

/// Distributions of the total recovery rate.
pub mod gamma {
    use super::{Distribution, Param};

    /// `beta / r_0`.
    pub fn rel_beta(r_0: impl Into<Param>, beta: impl Into<Param>) -> Distribution {
        let (r_0, beta): (Param, Param) = (r_0.into(), beta.into());
        Distribution::new(beta / r_0).named(
            "Relative-β Distribution",
            "Distribution of γ relative to β",
        )
    }
}

/// Distributions of the total population.
pub mod population {
    use super::{Distribution, Param};
    use crate::error::Result;

    pub fn constant(n_0: f64) -> Distribution {
        Distribution::new(Param::constant(n_0)).named(
            "Constant-valued Population",
            "Constant population size, where death and birth rates are identical",
        )
    }

    /// `n_0 (1 + birth t - death t)`.
    pub fn linear(n_0: f64, birth: f64, death: f64) -> Result<Distribution> {
        let param = Param::expression_with(
            "n_0 * (1 + birth * t - death * t)",
            [("n_0", n_0), ("birth", birth), ("death", death)],
        )?;
        Ok(Distribution::new(param).named(
            "Linear Population Trend",
            "Linear population trend, accounting for birth and death rates",
        ))
    }
}
