//! Model construction, integration and persistence.

use crate::js_error;
use epispot_core::pre;
use epispot_core::solvers::{IntegrationMethod, IntegrationSettings};
use epispot_core::Model;
use js_sys::{Array, Float64Array};
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct NamedTrajectory<'a> {
    names: Vec<&'a str>,
    times: Vec<f64>,
    states: Vec<Vec<f64>>,
}

#[wasm_bindgen]
pub struct WasmModel {
    pub(crate) model: Model,
    pub(crate) settings: IntegrationSettings,
}

impl WasmModel {
    fn wrap(model: Model) -> WasmModel {
        console_error_panic_hook::set_once();
        WasmModel {
            model,
            settings: IntegrationSettings::default(),
        }
    }
}

#[wasm_bindgen]
impl WasmModel {
    /// Loads a model saved as JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str) -> Result<WasmModel, JsValue> {
        let model = Model::from_json(json).map_err(js_error)?;
        Ok(WasmModel::wrap(model))
    }

    pub fn sir(r_0: f64, gamma: f64, n: f64) -> Result<WasmModel, JsValue> {
        Ok(WasmModel::wrap(pre::sir(r_0, gamma, n).map_err(js_error)?))
    }

    pub fn seir(r_0: f64, gamma: f64, n: f64, delta: f64) -> Result<WasmModel, JsValue> {
        Ok(WasmModel::wrap(
            pre::seir(r_0, gamma, n, delta).map_err(js_error)?,
        ))
    }

    pub fn sird(r_0: f64, gamma: f64, n: f64, alpha: f64, rho: f64) -> Result<WasmModel, JsValue> {
        Ok(WasmModel::wrap(
            pre::sird(r_0, gamma, n, alpha, rho).map_err(js_error)?,
        ))
    }

    /// `solver_name` is one of `euler`, `rk4` or `tsit5`.
    pub fn set_solver(&mut self, solver_name: &str, substeps: u32) -> Result<(), JsValue> {
        let method = IntegrationMethod::parse(solver_name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown solver: {}", solver_name)))?;
        if substeps == 0 {
            return Err(JsValue::from_str("substeps must be at least 1"));
        }
        self.settings = IntegrationSettings {
            method,
            substeps: substeps as usize,
        };
        Ok(())
    }

    pub fn names(&self) -> Array {
        self.model
            .names()
            .into_iter()
            .map(JsValue::from_str)
            .collect()
    }

    pub fn rename(&mut self, names: Vec<String>) -> Result<(), JsValue> {
        self.model.rename(names).map_err(js_error)
    }

    pub fn diff(&mut self, t: f64, state: &[f64]) -> Result<Float64Array, JsValue> {
        let d = self.model.diff(t, state).map_err(js_error)?;
        Ok(Float64Array::from(d.as_slice()))
    }

    /// Returns `{ names, times, states }`.
    pub fn integrate(
        &mut self,
        timesteps: &[f64],
        starting_state: Option<Vec<f64>>,
    ) -> Result<JsValue, JsValue> {
        let trajectory = self
            .model
            .integrate_with(timesteps, starting_state.as_deref(), self.settings)
            .map_err(js_error)?;
        let result = NamedTrajectory {
            names: self.model.names(),
            times: trajectory.times,
            states: trajectory.states,
        };
        to_value(&result).map_err(js_error)
    }

    pub fn to_json(&self) -> Result<String, JsValue> {
        self.model.to_json().map_err(js_error)
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::WasmModel;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn preset_round_trips_through_json() {
        let sir = WasmModel::sir(2.5, 0.5, 1e4).expect("sir");
        let json = sir.to_json().expect("json");
        let mut loaded = WasmModel::new(&json).expect("load");
        assert_eq!(loaded.names().length(), 3);
        let d = loaded.diff(0.0, &[9999.0, 1.0, 0.0]).expect("diff");
        assert_eq!(d.length(), 3);
    }

    #[wasm_bindgen_test]
    fn rejects_unknown_solver() {
        let mut sir = WasmModel::sir(2.5, 0.5, 1e4).expect("sir");
        let message = sir
            .set_solver("leapfrog", 1)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Unknown solver"));
        assert!(sir.set_solver("rk4", 4).is_ok());
    }

    #[wasm_bindgen_test]
    fn state_length_errors_reach_javascript() {
        let mut sir = WasmModel::sir(2.5, 0.5, 1e4).expect("sir");
        let message = sir
            .integrate(&[0.0, 1.0], Some(vec![1.0]))
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("3 compartments"));
    }
}
