//! Figure methods on `WasmModel`.

use crate::js_error;
use crate::model::WasmModel;
use anyhow::Context;
use epispot_core::plots::{self, Figure, PlotOptions};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

fn options_from(value: JsValue) -> Result<PlotOptions, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(PlotOptions::default());
    }
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid plot options: {}", e)))
}

fn options_from_json(json: &str) -> anyhow::Result<PlotOptions> {
    if json.trim().is_empty() {
        return Ok(PlotOptions::default());
    }
    serde_json::from_str(json).context("Invalid plot options")
}

impl WasmModel {
    fn figure(
        &mut self,
        timesteps: &[f64],
        mut options: PlotOptions,
        stacked: bool,
    ) -> Result<Figure, JsValue> {
        // Options without an explicit solver use the one chosen by `set_solver`.
        options.integration.get_or_insert(self.settings);
        let figure = if stacked {
            plots::stacked(&mut self.model, timesteps, &options)
        } else {
            plots::model(&mut self.model, timesteps, &options)
        };
        figure.map_err(js_error)
    }
}

#[wasm_bindgen]
impl WasmModel {
    /// Line figure; `options` may be `undefined` for the defaults.
    pub fn plot(&mut self, timesteps: &[f64], options: JsValue) -> Result<JsValue, JsValue> {
        let options = options_from(options)?;
        let figure = self.figure(timesteps, options, false)?;
        to_value(&figure).map_err(js_error)
    }

    pub fn stacked(&mut self, timesteps: &[f64], options: JsValue) -> Result<JsValue, JsValue> {
        let options = options_from(options)?;
        let figure = self.figure(timesteps, options, true)?;
        to_value(&figure).map_err(js_error)
    }

    /// CSV export of a line figure; `options_json` may be empty.
    pub fn plot_csv(&mut self, timesteps: &[f64], options_json: &str) -> Result<String, JsValue> {
        let options = options_from_json(options_json).map_err(|e| js_error(format!("{:#}", e)))?;
        let figure = self.figure(timesteps, options, false)?;
        let mut buf = Vec::new();
        figure.write_csv(&mut buf).map_err(js_error)?;
        String::from_utf8(buf).map_err(js_error)
    }
}
