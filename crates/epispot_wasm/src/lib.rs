//! Browser bindings for epispot models.
//!
//! `WasmModel` wraps a compiled core model; figures come back as plain JS
//! objects ready for a plotting front-end.

mod model;
mod plots;

pub use model::WasmModel;

use wasm_bindgen::JsValue;

pub(crate) fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
