#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coords;
pub mod document;
pub mod params;
pub mod xml;

use std::fmt;

use coords::{AXIS_TAGS, CoordinateSystem};
use document::CoordinateDocument;
use params::{Parameter, ParameterKind};
use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[derive(Debug, Serialize, PartialEq)]
struct ParameterExport {
    name: String,
    value: f64,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<f64>,
    sweep: bool,
}

impl From<&Parameter> for ParameterExport {
    fn from(parameter: &Parameter) -> Self {
        let (kind, min, max, step) = match parameter.kind() {
            ParameterKind::Const => ("const", None, None, None),
            ParameterKind::Linear { min, max, step } => {
                ("linear", Some(min), Some(max), Some(step))
            }
        };
        Self {
            name: parameter.name().to_owned(),
            value: parameter.value(),
            kind,
            min,
            max,
            step,
            sweep: parameter.sweeps(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct CoordinateExport {
    name: String,
    system: CoordinateSystem,
    values: [f64; 3],
    terms: Vec<TermExport>,
}

#[derive(Debug, Serialize, PartialEq)]
struct TermExport {
    axis: &'static str,
    text: String,
    parameterised: bool,
}

/// Publiek toegangspunt voor JS.
#[wasm_bindgen]
pub struct Engine {
    initialized: bool,
    document: Option<CoordinateDocument>,
    result_dirty: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Engine {
        Engine {
            initialized: true,
            document: None,
            result_dirty: false,
        }
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Laad een coördinatendocument. Het document wordt pas bij
    /// [`Engine::evaluate`] doorgerekend.
    #[wasm_bindgen]
    pub fn load_xml(&mut self, xml: &str) -> Result<(), JsValue> {
        let document = CoordinateDocument::parse_str(xml).map_err(to_js_error)?;
        self.document = Some(document);
        self.result_dirty = true;
        Ok(())
    }

    /// Parameters van het geladen document, voor het opbouwen van een UI.
    #[wasm_bindgen]
    pub fn get_parameters(&self) -> Result<JsValue, JsValue> {
        let parameters = self.parameter_exports().map_err(|err| js_error(&err))?;
        serde_wasm_bindgen::to_value(&parameters).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Zet een parameter op naam. Lineaire parameters worden geklemd.
    #[wasm_bindgen]
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), JsValue> {
        if !value.is_finite() {
            return Err(js_error("parameterwaarde moet een eindig getal zijn"));
        }
        let Some(document) = self.document.as_mut() else {
            return Err(js_error("er is geen document geladen"));
        };
        document.set_parameter(name.trim(), value).map_err(to_js_error)?;
        self.result_dirty = true;
        Ok(())
    }

    /// Evalueer alle coördinaten. Doet niets als er sinds de laatste
    /// geslaagde evaluatie niets gewijzigd is.
    #[wasm_bindgen]
    pub fn evaluate(&mut self) -> Result<(), JsValue> {
        if !self.result_dirty {
            return Ok(());
        }
        let Some(document) = self.document.as_mut() else {
            return Err(js_error("er is geen document geladen"));
        };
        document.evaluate().map_err(to_js_error)?;
        self.result_dirty = false;
        Ok(())
    }

    /// Coördinaten in het gevraagde stelsel (`native`, `cartesian` of
    /// `cylindrical`).
    #[wasm_bindgen]
    pub fn get_coordinates(&self, system: &str) -> Result<JsValue, JsValue> {
        let coordinates = self.coordinate_exports(system).map_err(|err| js_error(&err))?;
        serde_wasm_bindgen::to_value(&coordinates).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Schrijf het document terug naar XML.
    #[wasm_bindgen]
    pub fn to_xml(&self, parameterised: bool) -> Result<String, JsValue> {
        let Some(document) = self.document.as_ref() else {
            return Err(js_error("er is geen document geladen"));
        };
        document.to_xml_string(parameterised).map_err(to_js_error)
    }
}

impl Engine {
    /// Het geladen document, als dat er is.
    #[must_use]
    pub fn document(&self) -> Option<&CoordinateDocument> {
        self.document.as_ref()
    }

    fn parameter_exports(&self) -> Result<Vec<ParameterExport>, String> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| "er is geen document geladen".to_owned())?;
        let parameters = document.parameters().borrow();
        Ok(parameters.iter().map(ParameterExport::from).collect())
    }

    fn coordinate_exports(&self, system: &str) -> Result<Vec<CoordinateExport>, String> {
        let requested = CoordinateSystem::from_name(system)
            .ok_or_else(|| format!("onbekend coördinatenstelsel `{system}`"))?;
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| "er is geen document geladen".to_owned())?;
        if self.result_dirty {
            return Err("document is nog niet geëvalueerd".to_owned());
        }

        Ok(document
            .coordinates()
            .iter()
            .map(|named| {
                let coord = &named.coord;
                let terms = AXIS_TAGS
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, axis)| {
                        coord.scalar(index).map(|scalar| TermExport {
                            axis,
                            text: scalar.value_string(),
                            parameterised: scalar.is_parameterised(),
                        })
                    })
                    .collect();
                CoordinateExport {
                    name: named.name.clone(),
                    system: requested.or(coord.coordinate_system()),
                    values: coord.coords(requested),
                    terms,
                }
            })
            .collect())
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        log::debug!("{message}");
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::{Engine, ParameterExport};
    use crate::coords::CoordinateSystem;

    const DOCUMENT: &str = r#"<Coordinates CoordSystem="1">
  <ParameterSet>
    <Parameter Type="Linear" name="r" Sweep="1" value="2" min="0" max="4" step="0.5"/>
  </ParameterSet>
  <Coordinate name="a" X="r" Y="0" Z="1"/>
</Coordinates>"#;

    #[test]
    fn exports_parameters_with_ranges() {
        let mut engine = Engine::new();
        engine.load_xml(DOCUMENT).expect("valid document");
        let exports = engine.parameter_exports().unwrap();
        assert_eq!(
            exports,
            vec![ParameterExport {
                name: "r".to_owned(),
                value: 2.0,
                kind: "linear",
                min: Some(0.0),
                max: Some(4.0),
                step: Some(0.5),
                sweep: true,
            }]
        );
    }

    #[test]
    fn coordinates_require_evaluation() {
        let mut engine = Engine::new();
        assert!(engine.coordinate_exports("native").is_err());
        engine.load_xml(DOCUMENT).unwrap();
        assert!(engine.coordinate_exports("native").is_err());

        engine.evaluate().unwrap();
        let native = engine.coordinate_exports("native").unwrap();
        assert_eq!(native[0].values, [2.0, 0.0, 1.0]);
        assert_eq!(native[0].system, CoordinateSystem::Cylindrical);
        assert_eq!(native[0].terms[0].text, "r");
        assert!(native[0].terms[0].parameterised);

        assert!(engine.coordinate_exports("polar").is_err());
    }

    #[test]
    fn parameter_changes_mark_result_dirty() {
        let mut engine = Engine::new();
        engine.load_xml(DOCUMENT).unwrap();
        engine.evaluate().unwrap();

        engine.set_parameter("r", 3.0).unwrap();
        assert!(engine.coordinate_exports("cartesian").is_err());
        engine.evaluate().unwrap();
        let cartesian = engine.coordinate_exports("cartesian").unwrap();
        assert_eq!(cartesian[0].values, [3.0, 0.0, 1.0]);

        assert!(engine.set_parameter("r", f64::NAN).is_err());
        assert!(engine.set_parameter("onbekend", 1.0).is_err());
    }
}
