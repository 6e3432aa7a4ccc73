//! Een coördinatendocument: één parameterset met benoemde coördinaten.
//!
//! ```xml
//! <Coordinates CoordSystem="0">
//!   <ParameterSet>
//!     <Parameter Type="Const" name="w" Sweep="0" value="2"/>
//!   </ParameterSet>
//!   <Coordinate name="feed" CoordSystem="1" X="w" Y="0" Z="w/2"/>
//! </Coordinates>
//! ```

use std::fmt::Write as _;

use thiserror::Error;

use crate::coords::{CoordError, CoordinateSystem, ParameterCoord};
use crate::params::{ParameterSet, SharedParameterSet, SweepMode, shared};
use crate::xml::{AttributeError, XmlElement, XmlError};

const ROOT_TAG: &str = "Coordinates";
const COORDINATE_TAG: &str = "Coordinate";
const PARAMETER_SET_TAG: &str = "ParameterSet";
const SYSTEM_ATTRIBUTE: &str = "CoordSystem";
const NAME_ATTRIBUTE: &str = "name";

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML parsefout: {0}")]
    Xml(#[from] XmlError),
    #[error("onbekend documentformaat: {0}")]
    Format(String),
    #[error("ongeldige coördinaat `{name}`: {source}")]
    Coordinate {
        name: String,
        #[source]
        source: CoordError,
    },
    #[error("coördinaat `{0}` komt meerdere keren voor")]
    DuplicateCoordinate(String),
    #[error("onbekende parameter `{0}`")]
    UnknownParameter(String),
    #[error("evaluatie mislukt:{0}")]
    Evaluation(String),
}

/// Coördinaat met naam. `own_system` is het stelsel uit het eigen
/// `CoordSystem` attribuut, of `Undefined` als het document-stelsel geldt.
#[derive(Debug, Clone)]
pub struct NamedCoord {
    pub name: String,
    pub own_system: CoordinateSystem,
    pub coord: ParameterCoord,
}

#[derive(Debug, Clone)]
pub struct CoordinateDocument {
    parameters: SharedParameterSet,
    default_system: CoordinateSystem,
    coordinates: Vec<NamedCoord>,
}

impl Default for CoordinateDocument {
    fn default() -> Self {
        Self::new(CoordinateSystem::Undefined)
    }
}

impl CoordinateDocument {
    #[must_use]
    pub fn new(default_system: CoordinateSystem) -> Self {
        Self {
            parameters: shared(ParameterSet::new()),
            default_system,
            coordinates: Vec::new(),
        }
    }

    /// Lees een document. Coördinaten worden ingelezen maar niet geëvalueerd.
    pub fn parse_str(input: &str) -> DocumentResult<Self> {
        let root = XmlElement::parse_str(input)?;
        if root.name() != ROOT_TAG {
            return Err(DocumentError::Format(format!(
                "root-element `{}` gevonden, `{ROOT_TAG}` verwacht",
                root.name()
            )));
        }

        let mut document = Self::new(read_system(&root));
        if let Some(element) = root.child(PARAMETER_SET_TAG) {
            let count = document.parameters.borrow_mut().read_xml(element);
            log::debug!("{count} parameters ingelezen");
        }

        for (index, element) in root.children_named(COORDINATE_TAG).enumerate() {
            let name = element
                .attribute(NAME_ATTRIBUTE)
                .map_or_else(|| format!("P{index}"), str::to_owned);
            let own_system = read_system(element);

            let mut coord = ParameterCoord::with_parameter_set(&document.parameters);
            coord.set_coordinate_system_or(own_system, document.default_system);
            coord
                .read_xml(Some(element))
                .map_err(|source| DocumentError::Coordinate {
                    name: name.clone(),
                    source,
                })?;
            document.push(NamedCoord {
                name,
                own_system,
                coord,
            })?;
        }

        log::debug!(
            "document ingelezen: {} coördinaten, stelsel {}",
            document.coordinates.len(),
            document.default_system
        );
        Ok(document)
    }

    /// Bouw de XML-boom. Met `parameterised` blijven expressies als tekst
    /// staan, anders worden de geëvalueerde getallen geschreven.
    #[must_use]
    pub fn to_xml_element(&self, parameterised: bool) -> XmlElement {
        let mut root = XmlElement::new(ROOT_TAG);
        if self.default_system.is_defined() {
            root.set_attribute(SYSTEM_ATTRIBUTE, self.default_system.index().to_string());
        }
        self.parameters.borrow().write_xml(&mut root);

        for named in &self.coordinates {
            let element = root.add_child(XmlElement::new(COORDINATE_TAG));
            element.set_attribute(NAME_ATTRIBUTE, named.name.as_str());
            if named.own_system.is_defined() {
                element.set_attribute(SYSTEM_ATTRIBUTE, named.own_system.index().to_string());
            }
            if let Err(error) = named.coord.write_xml(Some(element), parameterised) {
                log::warn!("coördinaat `{}` niet geschreven: {error}", named.name);
            }
        }
        root
    }

    pub fn to_xml_string(&self, parameterised: bool) -> DocumentResult<String> {
        Ok(self.to_xml_element(parameterised).to_xml_string()?)
    }

    #[must_use]
    pub fn parameters(&self) -> &SharedParameterSet {
        &self.parameters
    }

    #[must_use]
    pub fn default_system(&self) -> CoordinateSystem {
        self.default_system
    }

    #[must_use]
    pub fn coordinates(&self) -> &[NamedCoord] {
        &self.coordinates
    }

    #[must_use]
    pub fn coordinate(&self, name: &str) -> Option<&ParameterCoord> {
        self.find(name).map(|named| &named.coord)
    }

    pub fn coordinate_mut(&mut self, name: &str) -> Option<&mut ParameterCoord> {
        self.coordinates
            .iter_mut()
            .find(|named| named.name == name)
            .map(|named| &mut named.coord)
    }

    /// Voeg een coördinaat toe en koppel die aan de parameterset van dit
    /// document. Een ongedefinieerd stelsel wordt het document-stelsel.
    pub fn add_coordinate(
        &mut self,
        name: impl Into<String>,
        mut coord: ParameterCoord,
    ) -> DocumentResult<()> {
        let own_system = coord.coordinate_system();
        coord.set_parameter_set(Some(&self.parameters));
        coord.set_coordinate_system_or(own_system, self.default_system);
        self.push(NamedCoord {
            name: name.into(),
            own_system,
            coord,
        })
    }

    /// Zet een parameter en geef de werkelijk gebruikte waarde terug
    /// (lineaire parameters worden op hun raster gezet).
    pub fn set_parameter(&mut self, name: &str, value: f64) -> DocumentResult<f64> {
        let mut parameters = self.parameters.borrow_mut();
        if !parameters.set_value(name, value) {
            return Err(DocumentError::UnknownParameter(name.to_owned()));
        }
        parameters
            .find(name)
            .map(crate::params::Parameter::value)
            .ok_or_else(|| DocumentError::UnknownParameter(name.to_owned()))
    }

    /// Evalueer alle coördinaten en schrijf de meldingen achter `errors`.
    /// Elke coördinaat wordt geprobeerd, ook na een fout.
    pub fn evaluate_into(&mut self, errors: &mut String) -> bool {
        let mut ok = true;
        for named in &mut self.coordinates {
            let mut diagnostics = String::new();
            if !named.coord.evaluate_into(&mut diagnostics) {
                ok = false;
                let _ = write!(errors, "\n[{}]{diagnostics}", named.name);
            }
        }
        ok
    }

    pub fn evaluate(&mut self) -> DocumentResult<()> {
        let mut errors = String::new();
        if self.evaluate_into(&mut errors) {
            Ok(())
        } else {
            log::warn!("evaluatie van document mislukt:{errors}");
            Err(DocumentError::Evaluation(errors))
        }
    }

    /// Loop door alle sweep-posities van de parameterset en roep
    /// `on_step(stap, document)` aan na elke evaluatie. Na afloop staan de
    /// parameters weer op hun oorspronkelijke waarden. Geeft het aantal
    /// stappen terug.
    pub fn sweep<F>(&mut self, mode: SweepMode, mut on_step: F) -> DocumentResult<usize>
    where
        F: FnMut(usize, &CoordinateDocument),
    {
        self.parameters.borrow_mut().init_sweep();
        let mut step = 0;
        let outcome = loop {
            if let Err(error) = self.evaluate() {
                break Err(error);
            }
            on_step(step, self);
            step += 1;

            let advanced = self.parameters.borrow_mut().next_sweep_pos(mode);
            if !advanced {
                break Ok(step);
            }
        };
        self.parameters.borrow_mut().end_sweep();

        let restored = self.evaluate();
        let steps = outcome?;
        restored?;
        Ok(steps)
    }

    fn find(&self, name: &str) -> Option<&NamedCoord> {
        self.coordinates.iter().find(|named| named.name == name)
    }

    fn push(&mut self, named: NamedCoord) -> DocumentResult<()> {
        if self.find(&named.name).is_some() {
            return Err(DocumentError::DuplicateCoordinate(named.name));
        }
        self.coordinates.push(named);
        Ok(())
    }
}

fn read_system(element: &XmlElement) -> CoordinateSystem {
    match element.query_int_attribute(SYSTEM_ATTRIBUTE) {
        Ok(index) => CoordinateSystem::from_index(index),
        Err(AttributeError::Missing(_)) => CoordinateSystem::Undefined,
        Err(error) => {
            log::warn!("{error}; stelsel wordt genegeerd");
            CoordinateSystem::Undefined
        }
    }
}
