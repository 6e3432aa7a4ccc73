//! Een driedimensionale coördinaat waarvan elke component een
//! [`ParameterScalar`] is.

use std::fmt;

use thiserror::Error;

use super::system::CoordinateSystem;
use super::transform::transform_coords;
use crate::params::{EvalError, ParameterScalar, SharedParameterSet};
use crate::xml::XmlElement;
use crate::xml::term::{self, DEFAULT_DELIMITER, TermError};

/// Attribuutnamen van as 0, 1 en 2.
pub const AXIS_TAGS: [&str; 3] = ["X", "Y", "Z"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error("component {0} bestaat niet (geldig: 0, 1, 2)")]
    IndexOutOfRange(usize),
    #[error("fout in component {index}: {source}")]
    Expression {
        index: usize,
        #[source]
        source: EvalError,
    },
    #[error(transparent)]
    Term(#[from] TermError),
}

/// Alle componenten die bij [`ParameterCoord::evaluate`] faalden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordEvaluationError {
    pub failures: Vec<(usize, EvalError)>,
}

impl fmt::Display for CoordEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in &self.failures {
            write!(f, "\nFout in ParameterCoord (component: {index}): {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CoordEvaluationError {}

/// Coördinaat met drie scalaire componenten en een coördinatenstelsel.
///
/// Naast de ruwe componenten worden de cartesische en cilindrische projecties
/// bijgehouden. Die worden na elke wijziging opnieuw berekend uit de laatst
/// geëvalueerde waarden, zodat lezen in elk stelsel geen goniometrie kost.
///
/// Een ongedefinieerd stelsel wordt als cartesisch gelezen: beide projecties
/// zijn dan een kopie van de ruwe waarden.
#[derive(Debug, Clone, Default)]
pub struct ParameterCoord {
    coords: [ParameterScalar; 3],
    system: CoordinateSystem,
    cartesian: [f64; 3],
    cylindrical: [f64; 3],
}

impl ParameterCoord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drie nullen, gebonden aan `parameter_set`.
    #[must_use]
    pub fn with_parameter_set(parameter_set: &SharedParameterSet) -> Self {
        Self::from_values(Some(parameter_set.clone()), [0.0; 3])
    }

    #[must_use]
    pub fn with_system(system: CoordinateSystem) -> Self {
        let mut coord = Self::new();
        coord.set_coordinate_system(system);
        coord
    }

    #[must_use]
    pub fn from_values(parameter_set: Option<SharedParameterSet>, values: [f64; 3]) -> Self {
        let mut coord = Self {
            coords: values.map(|value| ParameterScalar::with_value(parameter_set.clone(), value)),
            ..Self::default()
        };
        coord.update();
        coord
    }

    /// Componenten uit tekst, letterlijk of als expressie. De tekst blijft
    /// bewaard zoals opgegeven; waarden zijn 0 tot de eerste
    /// [`ParameterCoord::evaluate`].
    #[must_use]
    pub fn from_expressions(parameter_set: Option<SharedParameterSet>, texts: [&str; 3]) -> Self {
        let coords =
            texts.map(|text| ParameterScalar::with_expression(parameter_set.clone(), text));
        let mut coord = Self {
            coords,
            ..Self::default()
        };
        coord.update();
        coord
    }

    /// Koppel alle componenten aan een (andere) parameterset.
    pub fn set_parameter_set(&mut self, parameter_set: Option<&SharedParameterSet>) {
        for coord in &mut self.coords {
            coord.set_parameter_set(parameter_set.cloned());
        }
        self.update();
    }

    pub fn set_coordinate_system(&mut self, system: CoordinateSystem) {
        self.system = system;
        self.update();
    }

    /// Gebruik `system`, of `fallback` als `system` ongedefinieerd is.
    pub fn set_coordinate_system_or(
        &mut self,
        system: CoordinateSystem,
        fallback: CoordinateSystem,
    ) {
        self.set_coordinate_system(system.or(fallback));
    }

    #[must_use]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.system
    }

    /// Zet een letterlijke waarde. Een ongeldige index wordt genegeerd.
    pub fn set_value(&mut self, index: usize, value: f64) {
        let Some(coord) = self.coords.get_mut(index) else {
            log::debug!("set_value: component {index} bestaat niet");
            return;
        };
        coord.set_value(value);
        self.update();
    }

    /// Zet een expressie en evalueer die.
    ///
    /// De projecties worden ook na een evaluatiefout bijgewerkt; de component
    /// houdt dan zijn vorige waarde.
    pub fn set_value_str(&mut self, index: usize, text: &str) -> Result<(), CoordError> {
        let coord = self
            .coords
            .get_mut(index)
            .ok_or(CoordError::IndexOutOfRange(index))?;
        let result = coord.set_expression(text);
        self.update();
        result.map_err(|source| CoordError::Expression { index, source })
    }

    /// Laatst geëvalueerde ruwe waarde, of NaN voor een ongeldige index.
    #[must_use]
    pub fn value(&self, index: usize) -> f64 {
        self.coords.get(index).map_or(f64::NAN, ParameterScalar::value)
    }

    /// Component `index` in stelsel `system`. `Undefined` betekent het eigen
    /// stelsel van de coördinaat.
    #[must_use]
    pub fn coord_value(&self, index: usize, system: CoordinateSystem) -> f64 {
        self.coords(system).get(index).copied().unwrap_or(f64::NAN)
    }

    /// Oorspronkelijke tekst van component `index`, of `NaN`.
    #[must_use]
    pub fn value_string(&self, index: usize) -> String {
        self.coords
            .get(index)
            .map_or_else(|| f64::NAN.to_string(), ParameterScalar::value_string)
    }

    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<&ParameterScalar> {
        self.coords.get(index)
    }

    #[must_use]
    pub fn native_coords(&self) -> [f64; 3] {
        [self.value(0), self.value(1), self.value(2)]
    }

    #[must_use]
    pub fn cartesian_coords(&self) -> [f64; 3] {
        self.cartesian
    }

    #[must_use]
    pub fn cylindrical_coords(&self) -> [f64; 3] {
        self.cylindrical
    }

    /// Projectie in `system`; `Undefined` geeft de projectie van het eigen stelsel.
    #[must_use]
    pub fn coords(&self, system: CoordinateSystem) -> [f64; 3] {
        match system.or(self.system) {
            CoordinateSystem::Cylindrical => self.cylindrical,
            CoordinateSystem::Cartesian | CoordinateSystem::Undefined => self.cartesian,
        }
    }

    /// Evalueer alle drie componenten opnieuw.
    ///
    /// Alle componenten worden geprobeerd, ook na een fout. Gefaalde
    /// componenten houden hun vorige waarde.
    pub fn evaluate(&mut self) -> Result<(), CoordEvaluationError> {
        let failures: Vec<(usize, EvalError)> = self
            .coords
            .iter_mut()
            .enumerate()
            .filter_map(|(index, coord)| coord.evaluate().err().map(|error| (index, error)))
            .collect();
        self.update();

        if failures.is_empty() {
            Ok(())
        } else {
            log::debug!("{} component(en) niet te evalueren", failures.len());
            Err(CoordEvaluationError { failures })
        }
    }

    /// Als [`ParameterCoord::evaluate`], maar schrijft de foutmeldingen achter
    /// `errors` en geeft `true` bij succes.
    pub fn evaluate_into(&mut self, errors: &mut String) -> bool {
        match self.evaluate() {
            Ok(()) => true,
            Err(failure) => {
                errors.push_str(&failure.to_string());
                false
            }
        }
    }

    /// Schrijf de componenten als `X`, `Y` en `Z` attributen.
    pub fn write_xml(
        &self,
        element: Option<&mut XmlElement>,
        parameterised: bool,
    ) -> Result<(), CoordError> {
        let element = element.ok_or(TermError::MissingElement)?;
        for (coord, tag) in self.coords.iter().zip(AXIS_TAGS) {
            term::write_term(coord, element, tag, parameterised);
        }
        Ok(())
    }

    /// Lees de `X`, `Y` en `Z` attributen. Alles of niets: bij een fout blijft
    /// de coördinaat ongewijzigd.
    pub fn read_xml(&mut self, element: Option<&XmlElement>) -> Result<(), CoordError> {
        let element = element.ok_or(TermError::MissingElement)?;
        let mut staged = self.coords.clone();
        for (coord, tag) in staged.iter_mut().zip(AXIS_TAGS) {
            term::read_term(coord, element, tag)?;
        }
        self.coords = staged;
        self.update();
        Ok(())
    }

    /// Schrijf de drie componenten gescheiden door komma's in één attribuut.
    pub fn write_vector_attribute(
        &self,
        element: &mut XmlElement,
        attribute: &str,
        parameterised: bool,
    ) {
        term::write_vector_term(&self.coords, element, attribute, parameterised, DEFAULT_DELIMITER);
    }

    /// Lees een kommagescheiden vector; ontbrekende componenten worden 0.
    pub fn read_vector_attribute(
        &mut self,
        element: &XmlElement,
        attribute: &str,
    ) -> Result<(), CoordError> {
        term::read_vector_term(&mut self.coords, element, attribute, DEFAULT_DELIMITER, 0.0)?;
        self.update();
        Ok(())
    }

    fn update(&mut self) {
        let native = self.native_coords();
        self.cartesian = transform_coords(native, self.system, CoordinateSystem::Cartesian);
        self.cylindrical = transform_coords(native, self.system, CoordinateSystem::Cylindrical);
    }
}
