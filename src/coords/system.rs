//! Coördinatenstelsels waarin de drie componenten van een coördinaat
//! geïnterpreteerd worden.

use std::fmt;

use serde::Serialize;

/// Interpretatie van de drie opgeslagen componenten.
///
/// De componenten worden altijd als drie losse scalars (as 0, 1 en 2)
/// opgeslagen; het stelsel bepaalt alleen hoe ze gelezen worden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CoordinateSystem {
    /// `(x, y, z)`.
    Cartesian,
    /// `(r, α, z)` met `α` in radialen.
    Cylindrical,
    /// Geen stelsel opgegeven; wordt als cartesisch behandeld.
    #[default]
    Undefined,
}

impl CoordinateSystem {
    /// Zet de numerieke XML-representatie om. Onbekende waarden worden
    /// `Undefined`.
    #[must_use]
    pub fn from_index(index: i64) -> Self {
        match index {
            0 => Self::Cartesian,
            1 => Self::Cylindrical,
            _ => Self::Undefined,
        }
    }

    /// Numerieke representatie zoals die in het `CoordSystem` attribuut staat.
    #[must_use]
    pub fn index(self) -> i64 {
        match self {
            Self::Cartesian => 0,
            Self::Cylindrical => 1,
            Self::Undefined => -1,
        }
    }

    #[must_use]
    pub fn is_defined(self) -> bool {
        self != Self::Undefined
    }

    /// Geeft `self` terug, of `fallback` wanneer `self` ongedefinieerd is.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        if self.is_defined() { self } else { fallback }
    }

    /// Parse een naam zoals die op de commandline of vanuit JS binnenkomt.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cartesian" | "cart" | "xyz" => Some(Self::Cartesian),
            "cylindrical" | "cyl" | "rz" => Some(Self::Cylindrical),
            "native" | "undefined" | "" => Some(Self::Undefined),
            _ => None,
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cartesian => "cartesian",
            Self::Cylindrical => "cylindrical",
            Self::Undefined => "undefined",
        };
        f.write_str(name)
    }
}
