//! Gesloten-vorm conversie tussen cartesische en cilindrische coördinaten.

use super::system::CoordinateSystem;

/// Zet `input` om van stelsel `from` naar stelsel `to`.
///
/// Alleen cartesisch ↔ cilindrisch wordt echt omgerekend. Elke combinatie met
/// [`CoordinateSystem::Undefined`] en elke combinatie van een stelsel met
/// zichzelf is een kopie.
///
/// In de oorsprong (`x = y = 0`) levert de hoek `atan2(0, 0) = 0` op; een
/// negatieve straal wordt gespiegeld doorgerekend.
#[must_use]
pub fn transform_coords(
    input: [f64; 3],
    from: CoordinateSystem,
    to: CoordinateSystem,
) -> [f64; 3] {
    match (from, to) {
        (CoordinateSystem::Cartesian, CoordinateSystem::Cylindrical) => {
            let [x, y, z] = input;
            [x.hypot(y), y.atan2(x), z]
        }
        (CoordinateSystem::Cylindrical, CoordinateSystem::Cartesian) => {
            let [r, alpha, z] = input;
            let (sin, cos) = alpha.sin_cos();
            [r * cos, r * sin, z]
        }
        _ => input,
    }
}
