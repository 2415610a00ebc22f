//! Great-circle distance on a spherical Earth.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Result of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusCheck {
    /// Whether the user position lies within the radius (boundary inclusive).
    pub accepted: bool,
    /// Distance to the target, rounded to the nearest metre.
    pub distance_meters: u32,
}

/// Haversine distance between two coordinates, in metres.
#[must_use]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi_a = a.latitude.to_radians();
    let phi_b = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Classifies `user` as within `radius_meters` of `target`.
#[must_use]
pub fn within_radius(user: Coordinate, target: Coordinate, radius_meters: f64) -> RadiusCheck {
    let distance = distance_meters(user, target);
    RadiusCheck {
        accepted: distance <= radius_meters,
        distance_meters: round_meters(distance),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_meters(distance: f64) -> u32 {
    // Half the circumference fits comfortably in u32.
    distance.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const TARGET_LAT: f64 = 33.624_672_8;
    const TARGET_LNG: f64 = -78.957_332_7;

    fn target() -> Coordinate {
        Coordinate::new(TARGET_LAT, TARGET_LNG).unwrap()
    }

    /// A point `meters` due north of the target.
    fn north_of_target(meters: f64) -> Coordinate {
        let delta_degrees = (meters / EARTH_RADIUS_METERS).to_degrees();
        Coordinate::new(TARGET_LAT + delta_degrees, TARGET_LNG).unwrap()
    }

    #[test]
    fn test_point_ten_meters_away_is_within_twenty_five() {
        // Arrange
        let user = north_of_target(10.0);

        // Act
        let check = within_radius(user, target(), 25.0);

        // Assert
        assert!(check.accepted);
        assert_eq!(check.distance_meters, 10);
    }

    #[test]
    fn test_point_fifty_meters_away_is_outside_twenty_five() {
        // Arrange
        let user = north_of_target(50.0);

        // Act
        let check = within_radius(user, target(), 25.0);

        // Assert
        assert!(!check.accepted);
        assert_eq!(check.distance_meters, 50);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let user = north_of_target(25.0);
        let exact = distance_meters(user, target());

        let check = within_radius(user, target(), exact);

        assert!(check.accepted);
    }

    #[test]
    fn test_known_city_distance() {
        // London to Paris is roughly 343.5 km on the spherical model.
        let london = Coordinate::new(51.5074, -0.1278).unwrap();
        let paris = Coordinate::new(48.8566, 2.3522).unwrap();

        let distance = distance_meters(london, paris);

        assert!((distance - 343_500.0).abs() < 1_500.0, "got {distance}");
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 180.0).unwrap();

        let distance = distance_meters(a, b);

        assert!(distance.is_finite());
        assert!((distance - EARTH_RADIUS_METERS * std::f64::consts::PI).abs() < 1.0);
    }

    fn coordinate_strategy() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0)
            .prop_map(|(lat, lng)| Coordinate::new(lat, lng).unwrap())
    }

    proptest! {
        #[test]
        fn test_distance_is_symmetric(a in coordinate_strategy(), b in coordinate_strategy()) {
            let forward = distance_meters(a, b);
            let backward = distance_meters(b, a);
            prop_assert!((forward - backward).abs() < 1e-6);
        }

        #[test]
        fn test_distance_to_self_is_zero(a in coordinate_strategy()) {
            prop_assert_eq!(distance_meters(a, a), 0.0);
        }

        #[test]
        fn test_distance_is_non_negative_and_bounded(a in coordinate_strategy(), b in coordinate_strategy()) {
            let distance = distance_meters(a, b);
            prop_assert!(distance >= 0.0);
            prop_assert!(distance <= EARTH_RADIUS_METERS * std::f64::consts::PI + 1e-3);
        }
    }
}
