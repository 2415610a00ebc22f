//! Questline — Geo Distance Utility.
//!
//! Pure functions: coordinate parsing (decimal degrees or
//! degrees-minutes-seconds), haversine distance on a spherical Earth, and the
//! "within radius" classification used by GPS verification.

pub mod coordinate;
pub mod distance;

pub use coordinate::{Coordinate, GeoError, parse_coordinate};
pub use distance::{EARTH_RADIUS_METERS, RadiusCheck, distance_meters, within_radius};
