//! Velvet geo crate - the distance collaborator boundary.
//!
//! Resolves the distance from a user's coordinates to a venue reference
//! (map link or address) through a distance-matrix style API, degrading
//! to a great-circle straight-line estimate when the API fails and the
//! reference carries coordinates.

pub mod distance;
pub mod fallback;

pub use distance::{
    DistanceMethod, DistanceProvider, DistanceResult, GeoError, HttpDistanceProvider,
};
pub use fallback::{extract_coordinates, haversine_meters};
