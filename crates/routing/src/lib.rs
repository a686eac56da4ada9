//! `urbanpulse-routing`: one-shot route planning over geographic waypoints.

pub mod geo;
pub mod optimizer;
pub mod waypoint;

pub use geo::{EARTH_RADIUS_KM, haversine_km};
pub use optimizer::{RouteOptimizer, path_length_km};
pub use waypoint::{Route, Waypoint};
