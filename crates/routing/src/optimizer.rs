//! Nearest-neighbour route construction.
//!
//! Greedy and O(n²): start at the first waypoint, then repeatedly move to the closest
//! unvisited one. Not tour-optimal (no 2-opt pass); meant for bus-stop-scale inputs.

use tracing::debug;

use urbanpulse_core::{AnalyticsError, AnalyticsResult};

use crate::waypoint::{Route, Waypoint};

#[derive(Debug, Default, Copy, Clone)]
pub struct RouteOptimizer;

impl RouteOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Order `waypoints` by the nearest-neighbour heuristic.
    ///
    /// Ties go to the waypoint appearing earlier in the input, so the result is fully
    /// determined by the input order. Fewer than two waypoints are returned unchanged
    /// with zero distance; an empty input is rejected.
    pub fn route(&self, waypoints: &[Waypoint]) -> AnalyticsResult<Route> {
        if waypoints.is_empty() {
            return Err(AnalyticsError::invalid_input("route requires at least one waypoint"));
        }
        for w in waypoints {
            w.validate()?;
        }
        if waypoints.len() < 2 {
            return Ok(Route {
                waypoints: waypoints.to_vec(),
                total_distance_km: 0.0,
            });
        }

        let order = nearest_neighbour_order(waypoints);
        let ordered: Vec<Waypoint> = order.iter().map(|&i| waypoints[i].clone()).collect();
        let total_distance_km = path_length_km(&ordered);

        debug!(
            waypoints = ordered.len(),
            total_distance_km, "route optimized"
        );

        Ok(Route {
            waypoints: ordered,
            total_distance_km,
        })
    }
}

/// Visiting order as indices into `waypoints`, starting at index 0.
fn nearest_neighbour_order(waypoints: &[Waypoint]) -> Vec<usize> {
    let mut order = Vec::with_capacity(waypoints.len());
    // Kept in input order so the strict `<` below resolves ties to the earliest waypoint.
    let mut remaining: Vec<usize> = (1..waypoints.len()).collect();
    let mut current = 0;
    order.push(current);

    while !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_dist = f64::INFINITY;
        for (pos, &candidate) in remaining.iter().enumerate() {
            let d = waypoints[current].distance_km(&waypoints[candidate]);
            if d < best_dist {
                best_dist = d;
                best_pos = pos;
            }
        }
        current = remaining.remove(best_pos);
        order.push(current);
    }
    order
}

/// Sum of consecutive great-circle legs, in the given order.
pub fn path_length_km(waypoints: &[Waypoint]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| pair[0].distance_km(&pair[1]))
        .sum()
}
