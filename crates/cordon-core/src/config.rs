//! Planner configuration.
//!
//! One plain struct holds every tunable constant of the pipeline.  A single
//! instance is built once per process (or per test) and passed by reference;
//! nothing reads the environment at planning time.

use std::time::Duration;

/// Tunable constants of the interception pipeline.
///
/// `Default` provides the operational values; tests override individual
/// fields with struct-update syntax.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Assumed top speed of the adversary in m/s.  A vehicle closer to the
    /// LKP than `max_speed_m_per_s * time_elapsed` metres may already have
    /// been passed and is excluded from planning.
    pub max_speed_m_per_s: f64,

    /// Seconds a pursuer must arrive ahead of the adversary for an
    /// assignment to count as feasible.
    pub default_time_margin: f64,

    /// Multiplier applied to the highway rank of an escape path's last edge
    /// when scoring the nodes along that path.
    pub score_last_edge_factor: i64,

    /// Amplitude of the time-decay score component.
    pub score_time_factor: f64,

    /// Decay constant (seconds) of the time-decay score component.
    pub score_time_constant: f64,

    /// Wall-clock budget for the assignment solver.
    pub max_time_to_solve: Duration,

    /// Minimum advance (seconds) of the LKP along its edge when placing the
    /// isochrone next to the root, so a very recent sighting still yields a
    /// visible polygon.
    pub min_isochrone_time_floor: f64,

    /// Major/minor principal-axis ratio above which the isochrone polygon is
    /// widened along its minor axis.
    pub balanced_polygon_ratio_threshold: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_speed_m_per_s: 80.0 / 3.6, // 80 km/h
            default_time_margin: 30.0,
            score_last_edge_factor: 80,
            score_time_factor: 480.0,
            score_time_constant: 900.0,
            max_time_to_solve: Duration::from_secs(30),
            min_isochrone_time_floor: 10.0,
            balanced_polygon_ratio_threshold: 1.8,
        }
    }
}
