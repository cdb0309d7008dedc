//! Per-request planning orchestration.
//!
//! One [`Planner::plan`] call runs the whole pipeline on a static snapshot:
//! validate the request, build the escape model from the LKP, snap and
//! pre-filter the fleet, route every surviving vehicle, optimize the
//! assignment, resolve cover statuses, and derive the display geometry.
//!
//! The [`RoadGraph`] is shared read-only across requests; everything the
//! planner creates here is owned by this call.

use geo::{Distance, Haversine, Point};
use log::{debug, info};

use cordon_core::PlannerConfig;
use cordon_geom::PlanGeometry;
use cordon_graph::RoadGraph;
use cordon_model::{EscapeModel, Vehicle, VehicleStatus, find_duplicate_id};
use cordon_route::Router;
use cordon_solve::{Plan, plan_interception};

use crate::error::{PlanError, PlanResult};
use crate::stats::PlanStats;

// ── PlanOutcome ───────────────────────────────────────────────────────────────

/// Everything one planning request produces.
pub struct PlanOutcome {
    /// The resolved escape model (tree with cover statuses).
    pub model: EscapeModel,
    /// The fleet with final statuses and snapped positions.
    pub vehicles: Vec<Vehicle>,
    pub plan: Plan,
    pub geometry: PlanGeometry,
    pub stats: PlanStats,
}

// ── Planner ───────────────────────────────────────────────────────────────────

/// Stateless planning façade over a shared road graph.
pub struct Planner<'g> {
    graph: &'g RoadGraph,
    config: PlannerConfig,
}

impl<'g> Planner<'g> {
    pub fn new(graph: &'g RoadGraph, config: PlannerConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &RoadGraph {
        self.graph
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run the full pipeline for one snapshot.
    ///
    /// `time_elapsed` is seconds since the adversary was seen at `lkp`;
    /// `vehicles` carry only IDs and raw coordinates on the way in.
    pub fn plan(
        &self,
        lkp: Point<f64>,
        time_elapsed: f64,
        mut vehicles: Vec<Vehicle>,
    ) -> PlanResult<PlanOutcome> {
        if let Some(dup) = find_duplicate_id(&vehicles) {
            return Err(PlanError::InvalidInput(format!("duplicate vehicle id {dup}")));
        }

        let mut model = EscapeModel::build(self.graph, lkp, time_elapsed, &self.config)?;

        // The LKP must snap inside the operational zone.
        let anchor = model.lk_position.u();
        if !self.graph.node(anchor)?.inner {
            return Err(PlanError::InvalidInput(format!(
                "(latitude: {:.3}, longitude: {:.3}) is outside the operational zone",
                lkp.y(),
                lkp.x()
            )));
        }
        let lk_point = self.graph.pos_to_point(&model.lk_position)?;
        info!(
            "planning from {lk_point:?}, {time_elapsed:.0}s elapsed, {} vehicles",
            vehicles.len()
        );

        // Snap the fleet, exclude vehicles inside the adversary's reachable
        // disk, and route the rest.
        let router = Router::new(self.graph);
        for vehicle in &mut vehicles {
            let position = self.graph.snap(vehicle.point, true)?;
            let distance = Haversine::distance(vehicle.point, lk_point);
            if distance < self.config.max_speed_m_per_s * time_elapsed {
                debug!(
                    "vehicle {} is {distance:.0} m from the LKP and may already be passed",
                    vehicle.id
                );
                vehicle.status = VehicleStatus::TooCloseToLkp;
            } else {
                vehicle.reach = Some(router.route_from_position(position.clone(), 0.0)?);
            }
            vehicle.position = Some(position);
        }

        let plan = plan_interception(
            self.graph,
            &mut model,
            &mut vehicles,
            self.config.default_time_margin,
            &self.config,
        )?;
        model.propagate_cover();

        let geometry = PlanGeometry::derive(&model, self.graph, &self.config)?;
        let stats = PlanStats::compute(&model, &plan);

        Ok(PlanOutcome { model, vehicles, plan, geometry, stats })
    }
}
