//! Request and response payloads.
//!
//! The wire format follows the map client's conventions: coordinates come
//! in as `{lat, lng}` objects, geometry goes out as GeoJSON
//! FeatureCollections (which are lon/lat by definition), and `origin` is a
//! `[lat, lng]` pair.

use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::json;

use cordon_core::VehicleId;
use cordon_graph::RoadGraph;
use cordon_model::Vehicle;

use crate::error::PlanResult;
use crate::planner::PlanOutcome;
use crate::stats::PlanStats;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// A WGS-84 coordinate as the frontend sends it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    pub fn from_point(p: Point<f64>) -> Self {
        Self { lat: p.y(), lng: p.x() }
    }
}

/// One vehicle of the request fleet.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleDto {
    pub id: u32,
    pub position: LatLng,
}

/// A full planning request.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub lkp: LatLng,
    /// Seconds since the sighting; non-negative.
    pub time_elapsed: u64,
    pub vehicles: Vec<VehicleDto>,
}

impl PlanRequest {
    /// Domain vehicles for the planner.
    pub fn to_vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .map(|v| Vehicle::new(VehicleId(v.id), v.position.to_point()))
            .collect()
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Vehicle state echoed back to the client.
#[derive(Debug, Serialize)]
pub struct VehicleStateDto {
    pub id: u32,
    pub position: LatLng,
    pub status: u8,
    pub tooltip: String,
}

/// The visualization bundle.
#[derive(Debug, Serialize)]
pub struct PlanGeometryDto {
    /// Single Feature with the isochrone polygon.
    pub isochrone: Feature,
    pub past_paths: FeatureCollection,
    pub uncontrolled_paths: FeatureCollection,
    pub before_control_paths: FeatureCollection,
    pub after_control_paths: FeatureCollection,
    pub uncontrolled_escape_nodes: FeatureCollection,
    pub controlled_escape_nodes: FeatureCollection,
}

/// Everything the client needs to draw one plan.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// `[lat, lng]` of the snapped LKP.
    pub origin: [f64; 2],
    pub vehicles: Vec<VehicleStateDto>,
    /// LineString trajectories of the assignments.
    pub assignments: FeatureCollection,
    /// Point destinations of the assignments.
    pub destinations: FeatureCollection,
    pub plan_geometry: PlanGeometryDto,
    pub stats: PlanStats,
}

impl PlanResponse {
    /// Serialize a finished [`PlanOutcome`].
    pub fn from_outcome(outcome: &PlanOutcome, graph: &RoadGraph) -> PlanResult<Self> {
        let lk_point = graph.pos_to_point(&outcome.model.lk_position)?;

        let mut vehicles = Vec::with_capacity(outcome.vehicles.len());
        for vehicle in &outcome.vehicles {
            let display = match &vehicle.position {
                Some(pos) => graph.pos_to_point(pos)?,
                None => vehicle.point,
            };
            vehicles.push(VehicleStateDto {
                id: vehicle.id.0,
                position: LatLng::from_point(display),
                status: vehicle.status.as_int(),
                tooltip: format!("VID : {}", vehicle.id),
            });
        }

        let assignments = FeatureCollection {
            bbox: None,
            features: outcome
                .plan
                .assignments
                .iter()
                .map(|a| {
                    let origin_node =
                        outcome.vehicles.iter().find(|v| v.id == a.vehicle_id).and_then(|v| {
                            v.position.as_ref().map(|p| p.u().0)
                        });
                    feature(
                        Geometry::new((&a.trajectory).into()),
                        props(&[
                            ("vid", json!(a.vehicle_id.0)),
                            ("origin", json!(origin_node)),
                            ("destination", json!(a.destination_node.0)),
                            ("travel_time", json!(a.time_to_dest)),
                            ("exp_waiting_time", json!(a.adv_time_to_dest - a.time_to_dest)),
                            ("score", json!(a.score)),
                        ]),
                    )
                })
                .collect(),
            foreign_members: None,
        };

        let destinations = FeatureCollection {
            bbox: None,
            features: outcome
                .plan
                .assignments
                .iter()
                .map(|a| {
                    feature(
                        Geometry::new((&a.destination_point).into()),
                        props(&[("vid", json!(a.vehicle_id.0))]),
                    )
                })
                .collect(),
            foreign_members: None,
        };

        let geometry = &outcome.geometry;
        let plan_geometry = PlanGeometryDto {
            isochrone: feature(Geometry::new((&geometry.isochrone).into()), JsonObject::new()),
            past_paths: lines_collection(&geometry.past_paths),
            uncontrolled_paths: lines_collection(&geometry.uncontrolled_paths),
            before_control_paths: lines_collection(&geometry.before_control_paths),
            after_control_paths: lines_collection(&geometry.after_control_paths),
            uncontrolled_escape_nodes: nodes_collection(&geometry.uncovered_escape_nodes),
            controlled_escape_nodes: nodes_collection(&geometry.covered_escape_nodes),
        };

        Ok(Self {
            origin: [lk_point.y(), lk_point.x()],
            vehicles,
            assignments,
            destinations,
            plan_geometry,
            stats: outcome.stats.clone(),
        })
    }
}

// ── GeoJSON helpers ───────────────────────────────────────────────────────────

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn props(entries: &[(&str, serde_json::Value)]) -> JsonObject {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn lines_collection(lines: &[geo::LineString<f64>]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: lines
            .iter()
            .map(|l| feature(Geometry::new(l.into()), JsonObject::new()))
            .collect(),
        foreign_members: None,
    }
}

fn nodes_collection(nodes: &[(cordon_core::NodeId, Point<f64>)]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: nodes
            .iter()
            .map(|(id, p)| feature(Geometry::new(p.into()), props(&[("osmid", json!(id.0))])))
            .collect(),
        foreign_members: None,
    }
}
