//! Route request construction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channel::waypoints_arg;
use crate::config::{NavigationConfig, Profile, Units};
use crate::error::Result;
use crate::waypoint::WaypointSet;

/// A normalized directions request.
///
/// Built fresh for every route call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// (lon, lat) pairs in visiting order.
    pub coordinates: Vec<[f64; 2]>,
    pub waypoint_indices: Vec<usize>,
    pub waypoint_names: Vec<String>,
    pub profile: Profile,
    pub language: String,
    pub voice_units: Units,
    pub alternatives: bool,
    pub voice_instructions: bool,
    pub banner_instructions: bool,
    pub steps: bool,
}

pub struct RouteRequestBuilder;

impl RouteRequestBuilder {
    /// Combine a waypoint set with the current config.
    ///
    /// Pure: identical inputs always give an identical request.
    pub fn build(waypoints: &WaypointSet, config: &NavigationConfig) -> Result<RouteRequest> {
        waypoints.ensure_routable()?;

        Ok(RouteRequest {
            coordinates: waypoints.coordinates(),
            waypoint_indices: waypoints.waypoint_indices(),
            waypoint_names: waypoints.waypoint_names(),
            profile: config.profile,
            language: config.language.clone(),
            voice_units: config.units,
            alternatives: config.show_alternate_routes,
            voice_instructions: config.voice_instructions_enabled,
            banner_instructions: config.banner_instructions_enabled,
            steps: true,
        })
    }

    /// Decode a route call: its `wayPoints` plus any config keys it
    /// carries. `config` is only updated when the whole call is valid.
    pub fn from_call(
        config: &mut NavigationConfig,
        args: &Map<String, Value>,
    ) -> Result<(WaypointSet, RouteRequest)> {
        let waypoints = waypoints_arg(args)?;
        let mut next = config.clone();
        next.apply_update(args)?;
        let request = Self::build(&waypoints, &next)?;
        *config = next;
        Ok((waypoints, request))
    }
}
