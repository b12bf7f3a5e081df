//! Waypoint import from GPX 1.1 files.
//!
//! Wraps the `gpx` crate. A planned route (`<rte>`) is the preferred
//! source of stops; files without one fall back to their `<wpt>`
//! points. Tracks are recorded paths, not stop lists, and are ignored.

use std::io::Read;

use log::debug;

use crate::error::{Error, Result};
use crate::waypoint::{Waypoint, WaypointSet};

/// Parse a GPX document from any reader into a waypoint set.
pub fn parse<R: Read>(reader: R) -> Result<WaypointSet> {
    let gpx = gpx::read(reader).map_err(|e| Error::Gpx(e.to_string()))?;

    let points = match gpx.routes.iter().find(|r| !r.points.is_empty()) {
        Some(route) => {
            debug!(
                "importing route '{}' with {} points",
                route.name.as_deref().unwrap_or(""),
                route.points.len()
            );
            &route.points
        }
        None => &gpx.waypoints,
    };

    points
        .iter()
        .map(|wp| {
            Waypoint::new(
                wp.name.clone().unwrap_or_default(),
                wp.point().y(),
                wp.point().x(),
                false,
            )
        })
        .collect()
}

/// Parse GPX bytes and return the stops in the call payload shape, ready
/// to be passed back as `wayPoints`.
pub fn parse_to_payload_json(data: &[u8]) -> Result<String> {
    let set = parse(data)?;
    Ok(serde_json::to_string(&set.to_payload())?)
}
