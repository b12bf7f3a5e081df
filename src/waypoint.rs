//! Waypoints and the ordered waypoint set.
//!
//! A `WaypointSet` keeps stops in visiting order and derives the three
//! aligned sequences a directions request needs: coordinates, the
//! indices of announced stops, and the names of those stops. All
//! coordinates are WGS84 degrees.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A single named stop.
///
/// Silent waypoints are passed through without a voice or banner
/// announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaypoint")]
pub struct Waypoint {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "IsSilent")]
    is_silent: bool,
}

impl Waypoint {
    /// Create a waypoint, rejecting non-finite or out-of-range coordinates.
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        is_silent: bool,
    ) -> Result<Self> {
        let waypoint = Waypoint {
            name: name.into(),
            latitude,
            longitude,
            is_silent,
        };
        waypoint.validate()?;
        Ok(waypoint)
    }

    fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidWaypoint(format!(
                "latitude {} of '{}' is outside [-90, 90]",
                self.latitude, self.name
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidWaypoint(format!(
                "longitude {} of '{}' is outside [-180, 180]",
                self.longitude, self.name
            )));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn is_silent(&self) -> bool {
        self.is_silent
    }

    /// Coordinate in routing-engine order: (lon, lat).
    pub fn coordinate(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Wire form of a waypoint before range checks.
#[derive(Deserialize)]
struct RawWaypoint {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "IsSilent", default)]
    is_silent: bool,
}

impl TryFrom<RawWaypoint> for Waypoint {
    type Error = Error;

    fn try_from(raw: RawWaypoint) -> Result<Self> {
        Waypoint::new(raw.name, raw.latitude, raw.longitude, raw.is_silent)
    }
}

/// Ordered collection of waypoints; insertion order is visiting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointSet {
    waypoints: Vec<Waypoint>,
}

impl WaypointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a waypoint. Duplicates are kept.
    pub fn add(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn extend(&mut self, other: WaypointSet) {
        self.waypoints.extend(other.waypoints);
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Fail unless the set can describe a route (start and end).
    pub fn ensure_routable(&self) -> Result<()> {
        if self.waypoints.len() < 2 {
            return Err(Error::InvalidWaypoint(format!(
                "a route needs at least 2 waypoints, got {}",
                self.waypoints.len()
            )));
        }
        Ok(())
    }

    /// All coordinates as (lon, lat) pairs, in order.
    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        self.waypoints.iter().map(Waypoint::coordinate).collect()
    }

    /// Positions of announced stops.
    ///
    /// The first and last entries always count as stops, even when
    /// flagged silent.
    pub fn waypoint_indices(&self) -> Vec<usize> {
        (0..self.waypoints.len())
            .filter(|&i| self.is_stop(i))
            .collect()
    }

    /// Names of announced stops, aligned with `waypoint_indices`.
    pub fn waypoint_names(&self) -> Vec<String> {
        self.waypoints
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_stop(*i))
            .map(|(_, wp)| wp.name.clone())
            .collect()
    }

    fn is_stop(&self, index: usize) -> bool {
        let last = self.waypoints.len().saturating_sub(1);
        index == 0 || index == last || !self.waypoints[index].is_silent
    }

    /// Decode the call payload shape: a mapping of index to waypoint
    /// object, or a plain array. Map entries are ordered by their
    /// integer key, not by document order.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let entries: Vec<&Value> = match payload {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => {
                let mut keyed = map
                    .iter()
                    .map(|(key, value)| {
                        key.trim()
                            .parse::<u64>()
                            .map(|index| (index, value))
                            .map_err(|_| {
                                Error::InvalidWaypoint(format!(
                                    "waypoint key '{key}' is not an index"
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                keyed.sort_by_key(|(index, _)| *index);
                if let Some(pair) = keyed.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                    return Err(Error::InvalidWaypoint(format!(
                        "waypoint index {} appears more than once",
                        pair[0].0
                    )));
                }
                keyed.into_iter().map(|(_, value)| value).collect()
            }
            other => {
                return Err(Error::InvalidWaypoint(format!(
                    "expected a waypoint map or list, got {}",
                    json_type(other)
                )))
            }
        };

        let mut set = WaypointSet::new();
        for (position, entry) in entries.into_iter().enumerate() {
            let waypoint: Waypoint = serde_json::from_value(entry.clone())
                .map_err(|e| Error::InvalidWaypoint(format!("waypoint #{position}: {e}")))?;
            set.add(waypoint);
        }
        Ok(set)
    }

    /// Encode back into the call payload shape (index-keyed map).
    pub fn to_payload(&self) -> Value {
        let map = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(i, wp)| {
                let value = serde_json::json!({
                    "Name": wp.name,
                    "Latitude": wp.latitude,
                    "Longitude": wp.longitude,
                    "IsSilent": wp.is_silent,
                });
                (i.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<Waypoint> for WaypointSet {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        WaypointSet {
            waypoints: iter.into_iter().collect(),
        }
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
