//! Navigation configuration.
//!
//! One `NavigationConfig` lives for the whole session. Call payloads
//! are merged into it with `apply_update`: keys present in the payload
//! overwrite the current value, absent keys leave it untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::waypoint::json_type;

/// Travel mode used for route computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Profile {
    #[serde(rename = "driving-traffic")]
    #[default]
    DrivingTraffic,
    #[serde(rename = "driving")]
    Driving,
    #[serde(rename = "walking")]
    Walking,
    #[serde(rename = "cycling")]
    Cycling,
}

impl Profile {
    /// Directions API profile identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::DrivingTraffic => "driving-traffic",
            Profile::Driving => "driving",
            Profile::Walking => "walking",
            Profile::Cycling => "cycling",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "driving-traffic" => Some(Profile::DrivingTraffic),
            "driving" => Some(Profile::Driving),
            "walking" => Some(Profile::Walking),
            "cycling" => Some(Profile::Cycling),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "imperial" => Some(Units::Imperial),
            "metric" => Some(Units::Metric),
            _ => None,
        }
    }
}

/// Serializes with the same keys `apply_update` accepts, so a saved
/// config can be loaded back with `from_json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationConfig {
    #[serde(rename = "mode")]
    pub profile: Profile,
    pub units: Units,
    pub language: String,
    #[serde(rename = "alternatives")]
    pub show_alternate_routes: bool,
    pub simulate_route: bool,
    #[serde(rename = "allowsUTurnsAtWayPoints")]
    pub allows_u_turns_at_waypoints: bool,
    #[serde(rename = "enableOnMapTapCallback")]
    pub enable_on_map_tap: bool,
    pub voice_instructions_enabled: bool,
    pub banner_instructions_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_style_url_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_style_url_night: Option<String>,
    pub long_press_destination_enabled: bool,
    pub zoom: f64,
    pub bearing: f64,
    pub tilt: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            profile: Profile::DrivingTraffic,
            units: Units::Imperial,
            language: "en".to_string(),
            show_alternate_routes: true,
            simulate_route: false,
            allows_u_turns_at_waypoints: false,
            enable_on_map_tap: false,
            voice_instructions_enabled: true,
            banner_instructions_enabled: true,
            map_style_url_day: None,
            map_style_url_night: None,
            long_press_destination_enabled: true,
            zoom: 15.0,
            bearing: 0.0,
            tilt: 0.0,
        }
    }
}

impl NavigationConfig {
    /// Load a config document. Missing keys take their defaults; present
    /// keys get the same checks as a call payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| Error::invalid_config("<document>", e.to_string()))?;
        let payload = match document {
            Value::Object(payload) => payload,
            other => {
                return Err(Error::invalid_config(
                    "<document>",
                    format!("expected an object, got {}", json_type(&other)),
                ))
            }
        };
        let mut config = NavigationConfig::default();
        config.apply_update(&payload)?;
        Ok(config)
    }

    /// Merge a call payload into this config.
    ///
    /// The payload is validated completely before anything is assigned,
    /// so a failing update leaves the config unchanged. Unrecognized keys
    /// are ignored.
    pub fn apply_update(&mut self, payload: &Map<String, Value>) -> Result<()> {
        let mut next = self.clone();

        if let Some(mode) = string_key(payload, "mode")? {
            next.profile = Profile::parse(mode).ok_or_else(|| {
                Error::invalid_config(
                    "mode",
                    format!(
                        "unknown mode '{mode}', expected walking, cycling, driving \
                         or driving-traffic"
                    ),
                )
            })?;
        }
        if let Some(units) = string_key(payload, "units")? {
            next.units = Units::parse(units).ok_or_else(|| {
                Error::invalid_config(
                    "units",
                    format!("unknown units '{units}', expected imperial or metric"),
                )
            })?;
        }
        if let Some(language) = string_key(payload, "language")? {
            if language.trim().is_empty() {
                return Err(Error::invalid_config("language", "must not be empty"));
            }
            next.language = language.to_string();
        }

        assign_bool(payload, "alternatives", &mut next.show_alternate_routes)?;
        assign_bool(payload, "simulateRoute", &mut next.simulate_route)?;
        assign_bool(payload, "allowsUTurnsAtWayPoints", &mut next.allows_u_turns_at_waypoints)?;
        assign_bool(payload, "enableOnMapTapCallback", &mut next.enable_on_map_tap)?;
        assign_bool(payload, "voiceInstructionsEnabled", &mut next.voice_instructions_enabled)?;
        assign_bool(payload, "bannerInstructionsEnabled", &mut next.banner_instructions_enabled)?;
        assign_bool(
            payload,
            "longPressDestinationEnabled",
            &mut next.long_press_destination_enabled,
        )?;

        assign_style_url(payload, "mapStyleUrlDay", &mut next.map_style_url_day)?;
        assign_style_url(payload, "mapStyleUrlNight", &mut next.map_style_url_night)?;

        assign_number(payload, "zoom", &mut next.zoom)?;
        assign_number(payload, "bearing", &mut next.bearing)?;
        assign_number(payload, "tilt", &mut next.tilt)?;

        *self = next;
        Ok(())
    }
}

/// Present, non-null value for `key`. Null counts as absent.
fn present<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|v| !v.is_null())
}

fn string_key<'a>(payload: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match present(payload, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::invalid_config(
            key,
            format!("expected a string, got {}", json_type(other)),
        )),
    }
}

fn assign_bool(payload: &Map<String, Value>, key: &str, target: &mut bool) -> Result<()> {
    match present(payload, key) {
        None => Ok(()),
        Some(Value::Bool(b)) => {
            *target = *b;
            Ok(())
        }
        Some(other) => Err(Error::invalid_config(
            key,
            format!("expected a boolean, got {}", json_type(other)),
        )),
    }
}

fn assign_number(payload: &Map<String, Value>, key: &str, target: &mut f64) -> Result<()> {
    match present(payload, key) {
        None => Ok(()),
        Some(Value::Number(n)) => {
            *target = n
                .as_f64()
                .ok_or_else(|| Error::invalid_config(key, "number out of range"))?;
            Ok(())
        }
        Some(other) => Err(Error::invalid_config(
            key,
            format!("expected a number, got {}", json_type(other)),
        )),
    }
}

// Style URLs can be cleared with an explicit null.
fn assign_style_url(
    payload: &Map<String, Value>,
    key: &str,
    target: &mut Option<String>,
) -> Result<()> {
    match payload.get(key) {
        None => Ok(()),
        Some(Value::Null) => {
            *target = None;
            Ok(())
        }
        Some(Value::String(url)) => {
            *target = Some(url.clone());
            Ok(())
        }
        Some(other) => Err(Error::invalid_config(
            key,
            format!("expected a string, got {}", json_type(other)),
        )),
    }
}
