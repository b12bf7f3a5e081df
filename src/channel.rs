//! Method-call surface.
//!
//! Decodes `{"method": ..., "arguments": ...}` calls from the platform
//! channel, dispatches them to the controller and encodes the answer as
//! a success value, a structured error, or "not implemented".

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controller::{NavigationController, StartOutcome};
use crate::error::{Error, Result};
use crate::waypoint::{json_type, WaypointSet};

pub const METHOD_CHANNEL: &str = "flutter_mapbox_navigation";
pub const EVENT_CHANNEL: &str = "flutter_mapbox_navigation/events";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        MethodCall {
            method: method.into(),
            arguments,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    Success {
        value: Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodResult {
    pub fn success(value: Value) -> Self {
        MethodResult::Success { value }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success { .. })
    }
}

impl From<Error> for MethodResult {
    fn from(err: Error) -> Self {
        let details = match &err {
            Error::InvalidConfig { key, .. } => Some(Value::String(key.clone())),
            Error::RouterFailure(reasons) => serde_json::to_value(reasons).ok(),
            _ => None,
        };
        MethodResult::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

impl<T: Into<Value>> From<Result<T>> for MethodResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => MethodResult::success(value.into()),
            Err(err) => err.into(),
        }
    }
}

/// Call arguments as a map. A missing argument object is an empty map.
pub fn arguments_map(arguments: &Value) -> Result<Map<String, Value>> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(Error::InvalidPayload(format!(
            "expected an argument map, got {}",
            json_type(other)
        ))),
    }
}

/// The `wayPoints` argument, decoded.
pub fn waypoints_arg(args: &Map<String, Value>) -> Result<WaypointSet> {
    match args.get("wayPoints") {
        Some(payload) if !payload.is_null() => WaypointSet::from_payload(payload),
        _ => Err(Error::InvalidWaypoint("missing 'wayPoints' argument".to_string())),
    }
}

/// The `routes` argument of an offline start: route JSON as a string.
pub fn route_blob_arg(args: &Map<String, Value>) -> Result<String> {
    match args.get("routes") {
        Some(Value::String(routes)) if !routes.trim().is_empty() => Ok(routes.clone()),
        Some(Value::String(_)) => Err(Error::InvalidPayload("'routes' is empty".to_string())),
        Some(other) => Err(Error::InvalidPayload(format!(
            "'routes' must be a string, got {}",
            json_type(other)
        ))),
        None => Err(Error::InvalidPayload("missing 'routes' argument".to_string())),
    }
}

fn start_value(outcome: StartOutcome) -> Value {
    Value::Bool(outcome == StartOutcome::Started)
}

/// Dispatches method calls to a controller.
#[derive(Clone)]
pub struct MethodChannel {
    controller: Arc<NavigationController>,
}

impl MethodChannel {
    pub fn new(controller: Arc<NavigationController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<NavigationController> {
        &self.controller
    }

    pub async fn handle_json(&self, json: &str) -> MethodResult {
        match MethodCall::from_json(json) {
            Ok(call) => self.handle(call).await,
            Err(err) => err.into(),
        }
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResult {
        debug!("method call: {}", call.method);
        let args = match arguments_map(&call.arguments) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };
        let controller = &self.controller;

        let result = match call.method.as_str() {
            "getPlatformVersion" => MethodResult::success(controller.platform_version().into()),
            "getDistanceRemaining" => MethodResult::success(controller.distance_remaining().into()),
            "getDurationRemaining" => MethodResult::success(controller.duration_remaining().into()),
            "startFreeDrive" => controller.start_free_drive(&args).await.map(start_value).into(),
            "startNavigation" => controller.start_navigation(&args).await.map(start_value).into(),
            "startOffNavigation" => controller
                .start_off_navigation(&args)
                .await
                .map(start_value)
                .into(),
            "getRoutePoints" => controller.get_route_points(&args).await.into(),
            "addWayPoints" => controller.add_waypoints(&args).await.map(|_| true).into(),
            "finishNavigation" => controller.finish_navigation().await.map(|_| true).into(),
            "enableOfflineRouting" => controller
                .enable_offline_routing(&args)
                .await
                .map(|_| Value::Null)
                .into(),
            other => {
                debug!("unknown method {other}");
                MethodResult::NotImplemented
            }
        };

        if let MethodResult::Error { code, message, .. } = &result {
            warn!("{} failed [{code}]: {message}", call.method);
        }
        result
    }
}
