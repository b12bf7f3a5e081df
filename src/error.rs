//! Error taxonomy shared across the crate.
//!
//! Every failure that crosses the method-call boundary is one of these
//! variants. `code()` gives the stable identifier the platform side
//! matches on; `Display` gives the human-readable reason.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

use crate::router::RouterFailure;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or out-of-range waypoint data, or too few waypoints.
    InvalidWaypoint(String),
    /// A recognized config key carried a value of the wrong type or an
    /// unsupported value.
    InvalidConfig { key: String, reason: String },
    /// Location permission was refused.
    PermissionDenied,
    /// The routing backend reported one or more failures.
    RouterFailure(Vec<RouterFailure>),
    /// The routing backend answered but produced no routes.
    NoRoutesFound,
    /// The route request was superseded or cancelled.
    RouteCancelled,
    NotImplemented(String),
    /// The call arguments did not have the expected shape.
    InvalidPayload(String),
    Gpx(String),
    Serialization(String),
}

impl Error {
    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code reported through the method-call surface.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidWaypoint(_) => "INVALID_WAYPOINT",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::PermissionDenied => "PERMISSION_DENIED",
            Error::RouterFailure(_) => "ROUTER_FAILURE",
            Error::NoRoutesFound => "NO_ROUTES_FOUND",
            Error::RouteCancelled => "ROUTE_CANCELLED",
            Error::NotImplemented(_) => "NOT_IMPLEMENTED",
            Error::InvalidPayload(_) => "INVALID_PAYLOAD",
            Error::Gpx(_) => "GPX_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidWaypoint(reason) => write!(f, "invalid waypoint: {reason}"),
            Error::InvalidConfig { key, reason } => {
                write!(f, "invalid value for config key '{key}': {reason}")
            }
            Error::PermissionDenied => write!(f, "location permission denied"),
            Error::RouterFailure(reasons) => {
                write!(f, "route request failed")?;
                for (i, reason) in reasons.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{reason}")?;
                }
                Ok(())
            }
            Error::NoRoutesFound => write!(f, "no routes found"),
            Error::RouteCancelled => write!(f, "route request cancelled"),
            Error::NotImplemented(what) => write!(f, "{what} is not implemented"),
            Error::InvalidPayload(reason) => write!(f, "invalid call payload: {reason}"),
            Error::Gpx(reason) => write!(f, "GPX parse error: {reason}"),
            Error::Serialization(reason) => write!(f, "JSON serialize error: {reason}"),
        }
    }
}

impl StdError for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
