//! Guided-navigation host contract, permission gating and progress.
//!
//! The host runs turn-by-turn guidance on the platform side. Starting it
//! requires a location permission; when the permission is missing the
//! start is parked in a `PermissionFlow` until the platform reports the
//! outcome.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::config::NavigationConfig;
use crate::error::Result;
use crate::events::{EventKind, EventStream, NavigationEvent};
use crate::waypoint::WaypointSet;

/// What the host is asked to navigate.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    Waypoints(WaypointSet),
    /// Pre-built route JSON, as returned by an earlier route request.
    RouteBlob(String),
    /// Free drive: guidance without a destination.
    FreeDrive,
}

#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Called with the controller's session state locked; must not call
    /// back into the controller before returning.
    async fn start(&self, target: NavigationTarget, config: NavigationConfig) -> Result<()>;

    /// Replace the remaining stops with `waypoints`.
    async fn add_waypoints(&self, waypoints: WaypointSet) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

/// Platform services the controller needs besides the host.
pub trait Platform: Send + Sync {
    fn version(&self) -> String;

    fn has_location_permission(&self) -> bool;

    /// Ask for the permission. The answer arrives later through
    /// `NavigationController::on_permission_result`.
    fn request_location_permission(&self);
}

/// A start captured while waiting for the permission answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStart {
    pub target: NavigationTarget,
    pub config: NavigationConfig,
}

#[derive(Debug, Default)]
pub enum PermissionFlow {
    #[default]
    Idle,
    Pending(PendingStart),
}

impl PermissionFlow {
    /// Park a start. Returns true when a permission request must be
    /// issued; a start that replaces an already pending one does not
    /// ask again.
    pub fn defer(&mut self, start: PendingStart) -> bool {
        let was_idle = matches!(self, PermissionFlow::Idle);
        if !was_idle {
            debug!("replacing pending navigation start");
        }
        *self = PermissionFlow::Pending(start);
        was_idle
    }

    /// Take the parked start, returning to idle. Yields it at most once.
    pub fn resolve(&mut self) -> Option<PendingStart> {
        match std::mem::take(self) {
            PermissionFlow::Pending(start) => Some(start),
            PermissionFlow::Idle => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PermissionFlow::Pending(_))
    }
}

/// Progress reported by the host while guidance is running.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Progress {
        /// Metres.
        distance_remaining: f64,
        /// Seconds.
        duration_remaining: f64,
    },
    Running,
    Arrival,
    OffRoute,
    Rerouted { route: Value },
    FailedToReroute(String),
    Cancelled,
    Finished,
}

impl ProgressEvent {
    pub fn into_event(self) -> NavigationEvent {
        match self {
            ProgressEvent::Progress {
                distance_remaining,
                duration_remaining,
            } => NavigationEvent::with_data(
                EventKind::ProgressChange,
                json!({
                    "distanceRemaining": distance_remaining,
                    "durationRemaining": duration_remaining,
                }),
            ),
            ProgressEvent::Running => NavigationEvent::new(EventKind::NavigationRunning),
            ProgressEvent::Arrival => NavigationEvent::new(EventKind::OnArrival),
            ProgressEvent::OffRoute => NavigationEvent::new(EventKind::UserOffRoute),
            ProgressEvent::Rerouted { route } => {
                NavigationEvent::with_data(EventKind::RerouteAlong, route)
            }
            ProgressEvent::FailedToReroute(reason) => {
                NavigationEvent::with_data(EventKind::FailedToReroute, Value::String(reason))
            }
            ProgressEvent::Cancelled => NavigationEvent::new(EventKind::NavigationCancelled),
            ProgressEvent::Finished => NavigationEvent::new(EventKind::NavigationFinished),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct Remaining {
    pub distance: Option<f64>,
    pub duration: Option<f64>,
}

/// Handle given to the host for reporting progress. Cheap to clone.
#[derive(Clone)]
pub struct ProgressReporter {
    remaining: Arc<Mutex<Remaining>>,
    events: Arc<EventStream>,
}

impl ProgressReporter {
    pub(crate) fn new(remaining: Arc<Mutex<Remaining>>, events: Arc<EventStream>) -> Self {
        Self { remaining, events }
    }

    pub fn report(&self, progress: ProgressEvent) {
        if let ProgressEvent::Progress {
            distance_remaining,
            duration_remaining,
        } = progress
        {
            let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
            remaining.distance = Some(distance_remaining);
            remaining.duration = Some(duration_remaining);
        }
        self.events.emit(progress.into_event());
    }

    /// Forward an event the host produced that has no progress meaning,
    /// such as a speech announcement or a map tap.
    pub fn forward(&self, event: NavigationEvent) {
        self.events.emit(event);
    }
}
