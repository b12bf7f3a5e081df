//! Session controller.
//!
//! Owns the navigation config and the active waypoint set for one
//! session and implements every inbound operation. Mutations go through
//! a single async mutex, so a config update never interleaves with a
//! route request reading the same state.

use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, info, warn};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

use crate::channel::{route_blob_arg, waypoints_arg};
use crate::config::NavigationConfig;
use crate::error::{Error, Result};
use crate::events::{EventKind, EventStream, NavigationEvent};
use crate::request::{RouteRequest, RouteRequestBuilder};
use crate::router::{RouteDispatcher, RouteOutcome, Router};
use crate::session::{
    NavigationTarget, PendingStart, PermissionFlow, Platform, ProgressReporter, Remaining,
    SessionHost,
};
use crate::waypoint::WaypointSet;

/// Result of a navigation start call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Parked until the location permission is answered.
    AwaitingPermission,
}

#[derive(Default)]
struct SessionState {
    config: NavigationConfig,
    waypoints: WaypointSet,
    permission: PermissionFlow,
}

pub struct NavigationController {
    state: Mutex<SessionState>,
    dispatcher: RouteDispatcher,
    host: Arc<dyn SessionHost>,
    platform: Arc<dyn Platform>,
    events: Arc<EventStream>,
    remaining: Arc<StdMutex<Remaining>>,
}

impl NavigationController {
    pub fn new(
        router: Arc<dyn Router>,
        host: Arc<dyn SessionHost>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self::with_config(NavigationConfig::default(), router, host, platform)
    }

    pub fn with_config(
        config: NavigationConfig,
        router: Arc<dyn Router>,
        host: Arc<dyn SessionHost>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                config,
                ..SessionState::default()
            }),
            dispatcher: RouteDispatcher::new(router),
            host,
            platform,
            events: Arc::new(EventStream::new()),
            remaining: Arc::new(StdMutex::new(Remaining::default())),
        }
    }

    pub fn platform_version(&self) -> String {
        self.platform.version()
    }

    /// Metres left on the current route, once the host has reported any.
    pub fn distance_remaining(&self) -> Option<f64> {
        self.remaining.lock().unwrap_or_else(|e| e.into_inner()).distance
    }

    /// Seconds left on the current route, once the host has reported any.
    pub fn duration_remaining(&self) -> Option<f64> {
        self.remaining.lock().unwrap_or_else(|e| e.into_inner()).duration
    }

    pub fn subscribe_events(&self) -> UnboundedReceiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn unsubscribe_events(&self) {
        self.events.unsubscribe();
    }

    /// Handle for the host to report guidance progress through.
    pub fn progress_reporter(&self) -> ProgressReporter {
        ProgressReporter::new(self.remaining.clone(), self.events.clone())
    }

    pub async fn config(&self) -> NavigationConfig {
        self.state.lock().await.config.clone()
    }

    pub async fn waypoints(&self) -> WaypointSet {
        self.state.lock().await.waypoints.clone()
    }

    pub async fn apply_config(&self, args: &Map<String, Value>) -> Result<()> {
        self.state.lock().await.config.apply_update(args)
    }

    /// Apply the call's config, replace the waypoint set and start
    /// guidance along it.
    pub async fn start_navigation(&self, args: &Map<String, Value>) -> Result<StartOutcome> {
        let waypoints = waypoints_arg(args)?;
        waypoints.ensure_routable()?;
        let mut state = self.state.lock().await;
        state.config.apply_update(args)?;
        state.waypoints = waypoints.clone();
        self.start_gated(&mut state, NavigationTarget::Waypoints(waypoints))
            .await
    }

    /// Start guidance without a destination.
    pub async fn start_free_drive(&self, args: &Map<String, Value>) -> Result<StartOutcome> {
        let mut state = self.state.lock().await;
        state.config.apply_update(args)?;
        state.waypoints.clear();
        self.start_gated(&mut state, NavigationTarget::FreeDrive).await
    }

    /// Start guidance along a route built earlier, passed back as JSON.
    pub async fn start_off_navigation(&self, args: &Map<String, Value>) -> Result<StartOutcome> {
        let routes = route_blob_arg(args)?;
        let mut state = self.state.lock().await;
        state.config.apply_update(args)?;
        self.start_gated(&mut state, NavigationTarget::RouteBlob(routes))
            .await
    }

    /// Start now or park the start until the permission is answered.
    ///
    /// Runs under the caller's state guard, so the permission check, the
    /// parked start and the host call see the same config and target.
    async fn start_gated(
        &self,
        state: &mut SessionState,
        target: NavigationTarget,
    ) -> Result<StartOutcome> {
        let start = PendingStart {
            target,
            config: state.config.clone(),
        };

        if self.platform.has_location_permission() {
            if state.permission.resolve().is_some() {
                debug!("dropping parked start, permission already granted");
            }
            self.begin(start).await?;
            return Ok(StartOutcome::Started);
        }

        if state.permission.defer(start) {
            info!("location permission missing, requesting it before starting");
            self.platform.request_location_permission();
        }
        Ok(StartOutcome::AwaitingPermission)
    }

    async fn begin(&self, start: PendingStart) -> Result<()> {
        debug!("starting navigation: {}", target_label(&start.target));
        self.host.start(start.target, start.config).await
    }

    /// Deliver the platform's answer to a permission request.
    ///
    /// On grant, the parked start runs exactly once; returns whether one
    /// ran. On denial the parked start is discarded and
    /// `Error::PermissionDenied` is returned.
    pub async fn on_permission_result(&self, granted: bool) -> Result<bool> {
        let mut state = self.state.lock().await;
        match (state.permission.resolve(), granted) {
            (None, _) => Ok(false),
            (Some(start), true) => {
                self.begin(start).await?;
                Ok(true)
            }
            (Some(_), false) => {
                warn!("location permission denied, navigation not started");
                Err(Error::PermissionDenied)
            }
        }
    }

    pub async fn is_awaiting_permission(&self) -> bool {
        self.state.lock().await.permission.is_pending()
    }

    /// Append stops to the active set and hand the whole set to the host.
    pub async fn add_waypoints(&self, args: &Map<String, Value>) -> Result<()> {
        let additions = waypoints_arg(args)?;
        let mut state = self.state.lock().await;
        state.waypoints.extend(additions);
        self.host.add_waypoints(state.waypoints.clone()).await
    }

    pub async fn finish_navigation(&self) -> Result<()> {
        let _ = self.state.lock().await.permission.resolve();
        self.dispatcher.cancel().await;
        self.host.stop().await
    }

    /// Apply the call's config, replace the waypoint set and build the
    /// request the router would receive.
    pub async fn prepare_route_request(&self, args: &Map<String, Value>) -> Result<RouteRequest> {
        let mut state = self.state.lock().await;
        let (waypoints, request) = RouteRequestBuilder::from_call(&mut state.config, args)?;
        state.waypoints = waypoints;
        Ok(request)
    }

    /// Compute routes for the call's waypoints.
    ///
    /// Resolves with a JSON array of raw directions responses.
    pub async fn get_route_points(&self, args: &Map<String, Value>) -> Result<Value> {
        let request = self.prepare_route_request(args).await?;
        self.request_routes(request).await
    }

    /// Send a request to the router, emitting route lifecycle events.
    pub async fn request_routes(&self, request: RouteRequest) -> Result<Value> {
        self.events.emit(NavigationEvent::new(EventKind::RouteBuilding));

        match self.dispatcher.dispatch(request).await {
            RouteOutcome::Built(routes) if !routes.is_empty() => {
                let built: Vec<Value> = routes.iter().map(|r| r.route.clone()).collect();
                self.events.emit(NavigationEvent::with_data(
                    EventKind::RouteBuilt,
                    Value::Array(built),
                ));
                info!("{} route(s) built", routes.len());
                Ok(Value::Array(routes.into_iter().map(|r| r.response).collect()))
            }
            RouteOutcome::Built(_) | RouteOutcome::NoRoutesFound => {
                self.events.emit(NavigationEvent::with_data(
                    EventKind::RouteBuilt,
                    Value::Array(Vec::new()),
                ));
                self.events
                    .emit(NavigationEvent::new(EventKind::RouteBuildNoRoutesFound));
                Err(Error::NoRoutesFound)
            }
            RouteOutcome::Cancelled => {
                self.events
                    .emit(NavigationEvent::new(EventKind::RouteBuildCancelled));
                Err(Error::RouteCancelled)
            }
            RouteOutcome::Failed(reasons) => {
                warn!("route request failed: {} reason(s)", reasons.len());
                let data = serde_json::to_value(&reasons).unwrap_or(Value::Null);
                self.events
                    .emit(NavigationEvent::with_data(EventKind::RouteBuildFailed, data));
                Err(Error::RouterFailure(reasons))
            }
        }
    }

    pub async fn enable_offline_routing(&self, _args: &Map<String, Value>) -> Result<()> {
        Err(Error::NotImplemented("offline routing".to_string()))
    }
}

fn target_label(target: &NavigationTarget) -> String {
    match target {
        NavigationTarget::Waypoints(set) => format!("{} waypoint(s)", set.len()),
        NavigationTarget::RouteBlob(blob) => format!("route blob of {} bytes", blob.len()),
        NavigationTarget::FreeDrive => "free drive".to_string(),
    }
}
