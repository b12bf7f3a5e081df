use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use navbridge::{
    BuiltRoute, EventKind, MethodCall, MethodChannel, MethodResult, NavigationConfig,
    NavigationController, NavigationEvent, NavigationTarget, Platform, Profile, ProgressEvent,
    Result, RouteOutcome, RouteRequest, Router, RouterFailure, SessionHost, Units, WaypointSet,
};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

#[derive(Default)]
struct ScriptedRouter {
    outcomes: Mutex<VecDeque<RouteOutcome>>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl ScriptedRouter {
    fn answering(outcome: RouteOutcome) -> Arc<Self> {
        let router = ScriptedRouter::default();
        router.outcomes.lock().unwrap().push_back(outcome);
        Arc::new(router)
    }
}

#[async_trait]
impl Router for ScriptedRouter {
    async fn request_route(&self, request: RouteRequest) -> RouteOutcome {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RouteOutcome::NoRoutesFound)
    }
}

/// Never answers; signals when a request arrives.
struct StalledRouter {
    arrived: Arc<Notify>,
}

#[async_trait]
impl Router for StalledRouter {
    async fn request_route(&self, _request: RouteRequest) -> RouteOutcome {
        self.arrived.notify_one();
        std::future::pending::<RouteOutcome>().await
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HostCall {
    Start(NavigationTarget, NavigationConfig),
    AddWaypoints(WaypointSet),
    Stop,
}

#[derive(Default)]
struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionHost for RecordingHost {
    async fn start(&self, target: NavigationTarget, config: NavigationConfig) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::Start(target, config));
        Ok(())
    }

    async fn add_waypoints(&self, waypoints: WaypointSet) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::AddWaypoints(waypoints));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::Stop);
        Ok(())
    }
}

struct FakePlatform {
    granted: AtomicBool,
    requests: AtomicUsize,
}

impl FakePlatform {
    fn new(granted: bool) -> Arc<Self> {
        Arc::new(FakePlatform {
            granted: AtomicBool::new(granted),
            requests: AtomicUsize::new(0),
        })
    }
}

impl Platform for FakePlatform {
    fn version(&self) -> String {
        "Android 14".to_string()
    }

    fn has_location_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_location_permission(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Grants permission, but the first check parks its thread until the
/// test lets it go.
struct GatedPlatform {
    checks: AtomicUsize,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl Platform for GatedPlatform {
    fn version(&self) -> String {
        "Android 14".to_string()
    }

    fn has_location_permission(&self) -> bool {
        if self.checks.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
        true
    }

    fn request_location_permission(&self) {}
}

struct Fixture {
    channel: MethodChannel,
    host: Arc<RecordingHost>,
    platform: Arc<FakePlatform>,
    events: UnboundedReceiver<NavigationEvent>,
}

fn fixture(router: Arc<dyn Router>, granted: bool) -> Fixture {
    let _ = env_logger::try_init();
    let host = Arc::new(RecordingHost::default());
    let platform = FakePlatform::new(granted);
    let controller = Arc::new(NavigationController::new(
        router,
        host.clone(),
        platform.clone(),
    ));
    let events = controller.subscribe_events();
    Fixture {
        channel: MethodChannel::new(controller),
        host,
        platform,
        events,
    }
}

fn drain(events: &mut UnboundedReceiver<NavigationEvent>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.event_type);
    }
    kinds
}

fn two_stops(a: &str, b: &str) -> Value {
    json!({
        "0": {"Name": a, "Latitude": 1.0, "Longitude": 1.0, "IsSilent": false},
        "1": {"Name": b, "Latitude": 2.0, "Longitude": 2.0, "IsSilent": false}
    })
}

fn call(method: &str, arguments: Value) -> MethodCall {
    MethodCall::new(method, arguments)
}

fn error_code(result: &MethodResult) -> &str {
    match result {
        MethodResult::Error { code, .. } => code,
        other => panic!("expected an error, got {other:?}"),
    }
}

fn started_waypoint_names(call: &HostCall) -> Vec<String> {
    match call {
        HostCall::Start(NavigationTarget::Waypoints(set), _) => {
            set.iter().map(|wp| wp.name().to_string()).collect()
        }
        other => panic!("expected a waypoint start, got {other:?}"),
    }
}

#[tokio::test]
async fn route_points_resolve_with_raw_responses() {
    let router = ScriptedRouter::answering(RouteOutcome::Built(vec![BuiltRoute {
        route: json!({"distance": 1500.0}),
        response: json!({"code": "Ok", "routes": [{"distance": 1500.0}]}),
    }]));
    let mut fx = fixture(router.clone(), true);

    let result = fx
        .channel
        .handle(call("getRoutePoints", json!({"wayPoints": two_stops("A", "B")})))
        .await;

    assert_eq!(
        result,
        MethodResult::success(json!([{"code": "Ok", "routes": [{"distance": 1500.0}]}]))
    );
    assert_eq!(drain(&mut fx.events), vec![EventKind::RouteBuilding, EventKind::RouteBuilt]);

    let requests = router.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].profile, Profile::DrivingTraffic);
    assert_eq!(requests[0].coordinates, vec![[1.0, 1.0], [2.0, 2.0]]);
    assert!(requests[0].steps);
}

#[tokio::test]
async fn zero_routes_emit_built_then_no_routes_found() {
    let mut fx = fixture(ScriptedRouter::answering(RouteOutcome::Built(Vec::new())), true);

    let result = fx
        .channel
        .handle(call("getRoutePoints", json!({"wayPoints": two_stops("A", "B")})))
        .await;

    assert!(!result.is_success());
    assert_eq!(error_code(&result), "NO_ROUTES_FOUND");
    assert_eq!(
        drain(&mut fx.events),
        vec![
            EventKind::RouteBuilding,
            EventKind::RouteBuilt,
            EventKind::RouteBuildNoRoutesFound
        ]
    );
}

#[tokio::test]
async fn router_failure_fails_call_and_emits_terminal_event() {
    let mut fx = fixture(
        ScriptedRouter::answering(RouteOutcome::Failed(vec![
            RouterFailure::new("network unreachable").with_code(7),
        ])),
        true,
    );

    let result = fx
        .channel
        .handle(call("getRoutePoints", json!({"wayPoints": two_stops("A", "B")})))
        .await;

    assert_eq!(error_code(&result), "ROUTER_FAILURE");
    assert_eq!(
        drain(&mut fx.events),
        vec![EventKind::RouteBuilding, EventKind::RouteBuildFailed]
    );
}

#[tokio::test]
async fn single_waypoint_never_reaches_the_router() {
    let router = Arc::new(ScriptedRouter::default());
    let mut fx = fixture(router.clone(), true);

    let result = fx
        .channel
        .handle(call(
            "getRoutePoints",
            json!({"wayPoints": {"0": {"Name": "A", "Latitude": 1.0, "Longitude": 1.0}}}),
        ))
        .await;

    assert_eq!(error_code(&result), "INVALID_WAYPOINT");
    assert!(router.requests.lock().unwrap().is_empty());
    assert!(drain(&mut fx.events).is_empty());
}

#[tokio::test]
async fn finish_navigation_cancels_inflight_route_request() {
    let arrived = Arc::new(Notify::new());
    let mut fx = fixture(
        Arc::new(StalledRouter {
            arrived: arrived.clone(),
        }),
        true,
    );

    let pending = {
        let channel = fx.channel.clone();
        tokio::spawn(async move {
            channel
                .handle(call("getRoutePoints", json!({"wayPoints": two_stops("A", "B")})))
                .await
        })
    };
    arrived.notified().await;

    let finished = fx.channel.handle(call("finishNavigation", Value::Null)).await;
    assert!(finished.is_success());

    let result = pending.await.unwrap();
    assert_eq!(error_code(&result), "ROUTE_CANCELLED");
    assert_eq!(
        drain(&mut fx.events),
        vec![EventKind::RouteBuilding, EventKind::RouteBuildCancelled]
    );
    assert_eq!(fx.host.calls(), vec![HostCall::Stop]);
}

#[tokio::test]
async fn start_navigation_with_permission_starts_host() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);

    let result = fx
        .channel
        .handle(call(
            "startNavigation",
            json!({"wayPoints": two_stops("A", "B"), "mode": "cycling", "simulateRoute": true}),
        ))
        .await;

    assert_eq!(result, MethodResult::success(json!(true)));
    let calls = fx.host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(started_waypoint_names(&calls[0]), vec!["A", "B"]);
    match &calls[0] {
        HostCall::Start(_, config) => {
            assert_eq!(config.profile, Profile::Cycling);
            assert!(config.simulate_route);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fx.platform.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pending_permission_replays_latest_start_once() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), false);
    let controller = fx.channel.controller().clone();

    let first = fx
        .channel
        .handle(call("startNavigation", json!({"wayPoints": two_stops("A", "B")})))
        .await;
    let second = fx
        .channel
        .handle(call("startNavigation", json!({"wayPoints": two_stops("C", "D")})))
        .await;

    assert_eq!(first, MethodResult::success(json!(false)));
    assert_eq!(second, MethodResult::success(json!(false)));
    assert!(fx.host.calls().is_empty());
    assert_eq!(fx.platform.requests.load(Ordering::SeqCst), 1);
    assert!(controller.is_awaiting_permission().await);

    assert_eq!(controller.on_permission_result(true).await, Ok(true));
    assert_eq!(controller.on_permission_result(true).await, Ok(false));

    let calls = fx.host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(started_waypoint_names(&calls[0]), vec!["C", "D"]);
}

#[tokio::test]
async fn denied_permission_discards_pending_start() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), false);
    let controller = fx.channel.controller().clone();

    fx.channel
        .handle(call("startFreeDrive", json!({"language": "fr"})))
        .await;

    assert_eq!(
        controller.on_permission_result(false).await,
        Err(navbridge::Error::PermissionDenied)
    );
    assert!(!controller.is_awaiting_permission().await);
    assert_eq!(controller.on_permission_result(true).await, Ok(false));
    assert!(fx.host.calls().is_empty());
}

#[tokio::test]
async fn config_updates_accumulate_across_calls() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);
    let controller = fx.channel.controller().clone();

    fx.channel
        .handle(call(
            "startNavigation",
            json!({"wayPoints": two_stops("A", "B"), "units": "metric"}),
        ))
        .await;
    fx.channel
        .handle(call(
            "startNavigation",
            json!({"wayPoints": two_stops("A", "B"), "mode": "walking"}),
        ))
        .await;

    let config = controller.config().await;
    assert_eq!(config.units, Units::Metric);
    assert_eq!(config.profile, Profile::Walking);
    assert_eq!(config.language, "en");
}

#[tokio::test]
async fn invalid_config_fails_call_without_side_effects() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);
    let controller = fx.channel.controller().clone();

    let result = fx
        .channel
        .handle(call(
            "startNavigation",
            json!({"wayPoints": two_stops("A", "B"), "alternatives": "no"}),
        ))
        .await;

    assert_eq!(error_code(&result), "INVALID_CONFIG");
    match result {
        MethodResult::Error { details, .. } => assert_eq!(details, Some(json!("alternatives"))),
        _ => unreachable!(),
    }
    assert!(fx.host.calls().is_empty());
    assert_eq!(controller.config().await, NavigationConfig::default());
}

#[tokio::test]
async fn add_waypoints_hands_full_set_to_host() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);

    fx.channel
        .handle(call("startNavigation", json!({"wayPoints": two_stops("A", "B")})))
        .await;
    let result = fx
        .channel
        .handle(call(
            "addWayPoints",
            json!({"wayPoints": {
                "0": {"Name": "C", "Latitude": 3.0, "Longitude": 3.0, "IsSilent": true}
            }}),
        ))
        .await;

    assert!(result.is_success());
    match fx.host.calls().last() {
        Some(HostCall::AddWaypoints(set)) => {
            let names: Vec<&str> = set.iter().map(|wp| wp.name()).collect();
            assert_eq!(names, vec!["A", "B", "C"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn off_navigation_starts_with_route_blob() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);

    let result = fx
        .channel
        .handle(call("startOffNavigation", json!({"routes": "[{\"code\":\"Ok\"}]"})))
        .await;

    assert!(result.is_success());
    match &fx.host.calls()[0] {
        HostCall::Start(NavigationTarget::RouteBlob(blob), _) => {
            assert_eq!(blob, "[{\"code\":\"Ok\"}]")
        }
        other => panic!("unexpected {other:?}"),
    }

    let missing = fx.channel.handle(call("startOffNavigation", json!({}))).await;
    assert_eq!(error_code(&missing), "INVALID_PAYLOAD");
}

#[tokio::test]
async fn progress_is_cached_and_streamed() {
    let mut fx = fixture(Arc::new(ScriptedRouter::default()), true);

    let before = fx.channel.handle(call("getDistanceRemaining", Value::Null)).await;
    assert_eq!(before, MethodResult::success(Value::Null));

    let reporter = fx.channel.controller().progress_reporter();
    reporter.report(ProgressEvent::Progress {
        distance_remaining: 850.0,
        duration_remaining: 62.5,
    });
    reporter.report(ProgressEvent::Arrival);

    let distance = fx.channel.handle(call("getDistanceRemaining", Value::Null)).await;
    let duration = fx.channel.handle(call("getDurationRemaining", Value::Null)).await;
    assert_eq!(distance, MethodResult::success(json!(850.0)));
    assert_eq!(duration, MethodResult::success(json!(62.5)));
    assert_eq!(
        drain(&mut fx.events),
        vec![EventKind::ProgressChange, EventKind::OnArrival]
    );
}

#[tokio::test]
async fn stubs_and_unknown_methods() {
    let fx = fixture(Arc::new(ScriptedRouter::default()), true);

    let version = fx.channel.handle(call("getPlatformVersion", Value::Null)).await;
    assert_eq!(version, MethodResult::success(json!("Android 14")));

    let offline = fx.channel.handle(call("enableOfflineRouting", json!({}))).await;
    assert_eq!(error_code(&offline), "NOT_IMPLEMENTED");

    let unknown = fx.channel.handle(call("rerouteToMars", json!({}))).await;
    assert_eq!(unknown, MethodResult::NotImplemented);

    let bad_json = fx.channel.handle_json("{\"method\": 3}").await;
    assert_eq!(error_code(&bad_json), "INVALID_PAYLOAD");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_starts_hand_host_the_active_set() {
    let _ = env_logger::try_init();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let host = Arc::new(RecordingHost::default());
    let controller = Arc::new(NavigationController::new(
        Arc::new(ScriptedRouter::default()),
        host.clone(),
        Arc::new(GatedPlatform {
            checks: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }),
    ));
    let channel = MethodChannel::new(controller.clone());

    let first = {
        let channel = channel.clone();
        tokio::spawn(async move {
            channel
                .handle(call("startNavigation", json!({"wayPoints": two_stops("A", "B")})))
                .await
        })
    };
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let second = {
        let channel = channel.clone();
        tokio::spawn(async move {
            channel
                .handle(call("startNavigation", json!({"wayPoints": two_stops("C", "D")})))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());
    assert!(host.calls().is_empty());

    release_tx.send(()).unwrap();
    assert_eq!(first.await.unwrap(), MethodResult::success(json!(true)));
    assert_eq!(second.await.unwrap(), MethodResult::success(json!(true)));

    let calls = host.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(started_waypoint_names(&calls[0]), vec!["A", "B"]);
    assert_eq!(started_waypoint_names(&calls[1]), vec!["C", "D"]);
    let active: Vec<String> = controller
        .waypoints()
        .await
        .iter()
        .map(|wp| wp.name().to_string())
        .collect();
    assert_eq!(started_waypoint_names(&calls[1]), active);
}
