pub mod android_jni;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod gpx;
pub mod logging;
pub mod request;
pub mod router;
pub mod session;
pub mod waypoint;

pub use channel::{MethodCall, MethodChannel, MethodResult};
pub use config::{NavigationConfig, Profile, Units};
pub use controller::{NavigationController, StartOutcome};
pub use error::{Error, Result};
pub use events::{EventKind, EventStream, NavigationEvent};
pub use request::{RouteRequest, RouteRequestBuilder};
pub use router::{BuiltRoute, RouteDispatcher, RouteOutcome, Router, RouterFailure};
pub use session::{NavigationTarget, Platform, ProgressEvent, ProgressReporter, SessionHost};
pub use waypoint::{Waypoint, WaypointSet};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
