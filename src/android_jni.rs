//! JNI bindings for the Android plugin.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! Results cross the boundary as JSON envelopes: `{"ok": <value>}` or
//! `{"error": {"code": ..., "message": ...}}`. Config state lives in a
//! `BridgeSession` owned by the Kotlin side through an opaque handle.

use std::sync::Mutex;

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;
use log::error;
use serde_json::{json, Value};

use crate::channel::arguments_map;
use crate::config::NavigationConfig;
use crate::error::{Error, Result};
use crate::request::RouteRequestBuilder;

/// Config state behind a Kotlin-held handle.
#[derive(Default)]
pub struct BridgeSession {
    config: Mutex<NavigationConfig>,
}

impl BridgeSession {
    /// Merge the call's config and build a route request from its
    /// waypoints. The config is only updated when the whole call is valid.
    pub fn build_route_request(&self, args_json: &str) -> Result<Value> {
        let args = parse_arguments(args_json)?;
        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        let (_, request) = RouteRequestBuilder::from_call(&mut config, &args)?;
        Ok(serde_json::to_value(request)?)
    }

    pub fn current_config(&self) -> Result<Value> {
        let config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        Ok(serde_json::to_value(&*config)?)
    }
}

fn parse_arguments(args_json: &str) -> Result<serde_json::Map<String, Value>> {
    let args: Value =
        serde_json::from_str(args_json).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    arguments_map(&args)
}

/// Wrap a result in the JSON envelope.
pub fn envelope(result: Result<Value>) -> String {
    let value = match result {
        Ok(value) => json!({ "ok": value }),
        Err(err) => json!({ "error": { "code": err.code(), "message": err.to_string() } }),
    };
    value.to_string()
}

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

fn session<'a>(handle: jlong) -> Option<&'a BridgeSession> {
    // SAFETY: handles come from createSession and stay valid until
    // destroySession.
    unsafe { (handle as *const BridgeSession).as_ref() }
}

/// Returns the library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_initLogging(_env: JNIEnv, _class: JClass) {
    crate::logging::init();
}

/// Parse GPX bytes into a `wayPoints` payload.
/// Maps to: RustBridge.waypointsFromGpx(data: ByteArray) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_waypointsFromGpx(
    env: JNIEnv,
    _class: JClass,
    data: JByteArray,
) -> jstring {
    let result = env
        .convert_byte_array(&data)
        .map_err(|e| Error::InvalidPayload(e.to_string()))
        .and_then(|bytes| crate::gpx::parse(bytes.as_slice()))
        .map(|set| set.to_payload());
    to_jstring(&env, &envelope(result))
}

/// Maps to: RustBridge.createSession() -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_createSession(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    Box::into_raw(Box::new(BridgeSession::default())) as jlong
}

/// Maps to: RustBridge.destroySession(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_destroySession(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: the handle was produced by createSession and is not
        // used again after this call.
        drop(unsafe { Box::from_raw(handle as *mut BridgeSession) });
    }
}

/// Maps to: RustBridge.buildRouteRequest(handle: Long, args: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_buildRouteRequest(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    args: JString,
) -> jstring {
    let result = match (session(handle), env.get_string(&args)) {
        (Some(session), Ok(args)) => session.build_route_request(&String::from(args)),
        (None, _) => Err(Error::InvalidPayload("session handle is null".to_string())),
        (_, Err(e)) => Err(Error::InvalidPayload(e.to_string())),
    };
    to_jstring(&env, &envelope(result))
}

/// Maps to: RustBridge.currentConfig(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navbridge_RustBridge_currentConfig(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = match session(handle) {
        Some(session) => session.current_config(),
        None => Err(Error::InvalidPayload("session handle is null".to_string())),
    };
    to_jstring(&env, &envelope(result))
}
