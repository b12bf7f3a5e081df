//! Navigation events and the outbound event stream.
//!
//! Events travel to the platform as a JSON envelope
//! `{"eventType": "<name>", "data": <payload>}`. The stream supports a
//! single subscriber; subscribing again replaces the previous one, and
//! events emitted with nobody listening are dropped.

use std::sync::Mutex;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RouteBuilding,
    RouteBuilt,
    RouteBuildCancelled,
    RouteBuildFailed,
    RouteBuildNoRoutesFound,
    ProgressChange,
    UserOffRoute,
    MilestoneEvent,
    NavigationRunning,
    NavigationCancelled,
    NavigationFinished,
    FasterRouteFound,
    SpeechAnnouncement,
    BannerInstruction,
    OnArrival,
    FailedToReroute,
    RerouteAlong,
    OnMapTap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub event_type: EventKind,
    #[serde(default)]
    pub data: Value,
}

impl NavigationEvent {
    pub fn new(event_type: EventKind) -> Self {
        NavigationEvent {
            event_type,
            data: Value::Null,
        }
    }

    pub fn with_data(event_type: EventKind, data: Value) -> Self {
        NavigationEvent { event_type, data }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Single-subscriber event stream.
#[derive(Default)]
pub struct EventStream {
    sink: Mutex<Option<UnboundedSender<NavigationEvent>>>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber, detaching any previous one.
    pub fn subscribe(&self) -> UnboundedReceiver<NavigationEvent> {
        let (tx, rx) = unbounded_channel();
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if sink.replace(tx).is_some() {
            debug!("event subscriber replaced");
        }
        rx
    }

    pub fn unsubscribe(&self) {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn has_subscriber(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver an event. Returns false when it was dropped.
    pub fn emit(&self, event: NavigationEvent) -> bool {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = sink.as_ref() else {
            trace!("no subscriber, dropping {:?}", event.event_type);
            return false;
        };
        if tx.send(event).is_err() {
            debug!("event subscriber went away");
            *sink = None;
            return false;
        }
        true
    }
}
