//! Routing backend contract and in-flight request tracking.
//!
//! The actual route computation lives behind the `Router` trait. The
//! `RouteDispatcher` guarantees that at most one request is in flight:
//! dispatching a new request cancels the one before it.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use crate::request::RouteRequest;

/// One reason reported by the backend for a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterFailure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl RouterFailure {
    pub fn new(message: impl Into<String>) -> Self {
        RouterFailure {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl Display for RouterFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A computed route together with the raw directions response it came
/// from. Both are opaque JSON handed through to the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRoute {
    pub route: Value,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Built(Vec<BuiltRoute>),
    NoRoutesFound,
    Cancelled,
    Failed(Vec<RouterFailure>),
}

#[async_trait]
pub trait Router: Send + Sync {
    /// Compute routes for a request. May take arbitrarily long; the
    /// future is dropped when the request is superseded.
    async fn request_route(&self, request: RouteRequest) -> RouteOutcome;
}

struct InFlight {
    id: u64,
    cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct DispatchState {
    next_id: u64,
    in_flight: Option<InFlight>,
}

pub struct RouteDispatcher {
    router: Arc<dyn Router>,
    state: Mutex<DispatchState>,
}

impl RouteDispatcher {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self {
            router,
            state: Mutex::new(DispatchState::default()),
        }
    }

    /// Run a request to completion, cancelling whatever was in flight.
    pub async fn dispatch(&self, request: RouteRequest) -> RouteOutcome {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            let previous = state.in_flight.replace(InFlight {
                id,
                cancel: cancel_tx,
            });
            if let Some(previous) = previous {
                debug!("route request {} superseded by {id}", previous.id);
                let _ = previous.cancel.send(());
            }
            id
        };

        let outcome = tokio::select! {
            outcome = self.router.request_route(request) => outcome,
            _ = cancel_rx => RouteOutcome::Cancelled,
        };

        let mut state = self.state.lock().await;
        if state.in_flight.as_ref().map(|f| f.id) == Some(id) {
            state.in_flight = None;
        }
        outcome
    }

    /// Cancel the in-flight request, if any. Returns whether one existed.
    pub async fn cancel(&self) -> bool {
        match self.state.lock().await.in_flight.take() {
            Some(in_flight) => {
                debug!("cancelling route request {}", in_flight.id);
                let _ = in_flight.cancel.send(());
                true
            }
            None => false,
        }
    }

    pub async fn is_idle(&self) -> bool {
        self.state.lock().await.in_flight.is_none()
    }
}
