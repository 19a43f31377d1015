//! Two independent notification paths:
//!
//! * [`AppListeners`] live on each app. Listeners are fallible; a failing
//!   listener is logged and its siblings still run.
//! * [`NetworkBus`] belongs to the orchestrator and fans out
//!   [`NetworkEvent`]s. Subscribers are infallible and a panic propagates to
//!   the mutating call.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::journal::NetworkEvent;
use crate::types::AppId;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;
pub type ListenerResult = Result<(), ListenerError>;
pub type AppListener = Box<dyn Fn(&AppSignal) -> ListenerResult + Send + Sync>;
pub type NetworkSubscriber = Box<dyn Fn(&NetworkEvent) + Send + Sync>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppSignal {
    pub app_id: AppId,
    pub event: String,
    pub payload: Value,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct EmitReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct AppListeners {
    by_event: HashMap<String, Vec<AppListener>>,
}

impl fmt::Debug for AppListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&String, usize)> = self
            .by_event
            .iter()
            .map(|(event, listeners)| (event, listeners.len()))
            .collect();
        counts.sort();
        f.debug_struct("AppListeners").field("events", &counts).finish()
    }
}

impl AppListeners {
    pub fn on<F>(&mut self, event: impl Into<String>, listener: F)
    where
        F: Fn(&AppSignal) -> ListenerResult + Send + Sync + 'static,
    {
        let boxed: AppListener = Box::new(listener);
        self.by_event.entry(event.into()).or_default().push(boxed);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.by_event.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Invokes every listener for `signal.event` in registration order.
    pub fn emit(&self, signal: &AppSignal) -> EmitReport {
        let mut report = EmitReport::default();
        let Some(listeners) = self.by_event.get(&signal.event) else {
            return report;
        };
        for listener in listeners {
            match listener(signal) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(
                        app = %signal.app_id,
                        event = %signal.event,
                        error = %err,
                        "app_listener.failed"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

struct Subscription {
    event: Option<String>,
    callback: NetworkSubscriber,
}

#[derive(Default)]
pub struct NetworkBus {
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for NetworkBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl NetworkBus {
    /// Subscribes to one event name, e.g. `"appsLinked"`.
    pub fn on<F>(&mut self, event: impl Into<String>, callback: F)
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.subscriptions.push(Subscription {
            event: Some(event.into()),
            callback: Box::new(callback),
        });
    }

    pub fn on_any<F>(&mut self, callback: F)
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.subscriptions.push(Subscription {
            event: None,
            callback: Box::new(callback),
        });
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn emit(&self, event: &NetworkEvent) -> usize {
        let name = event.name();
        let mut delivered = 0;
        for sub in &self.subscriptions {
            if sub.event.as_deref().map_or(true, |wanted| wanted == name) {
                (sub.callback)(event);
                delivered += 1;
            }
        }
        delivered
    }
}
