//! # Event Handler Registry
//!
//! Named callbacks keyed by [`EvaluatorEventKind`]. Handlers are invoked synchronously,
//! in registration order, by [`EvaluatorMessageDispatcher::flush`](super::EvaluatorMessageDispatcher::flush).
//! A registry is usually shared by all evaluators of a driver.

use super::types::{EvaluatorEvent, EvaluatorEventKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A registered event callback
pub type EventHandler = Arc<dyn Fn(&EvaluatorEvent) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    name: String,
    handler: EventHandler,
}

/// Registry of lifecycle event handlers
#[derive(Default)]
pub struct EventHandlerRegistry {
    handlers: RwLock<HashMap<EvaluatorEventKind, Vec<Registration>>>,
    catch_all: RwLock<Vec<Registration>>,
}

impl EventHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn register<F>(&self, kind: EvaluatorEventKind, name: impl Into<String>, handler: F)
    where
        F: Fn(&EvaluatorEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        info!(handler = %name, event = kind.name(), "Registered evaluator event handler");
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Registration {
                name,
                handler: Arc::new(handler),
            });
    }

    /// Register a handler that receives every event
    pub fn register_all<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&EvaluatorEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        info!(handler = %name, "Registered catch-all evaluator event handler");
        self.catch_all.write().push(Registration {
            name,
            handler: Arc::new(handler),
        });
    }

    /// Remove every handler registered under `name`; returns how many were removed
    pub fn unregister(&self, name: &str) -> usize {
        let mut removed = 0;
        for registrations in self.handlers.write().values_mut() {
            let before = registrations.len();
            registrations.retain(|r| r.name != name);
            removed += before - registrations.len();
        }
        let mut catch_all = self.catch_all.write();
        let before = catch_all.len();
        catch_all.retain(|r| r.name != name);
        removed += before - catch_all.len();
        debug!(handler = %name, removed = removed, "Unregistered evaluator event handler");
        removed
    }

    /// Handlers for an event kind, specific ones first; snapshot taken so no lock is held
    /// while handlers run
    pub fn handlers_for(&self, kind: EvaluatorEventKind) -> Vec<(String, EventHandler)> {
        let mut result: Vec<(String, EventHandler)> = self
            .handlers
            .read()
            .get(&kind)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|r| (r.name.clone(), Arc::clone(&r.handler)))
                    .collect()
            })
            .unwrap_or_default();
        result.extend(
            self.catch_all
                .read()
                .iter()
                .map(|r| (r.name.clone(), Arc::clone(&r.handler))),
        );
        result
    }

    pub fn has_handlers(&self, kind: EvaluatorEventKind) -> bool {
        !self.catch_all.read().is_empty()
            || self
                .handlers
                .read()
                .get(&kind)
                .is_some_and(|registrations| !registrations.is_empty())
    }
}

impl std::fmt::Debug for EventHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let kinds: Vec<_> = handlers.keys().map(|k| k.name()).collect();
        f.debug_struct("EventHandlerRegistry")
            .field("kinds", &kinds)
            .field("catch_all", &self.catch_all.read().len())
            .finish()
    }
}
