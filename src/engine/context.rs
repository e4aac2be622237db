// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-flow runtime context handed to every actor.
//!
//! There are no process-wide singletons: variables, storage, callable actors,
//! the error log and the stop/pause controls of one flow live here and are
//! owned by the [`crate::engine::Flow`] that created them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::consts::FALLBACK_MAX_THREADS;
use crate::errors::{ExecutionError, FailureStrategy};
use crate::scope::{CallableRegistry, Storage, StorageScope, Variables};

/// A non-fatal error recorded while the flow kept running.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    /// Full name of the failing actor
    pub actor: String,
    pub message: String,
    /// Summary of the token that was dropped, if any
    pub token: Option<String>,
}

/// Manual fire handle of an event trigger.
#[derive(Debug, Clone)]
pub struct FireHandle {
    sender: mpsc::UnboundedSender<()>,
}

impl FireHandle {
    pub fn new(sender: mpsc::UnboundedSender<()>) -> Self {
        Self { sender }
    }

    /// Requests one run of the trigger body. `false` once the trigger stopped listening.
    pub fn fire(&self) -> bool {
        self.sender.send(()).is_ok()
    }
}

/// Runtime settings a flow is created with.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub name: String,
    pub failure_strategy: FailureStrategy,
    /// Worker count for parallel branches that do not set their own
    pub max_threads: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            name: "flow".to_string(),
            failure_strategy: FailureStrategy::default(),
            max_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_MAX_THREADS),
        }
    }
}

struct Shared {
    id: Uuid,
    settings: FlowSettings,
    callables: CallableRegistry,
    triggers: Mutex<HashMap<String, FireHandle>>,
    cancel: CancellationToken,
    stop_reason: Mutex<Option<String>>,
    fatal: Mutex<Option<ExecutionError>>,
    paused: watch::Sender<bool>,
    error_log: Mutex<Vec<ErrorLogEntry>>,
    tracker: TaskTracker,
}

/// Cheaply clonable handle to the shared flow state.
///
/// Views derived from one context share the flow controls; a local scope
/// view swaps in its own variables and storage.
#[derive(Clone)]
pub struct FlowContext {
    shared: Arc<Shared>,
    variables: Arc<Variables>,
    storage: Arc<Storage>,
    cache_scope: Option<String>,
    callable: Option<String>,
}

impl FlowContext {
    pub fn new(settings: FlowSettings) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                settings,
                callables: CallableRegistry::new(),
                triggers: Mutex::new(HashMap::new()),
                cancel: CancellationToken::new(),
                stop_reason: Mutex::new(None),
                fatal: Mutex::new(None),
                paused,
                error_log: Mutex::new(Vec::new()),
                tracker: TaskTracker::new(),
            }),
            variables: Arc::new(Variables::new()),
            storage: Arc::new(Storage::new()),
            cache_scope: None,
            callable: None,
        }
    }

    pub fn flow_id(&self) -> Uuid {
        self.shared.id
    }

    pub fn flow_name(&self) -> &str {
        &self.shared.settings.name
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.shared.settings
    }

    pub fn failure_strategy(&self) -> FailureStrategy {
        self.shared.settings.failure_strategy
    }

    pub fn max_threads(&self) -> usize {
        self.shared.settings.max_threads.max(1)
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn callables(&self) -> &CallableRegistry {
        &self.shared.callables
    }

    /// A view of this context whose cache-scoped storage belongs to `owner`.
    pub fn with_cache_scope(&self, owner: impl Into<String>) -> Self {
        let mut view = self.clone();
        view.cache_scope = Some(owner.into());
        view
    }

    /// A view whose actors read and write `variables` instead of the ones of
    /// this context.
    pub fn with_variables(&self, variables: Arc<Variables>) -> Self {
        let mut view = self.clone();
        view.variables = variables;
        view
    }

    /// A view whose actors use `storage`. Cache scopes start over there.
    pub fn with_storage(&self, storage: Arc<Storage>) -> Self {
        let mut view = self.clone();
        view.storage = storage;
        view.cache_scope = None;
        view
    }

    /// A view used while setting up the body of the callable actor `name`.
    pub fn within_callable(&self, name: impl Into<String>) -> Self {
        let mut view = self.clone();
        view.callable = Some(name.into());
        view
    }

    /// Innermost callable actor whose body is being set up, if any.
    pub fn enclosing_callable(&self) -> Option<&str> {
        self.callable.as_deref()
    }

    /// Scope used by actors asking for cache storage; falls back to the flow
    /// scope outside loops and branches.
    pub fn cache_scope(&self) -> StorageScope {
        match &self.cache_scope {
            Some(owner) => StorageScope::Cache(owner.clone()),
            None => StorageScope::Flow,
        }
    }

    /// Requests a cooperative stop. The first reason wins.
    pub fn stop(&self, reason: impl Into<String>) {
        {
            let mut slot = self.shared.stop_reason.lock();
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
        self.shared.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn stop_reason(&self) -> Option<String> {
        self.shared.stop_reason.lock().clone()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Records a fatal error raised outside the root's call chain, e.g. by an
    /// event trigger worker, and stops the flow.
    pub fn fail(&self, error: ExecutionError) {
        {
            let mut slot = self.shared.fatal.lock();
            if slot.is_none() {
                *slot = Some(error.clone());
            }
        }
        self.stop(error.to_string());
    }

    pub fn fatal_error(&self) -> Option<ExecutionError> {
        self.shared.fatal.lock().clone()
    }

    pub fn pause(&self) {
        self.shared.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.shared.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow()
    }

    /// Step boundary: waits while the flow is paused. Returns immediately
    /// once the flow is stopped.
    pub async fn checkpoint(&self) {
        let mut paused = self.shared.paused.subscribe();
        loop {
            if !*paused.borrow_and_update() || self.is_stopped() {
                return;
            }
            tokio::select! {
                _ = self.shared.cancel.cancelled() => return,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    pub fn record_error(&self, entry: ErrorLogEntry) {
        self.shared.error_log.lock().push(entry);
    }

    pub fn error_log(&self) -> Vec<ErrorLogEntry> {
        self.shared.error_log.lock().clone()
    }

    /// Tracker for background workers the flow must wait on before it completes.
    pub fn tracker(&self) -> &TaskTracker {
        &self.shared.tracker
    }

    /// Publishes a trigger fire handle under `name`. `false` if the name is taken.
    pub fn register_trigger(&self, name: &str, handle: FireHandle) -> bool {
        let mut triggers = self.shared.triggers.lock();
        if triggers.contains_key(name) {
            return false;
        }
        triggers.insert(name.to_string(), handle);
        true
    }

    pub fn trigger(&self, name: &str) -> Option<FireHandle> {
        self.shared.triggers.lock().get(name).cloned()
    }

    pub(crate) fn clear_triggers(&self) {
        self.shared.triggers.lock().clear();
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("flow_id", &self.shared.id)
            .field("flow_name", &self.shared.settings.name)
            .field("cache_scope", &self.cache_scope)
            .field("callable", &self.callable)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
