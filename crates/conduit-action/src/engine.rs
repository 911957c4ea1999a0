//! Action dispatch engine.
//!
//! Coordinates the full pipeline for one call: lookup, validation,
//! admission against the concurrency cap, execution raced against the
//! action's timeout, the optional advisory monitor, and lifecycle events.
//!
//! Timeouts are enforced by racing the spawned execution task against a
//! timer. When the timer wins, the action's cancel hook is invoked and the
//! task is aborted. Abort only takes effect at the task's next `.await`,
//! and anything the action spawned on its own keeps running.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use conduit_core::config::EngineConfig;
use conduit_core::events::{EventKind, LifecycleEvent};
use conduit_core::types::{ExecutionId, Timestamp};
use serde_json::{json, Value};
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::collaborators::Collaborators;
use crate::error::{ActionError, DispatchError};
use crate::events::{EventBus, EventListener, ListenerId};
use crate::handler::{builtin_definitions, ActionDefinition};
use crate::registry::{ActionRegistry, RegisteredAction};
use crate::tracker::ExecutionTracker;
use crate::types::{
    CallerContext, ExecutionContext, ExecutionRecord, ExecutionState, MonitorVerdict, Validation,
};

pub struct ActionEngine {
    config: EngineConfig,
    collaborators: Collaborators,
    registry: ActionRegistry,
    tracker: ExecutionTracker,
    events: EventBus,
    initialized: AtomicBool,
    /// Serializes `initialize` and `shutdown`.
    lifecycle: Mutex<()>,
}

impl ActionEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            registry: ActionRegistry::new(config.default_timeout()),
            tracker: ExecutionTracker::new(config.max_concurrent_actions),
            events: EventBus::new(),
            initialized: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            collaborators,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// One-time setup. Registers the built-in catalog when configured.
    ///
    /// The engine only reports itself initialized once the catalog is
    /// complete. A failed registration leaves it uninitialized and empty.
    pub fn initialize(&self) -> Result<(), DispatchError> {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_initialized() {
            return Err(DispatchError::AlreadyInitialized);
        }

        if self.config.register_builtins {
            for definition in builtin_definitions(&self.collaborators) {
                let name = definition.name.clone();
                if let Err(e) = self.add_action(&name, definition) {
                    tracing::error!(action = %name, error = %e, "Built-in registration failed");
                    self.registry.clear();
                    return Err(e);
                }
            }
        }
        self.initialized.store(true, Ordering::SeqCst);

        tracing::info!(
            actions = self.registry.len(),
            max_concurrent = self.tracker.limit(),
            collaborators = ?self.collaborators.available(),
            "Action engine initialized"
        );
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), DispatchError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DispatchError::NotInitialized)
        }
    }

    // =========================================================================
    // Registry
    // =========================================================================

    pub fn register(&self, name: &str, definition: ActionDefinition) -> Result<(), DispatchError> {
        self.ensure_initialized()?;
        self.add_action(name, definition)
    }

    fn add_action(&self, name: &str, definition: ActionDefinition) -> Result<(), DispatchError> {
        let action = self.registry.register(name, definition)?;
        tracing::debug!(action = %name, category = %action.definition.category, "Action registered");
        self.events.emit(&LifecycleEvent::registered(
            name,
            json!({
                "category": action.definition.category,
                "description": action.definition.description,
            }),
        ));
        Ok(())
    }

    pub fn get_action(&self, name: &str) -> Result<Option<Arc<RegisteredAction>>, DispatchError> {
        self.ensure_initialized()?;
        Ok(self.registry.get(name))
    }

    pub fn list_actions(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<Arc<RegisteredAction>>, DispatchError> {
        self.ensure_initialized()?;
        Ok(self.registry.list(category))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run `action_name` with `params` on behalf of `caller`.
    ///
    /// `ActionNotFound`, `Validation` and `ConcurrencyLimit` are returned
    /// before anything is recorded or emitted. Every later exit releases the
    /// execution record and emits `completed` or `failed`.
    pub async fn dispatch(
        &self,
        action_name: &str,
        params: Value,
        caller: &CallerContext,
    ) -> Result<Value, DispatchError> {
        self.ensure_initialized()?;
        let action = self
            .registry
            .get(action_name)
            .ok_or_else(|| DispatchError::ActionNotFound(action_name.to_string()))?;
        let definition = &action.definition;

        tracing::debug!(action = %action_name, state = %ExecutionState::Validating, "Dispatch requested");
        if let Validation::Invalid(reason) = definition.handler.validate(&params, caller).await {
            tracing::debug!(
                action = %action_name,
                state = %ExecutionState::Rejected,
                reason = %reason,
                "Validation failed"
            );
            return Err(DispatchError::Validation {
                action: action_name.to_string(),
                reason,
            });
        }

        let execution_id = ExecutionId::new();
        let context = ExecutionContext {
            caller: caller.clone(),
            execution_id,
            action_name: action_name.to_string(),
            started_at: Timestamp::now(),
        };
        let record = ExecutionRecord {
            execution_id,
            action_name: action_name.to_string(),
            params: params.clone(),
            started_at: context.started_at,
        };

        let mut guard = self
            .tracker
            .try_admit(record, context.clone(), definition.canceller.clone())
            .inspect_err(|_| {
                tracing::warn!(
                    action = %action_name,
                    limit = self.tracker.limit(),
                    "Concurrency limit reached"
                );
            })?;
        tracing::debug!(action = %action_name, execution_id = %execution_id, state = %ExecutionState::Admitted, "Execution admitted");

        self.events.emit(&LifecycleEvent::execution(
            EventKind::Started,
            execution_id,
            action_name,
            json!({ "params": params }),
        ));

        let clock = Instant::now();
        let handler = Arc::clone(&definition.handler);
        let mut task = tokio::spawn({
            let params = params.clone();
            let ctx = context.clone();
            async move { handler.execute(params, ctx).await }
        });
        guard.attach(task.abort_handle());
        tracing::debug!(execution_id = %execution_id, state = %ExecutionState::Running, "Execution running");

        let outcome = tokio::select! {
            joined = &mut task => settle(action_name, joined),
            _ = tokio::time::sleep(action.timeout) => {
                if let Some(canceller) = &definition.canceller {
                    canceller.cancel(execution_id, &context);
                }
                task.abort();
                Err(DispatchError::Timeout {
                    action: action_name.to_string(),
                    timeout_ms: action.timeout.as_millis() as u64,
                })
            }
        };

        if let Ok(result) = &outcome {
            self.run_monitor(&action, result, &params, &context).await;
        }

        let duration_ms = clock.elapsed().as_millis() as u64;
        drop(guard);

        match &outcome {
            Ok(result) => {
                tracing::info!(
                    action = %action_name,
                    execution_id = %execution_id,
                    state = %ExecutionState::Completed,
                    duration_ms,
                    "Action completed"
                );
                self.events.emit(&LifecycleEvent::execution(
                    EventKind::Completed,
                    execution_id,
                    action_name,
                    json!({ "duration_ms": duration_ms, "result": result }),
                ));
            }
            Err(e) => {
                let state = if matches!(e, DispatchError::Timeout { .. }) {
                    ExecutionState::TimedOut
                } else {
                    ExecutionState::Failed
                };
                tracing::warn!(
                    action = %action_name,
                    execution_id = %execution_id,
                    state = %state,
                    duration_ms,
                    error = %e,
                    "Action failed"
                );
                self.events.emit(&LifecycleEvent::execution(
                    EventKind::Failed,
                    execution_id,
                    action_name,
                    json!({ "duration_ms": duration_ms, "error": e.to_string() }),
                ));
            }
        }

        outcome
    }

    async fn run_monitor(
        &self,
        action: &RegisteredAction,
        result: &Value,
        params: &Value,
        ctx: &ExecutionContext,
    ) {
        if !self.config.monitoring_enabled {
            return;
        }
        let Some(monitor) = &action.definition.monitor else {
            return;
        };

        match monitor.check(result, params, ctx).await {
            Ok(MonitorVerdict::Ok) => {}
            Ok(MonitorVerdict::Warning(warning)) => {
                tracing::warn!(
                    action = %ctx.action_name,
                    execution_id = %ctx.execution_id,
                    warning = %warning,
                    "Monitor warning"
                );
                self.events.emit(&LifecycleEvent::execution(
                    EventKind::MonitorWarning,
                    ctx.execution_id,
                    &ctx.action_name,
                    json!({ "warning": warning }),
                ));
            }
            Err(e) => {
                tracing::warn!(
                    action = %ctx.action_name,
                    execution_id = %ctx.execution_id,
                    error = %e,
                    "Monitor check failed"
                );
            }
        }
    }

    // =========================================================================
    // Introspection & events
    // =========================================================================

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.tracker.snapshot()
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Cancel everything in flight and tear the engine down.
    ///
    /// Does not wait for executions that ignore cancellation. The engine can
    /// be initialized again afterwards.
    pub fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.initialized.swap(false, Ordering::SeqCst) {
            tracing::debug!("Action engine was not running");
        }

        let evicted = self.tracker.drain();
        let cancelled = evicted.len();
        for execution in evicted {
            tracing::info!(
                action = %execution.record.action_name,
                execution_id = %execution.record.execution_id,
                "Cancelling in-flight execution"
            );
            execution.cancel();
        }

        self.events.clear();
        self.registry.clear();
        tracing::info!(cancelled, "Action engine shut down");
    }
}

/// Map the joined execution task to the dispatch result.
fn settle(
    action: &str,
    joined: Result<Result<Value, ActionError>, JoinError>,
) -> Result<Value, DispatchError> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DispatchError::from_action(action, e)),
        Err(e) if e.is_panic() => Err(DispatchError::Execution {
            action: action.to_string(),
            source: ActionError::Failed(format!(
                "handler panicked: {}",
                panic_message(e.into_panic())
            )),
        }),
        Err(_) => Err(DispatchError::Execution {
            action: action.to_string(),
            source: ActionError::Failed("execution cancelled".to_string()),
        }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
