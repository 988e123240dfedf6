//! Process context.
//!
//! Everything the engine needs for a batch is built once at startup and
//! passed explicitly. [`ContextCell`] lets a host that receives many
//! invocations in one warm process initialize exactly once.

use std::sync::{Arc, Mutex, OnceLock};

use actioner_core::config::{ActionerConfig, IntakeConfig};
use actioner_storage::{ActionEventRepository, Database, EventStore};

use crate::dispatcher::Dispatcher;
use crate::error::ActionError;
use crate::handler::ActionRegistry;
use crate::intake::IntakeLoop;
use crate::recorder::ExecutionRecorder;

/// Registry, dispatcher, recorder and intake loop for one process.
#[derive(Debug)]
pub struct ActionerContext {
    dispatcher: Dispatcher,
    recorder: ExecutionRecorder,
    intake: IntakeLoop,
}

impl ActionerContext {
    /// Build the context from configuration, recording into `db`.
    pub fn initialize(config: &ActionerConfig, db: Arc<Database>) -> Result<Self, ActionError> {
        let registry = ActionRegistry::from_definitions(&config.actions)?;
        let store = Arc::new(ActionEventRepository::new(db));
        Ok(Self::new(registry, store, config.intake.clone()))
    }

    pub fn new(
        registry: ActionRegistry,
        store: Arc<dyn EventStore>,
        intake_config: IntakeConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::new(registry));
        let recorder = ExecutionRecorder::new(store);
        let intake = IntakeLoop::new(dispatcher.clone(), recorder.clone(), intake_config);
        Self {
            dispatcher,
            recorder,
            intake,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn recorder(&self) -> &ExecutionRecorder {
        &self.recorder
    }

    pub fn intake(&self) -> &IntakeLoop {
        &self.intake
    }
}

/// Once-only holder for the process context.
#[derive(Debug, Default)]
pub struct ContextCell {
    inner: OnceLock<Arc<ActionerContext>>,
    init_lock: Mutex<()>,
}

impl ContextCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the context, running `init` only if none exists yet.
    ///
    /// Concurrent callers wait for the first `init` to finish; `init` runs at
    /// most once per successful initialization. A failed `init` leaves the
    /// cell empty so the next call retries.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<ActionerContext>, ActionError>
    where
        F: FnOnce() -> Result<ActionerContext, ActionError>,
    {
        if let Some(context) = self.inner.get() {
            return Ok(Arc::clone(context));
        }

        // A poisoned lock means an earlier init panicked and left the cell empty.
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(context) = self.inner.get() {
            return Ok(Arc::clone(context));
        }

        let context = Arc::new(init()?);
        tracing::info!(labels = context.registry().len(), "Actioner context initialized");
        Ok(Arc::clone(self.inner.get_or_init(|| context)))
    }

    pub fn get(&self) -> Option<Arc<ActionerContext>> {
        self.inner.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}
