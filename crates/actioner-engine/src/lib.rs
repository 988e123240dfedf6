//! Action engine for the match pipeline.
//!
//! Resolves action labels to pluggable performers, runs them against match
//! evidence, and records an audit event for every processed action message.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod intake;
pub mod recorder;

pub use context::{ActionerContext, ContextCell};
pub use dispatcher::Dispatcher;
pub use error::{ActionError, FailureAudit, IntakeError};
pub use handler::{ActionPerformer, ActionRegistry, NoopActionPerformer, WebhookActionPerformer};
pub use intake::{
    BatchItemFailure, BatchReport, BatchResponse, IntakeLoop, MessageOutcome, MessageReport,
    TransportBatch, TransportMessage,
};
pub use recorder::ExecutionRecorder;
