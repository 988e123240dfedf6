//! End-to-end tests for the intake pipeline.
//!
//! Each test builds its own registry and in-memory audit store, then drives
//! dispatch and recording the way a batch invocation does.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use actioner_core::config::{
    AckMode, ActionDefinition, ActionKind, ActionerConfig, HandlerErrorPolicy, IntakeConfig,
    WebhookMethod,
};
use actioner_core::error::ActionerError;
use actioner_core::message::{
    ActionEvent, ActionLabel, ActionMessage, ActionRule, BankedSignal, MatchMessage,
};
use actioner_engine::{
    ActionError, ActionPerformer, ActionRegistry, ActionerContext, ContextCell, Dispatcher,
    ExecutionRecorder, FailureAudit, IntakeError, IntakeLoop, MessageOutcome, TransportBatch,
    TransportMessage,
};
use actioner_storage::{ActionEventRepository, Database, EventStore};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Default)]
struct CountingPerformer {
    seen: Mutex<Vec<MatchMessage>>,
}

#[async_trait]
impl ActionPerformer for CountingPerformer {
    fn kind(&self) -> ActionKind {
        ActionKind::Noop
    }

    async fn perform_action(&self, match_message: &MatchMessage) -> Result<(), ActionError> {
        self.seen.lock().unwrap().push(match_message.clone());
        Ok(())
    }
}

struct RaisingPerformer;

#[async_trait]
impl ActionPerformer for RaisingPerformer {
    fn kind(&self) -> ActionKind {
        ActionKind::Webhook
    }

    async fn perform_action(&self, _match_message: &MatchMessage) -> Result<(), ActionError> {
        Err(ActionError::HandlerFailed("endpoint unreachable".to_string()))
    }
}

struct BrokenStore;

impl EventStore for BrokenStore {
    fn append(&self, _event: &ActionEvent) -> Result<(), ActionerError> {
        Err(ActionerError::Storage("write throttled".to_string()))
    }
}

fn two_bank_signals() -> Vec<BankedSignal> {
    vec![
        BankedSignal::new("2862392437204724", "bank 4", "te"),
        BankedSignal::new("4194946153908639", "bank 7", "ncmec"),
    ]
}

fn two_rules() -> Vec<ActionRule> {
    vec![
        ActionRule::new("te-bank-4", json!({"classification": "BankID=bank 4"})),
        ActionRule::new("ncmec-bank-7", json!({"classification": "BankID=bank 7"})),
    ]
}

fn action_message(content_key: &str, label: &str) -> ActionMessage {
    let m = MatchMessage::new(content_key, "hash-1", two_bank_signals()).unwrap();
    ActionMessage::from_match(m, ActionLabel::from(label), two_rules())
}

fn body(content_key: &str, label: &str) -> String {
    action_message(content_key, label).to_wire().unwrap()
}

struct Harness {
    performer: Arc<CountingPerformer>,
    repo: Arc<ActionEventRepository>,
    intake: IntakeLoop,
}

fn harness(config: IntakeConfig) -> Harness {
    let performer = Arc::new(CountingPerformer::default());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionLabel::from("EnqueueForReview"), performer.clone())
        .unwrap();
    registry
        .register(ActionLabel::from("NotifyPartner"), Arc::new(RaisingPerformer))
        .unwrap();

    let repo = Arc::new(ActionEventRepository::new(Arc::new(
        Database::in_memory().unwrap(),
    )));
    let context = ActionerContext::new(registry, repo.clone(), config);
    Harness {
        performer,
        repo,
        intake: context.intake().clone(),
    }
}

// =============================================================================
// Scenario A: registered label, two signals from different banks
// =============================================================================

#[tokio::test]
async fn scenario_a_registered_label_dispatches_and_records() {
    let h = harness(IntakeConfig::default());

    let report = h
        .intake
        .process_batch(&[TransportMessage::new("m-1", body("content-a", "EnqueueForReview"))])
        .await;

    assert!(report.is_success());
    assert!(matches!(
        report.messages[0].outcome,
        MessageOutcome::Performed { .. }
    ));

    let seen = h.performer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], action_message("content-a", "EnqueueForReview").match_view());

    let events = h.repo.find_by_content("content-a", 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action_label, "EnqueueForReview");
    assert_eq!(events[0].action_rules.len(), 2);
    assert_eq!(events[0].decode_rules().unwrap(), two_rules());
}

#[tokio::test]
async fn dispatch_returns_true_for_registered_label() {
    let performer = Arc::new(CountingPerformer::default());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionLabel::from("EnqueueForReview"), performer.clone())
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let performed = dispatcher
        .dispatch(&action_message("content-a", "EnqueueForReview"))
        .await
        .unwrap();
    assert!(performed);
    assert_eq!(performer.seen.lock().unwrap().len(), 1);
}

// =============================================================================
// Scenario B: unregistered label is still recorded
// =============================================================================

#[tokio::test]
async fn scenario_b_unregistered_label_is_recorded_without_side_effects() {
    let h = harness(IntakeConfig::default());

    let report = h
        .intake
        .process_batch(&[TransportMessage::new("m-1", body("content-b", "Unregistered"))])
        .await;

    assert!(report.is_success());
    assert!(matches!(
        report.messages[0].outcome,
        MessageOutcome::Unresolved { .. }
    ));
    assert!(h.performer.seen.lock().unwrap().is_empty());

    let events = h.repo.find_by_label("Unregistered", 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].content_id, "content-b");
}

// =============================================================================
// Scenario C: malformed message in the middle of a batch
// =============================================================================

#[tokio::test]
async fn scenario_c_malformed_message_does_not_block_batch() {
    let h = harness(IntakeConfig::default());
    let batch = vec![
        TransportMessage::new("m-1", body("content-1", "EnqueueForReview")),
        TransportMessage::new("m-2", "{\"content_key\": \"truncated"),
        TransportMessage::new("m-3", body("content-3", "EnqueueForReview")),
    ];

    let report = h.intake.process_batch(&batch).await;

    assert_eq!(report.messages.len(), 3);
    assert_eq!(report.performed_count(), 2);
    let failures: Vec<&IntakeError> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        IntakeError::Deserialization { message_id, .. } if message_id == "m-2"
    ));

    assert_eq!(h.performer.seen.lock().unwrap().len(), 2);
    assert_eq!(h.repo.count().unwrap(), 2);
    assert_eq!(h.repo.find_by_content("content-1", 10).unwrap().len(), 1);
    assert_eq!(h.repo.find_by_content("content-3", 10).unwrap().len(), 1);

    let response = report.response(AckMode::Partial);
    assert!(!response.action_performed);
    assert_eq!(response.batch_item_failures.len(), 1);
    assert_eq!(response.batch_item_failures[0].item_identifier, "m-2");

    assert_eq!(report.response(AckMode::Batch).batch_item_failures.len(), 3);
}

// =============================================================================
// Scenario D: raising handler
// =============================================================================

#[tokio::test]
async fn scenario_d_handler_failure_propagates_out_of_dispatch() {
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionLabel::from("NotifyPartner"), Arc::new(RaisingPerformer))
        .unwrap();
    let repo = Arc::new(ActionEventRepository::new(Arc::new(
        Database::in_memory().unwrap(),
    )));
    let context = ActionerContext::new(registry, repo.clone(), IntakeConfig::default());

    let err = context
        .dispatcher()
        .dispatch(&action_message("content-d", "NotifyPartner"))
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::HandlerFailed(_)));
    assert_eq!(repo.count().unwrap(), 0);
}

#[tokio::test]
async fn handler_failure_skips_record_by_default() {
    let h = harness(IntakeConfig::default());

    let report = h
        .intake
        .process_batch(&[
            TransportMessage::new("m-1", body("content-d", "NotifyPartner")),
            TransportMessage::new("m-2", body("content-e", "EnqueueForReview")),
        ])
        .await;

    let failures: Vec<&IntakeError> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        IntakeError::Handler {
            message_id,
            audit: FailureAudit::Skipped,
            ..
        } if message_id == "m-1"
    ));
    assert!(h.repo.find_by_content("content-d", 10).unwrap().is_empty());
    assert_eq!(h.repo.find_by_content("content-e", 10).unwrap().len(), 1);
}

#[tokio::test]
async fn handler_failure_recorded_when_policy_says_so() {
    let h = harness(IntakeConfig {
        on_handler_error: HandlerErrorPolicy::Record,
        ..IntakeConfig::default()
    });

    let report = h
        .intake
        .process_batch(&[TransportMessage::new("m-1", body("content-d", "NotifyPartner"))])
        .await;

    assert!(matches!(
        report.failures().next(),
        Some(IntakeError::Handler {
            audit: FailureAudit::Recorded { .. },
            ..
        })
    ));
    assert_eq!(h.repo.find_by_content("content-d", 10).unwrap().len(), 1);
    assert_eq!(
        report.response(AckMode::Partial).batch_item_failures[0].item_identifier,
        "m-1"
    );
}

// =============================================================================
// Storage failures
// =============================================================================

#[tokio::test]
async fn storage_failure_is_reported_per_message() {
    let performer = Arc::new(CountingPerformer::default());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionLabel::from("EnqueueForReview"), performer.clone())
        .unwrap();
    let context = ActionerContext::new(registry, Arc::new(BrokenStore), IntakeConfig::default());

    let report = context
        .intake()
        .process_batch(&[
            TransportMessage::new("m-1", body("c1", "EnqueueForReview")),
            TransportMessage::new("m-2", body("c2", "EnqueueForReview")),
        ])
        .await;

    let ids: Vec<&str> = report.failures().map(IntakeError::message_id).collect();
    assert_eq!(ids, vec!["m-1", "m-2"]);
    assert!(report
        .failures()
        .all(|f| matches!(f, IntakeError::Storage { .. })));
    assert_eq!(performer.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn handler_and_audit_failures_both_reported() {
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionLabel::from("NotifyPartner"), Arc::new(RaisingPerformer))
        .unwrap();
    let config = IntakeConfig {
        on_handler_error: HandlerErrorPolicy::Record,
        ..IntakeConfig::default()
    };
    let context = ActionerContext::new(registry, Arc::new(BrokenStore), config);

    let report = context
        .intake()
        .process_batch(&[TransportMessage::new("m-1", body("c1", "NotifyPartner"))])
        .await;

    match report.failures().next() {
        Some(IntakeError::Handler {
            message_id,
            source,
            audit: FailureAudit::WriteFailed(write_err),
        }) => {
            assert_eq!(message_id, "m-1");
            assert!(source.to_string().contains("endpoint unreachable"));
            assert!(write_err.to_string().contains("write throttled"));
        }
        other => panic!("unexpected failure: {:?}", other),
    };
}

#[test]
fn recorder_storage_error_surfaces() {
    let recorder = ExecutionRecorder::new(Arc::new(BrokenStore));
    let err = recorder
        .record_message(&action_message("c1", "EnqueueForReview"), Utc::now())
        .unwrap_err();
    assert!(matches!(err, ActionError::Storage(_)));
}

// =============================================================================
// Initialization and transport envelope
// =============================================================================

#[test]
fn repeated_initialization_resolves_same_labels() {
    let mut config = ActionerConfig::default();
    config.actions = vec![
        ActionDefinition::noop("EnqueueForReview"),
        ActionDefinition::webhook("NotifyPartner", "https://example.com/hook", WebhookMethod::Post),
    ];

    let once = ActionerContext::initialize(&config, Arc::new(Database::in_memory().unwrap()))
        .unwrap()
        .registry()
        .labels();
    let twice = ActionerContext::initialize(&config, Arc::new(Database::in_memory().unwrap()))
        .unwrap()
        .registry()
        .labels();
    assert_eq!(once, twice);

    let cell = ContextCell::new();
    let first = cell
        .get_or_try_init(|| {
            ActionerContext::initialize(&config, Arc::new(Database::in_memory()?))
        })
        .unwrap();
    let second = cell
        .get_or_try_init(|| panic!("context must not be rebuilt"))
        .unwrap();
    assert_eq!(first.registry().labels(), once);
    assert_eq!(second.registry().labels(), once);
}

#[tokio::test]
async fn configured_webhook_receives_match_from_batch_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ActionerConfig::default();
    config.actions = vec![ActionDefinition::webhook(
        "NotifyPartner",
        format!("{}/hook", server.uri()),
        WebhookMethod::Post,
    )];
    let db = Arc::new(Database::in_memory().unwrap());
    let repo = ActionEventRepository::new(db.clone());
    let context = ActionerContext::initialize(&config, db).unwrap();

    let envelope = json!({
        "Records": [{"messageId": "sqs-1", "body": body("content-w", "NotifyPartner")}]
    })
    .to_string();
    let messages = TransportBatch::from_json(&envelope).unwrap().into_messages();

    let report = context.intake().process_batch(&messages).await;

    assert!(report.is_success());
    assert_eq!(report.performed_count(), 1);
    assert_eq!(repo.find_by_label("NotifyPartner", 10).unwrap().len(), 1);
}
