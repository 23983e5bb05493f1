mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;

use ibdm::kernel::select::SelectionRuleId;
use ibdm::kernel::semantics::Proposition;
use ibdm::kernel::telemetry::{RuleName, TelemetryEvent};
use ibdm::kernel::update::UpdateRuleId;
use ibdm::services::TemplateGenerator;
use ibdm::{
    EngineConfig, FileSessionStore, IbdmError, InMemorySessionStore, Session, SessionStore,
};
use uuid::Uuid;

#[tokio::test]
async fn test_cancelled_turn_keeps_pre_turn_state() {
    let config = EngineConfig { collaborator_timeout_ms: 10_000, ..EngineConfig::default() };
    let engine = engine_with(
        Arc::new(SlowInterpreter(Duration::from_secs(30))),
        Arc::new(TemplateGenerator::new()),
        config,
    );
    let mut session = Session::new(engine);
    let before = session.state().clone();

    let token = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = session.respond("hello").await.unwrap_err();
    assert!(matches!(err, IbdmError::Cancelled));
    assert_eq!(session.state(), &before, "Cancelled turn must not leak partial state");
    assert!(session.trail().is_empty());
    assert_eq!(session.telemetry().rollbacks.cancelled, 1);
}

#[tokio::test]
async fn test_finished_session_ignores_input_without_rollback() {
    let mut session = Session::new(engine());
    session.respond("bye").await.unwrap();
    assert!(session.is_finished());
    let before = session.state().clone();
    let cycles = session.trail().len();

    let err = session.respond("hello again").await.unwrap_err();
    assert!(matches!(err, IbdmError::DialogueEnded));
    assert_eq!(session.state(), &before);
    assert_eq!(session.trail().len(), cycles);
    match session.summary() {
        TelemetryEvent::SessionSummary { rollbacks, .. } => assert_eq!(rollbacks, 0),
        other => panic!("Expected a session summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sessions_run_in_parallel_without_sharing_state() {
    let engine = engine();
    let parties = ["Acme", "Globex", "Initech", "Umbrella"];

    let mut handles = Vec::new();
    for party in parties {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let mut session = Session::new(engine);
            session.open().await?;
            session.respond("I need an NDA").await?;
            session.respond(party).await?;
            session.respond("one-way").await?;
            Ok::<_, IbdmError>(session)
        }));
    }

    for (party, handle) in parties.into_iter().zip(handles) {
        let session = handle.await.unwrap().unwrap();
        let commitments = session.state().shared().commitments();
        assert!(commitments.contains(&Proposition::new("party", party)));
        assert!(commitments.contains(&Proposition::new("nda_type", "one-way")));
        let others = commitments
            .iter()
            .filter(|p| p.predicate == "party")
            .count();
        assert_eq!(others, 1, "Session for {party} saw another session's party");
    }
}

#[tokio::test]
async fn test_telemetry_counts_rules_without_content() {
    let mut session = Session::new(engine());

    // 1. Drive a short dialogue
    session.open().await.unwrap();
    session.respond("I need an NDA").await.unwrap();
    session.respond("Acme").await.unwrap();
    session.respond("how tall is the tower?").await.unwrap();

    // 2. Counts match the audit trail
    let snapshot = session.telemetry();
    assert_eq!(snapshot.count(RuleName::Update(UpdateRuleId::FindPlan)), 1);
    assert_eq!(snapshot.count(RuleName::Update(UpdateRuleId::IntegrateAnswer)), 1);
    assert_eq!(snapshot.count(RuleName::Selection(SelectionRuleId::SelectClarify)), 1);
    assert_eq!(snapshot.warnings.interpretation_failures, 1);
    assert_eq!(snapshot.cycles, session.trail().len() as u64);

    // 3. Nothing the user said reaches the events
    assert!(session.telemetry_events().count() > 0);
    for event in session.telemetry_events() {
        let json = serde_json::to_string(event).unwrap();
        assert!(!json.contains("Acme"), "Telemetry leaked content: {json}");
        assert!(!json.contains("tower"), "Telemetry leaked content: {json}");
    }

    match session.summary() {
        TelemetryEvent::SessionSummary { rules_fired, rollbacks, .. } => {
            assert_eq!(rules_fired, snapshot.rules_fired());
            assert_eq!(rollbacks, 0);
        }
        other => panic!("Expected a session summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resumed_session_continues_the_dialogue() {
    let engine = engine();
    let mut store = InMemorySessionStore::new();

    let mut session = Session::new(Arc::clone(&engine));
    session.open().await.unwrap();
    session.respond("I need an NDA").await.unwrap();
    store.save(&session.snapshot()).unwrap();
    let id = session.id();
    let trail = session.trail().to_vec();
    drop(session);

    let record = store.load(id).unwrap().expect("session should be stored");
    let mut resumed = Session::resume(engine, record);
    assert_eq!(resumed.id(), id);

    // 1. The pre-save audit survives the round trip
    assert_eq!(resumed.trail(), trail.as_slice());
    assert_eq!(resumed.trail()[0].selection_rule, Some(SelectionRuleId::SelectFromAgenda));
    assert!(resumed
        .trail()
        .iter()
        .any(|r| r.update_rule == Some(UpdateRuleId::FindPlan)));

    // 2. New cycles are appended after it
    let exchange = resumed.respond("Acme").await.unwrap();
    assert_eq!(exchange.text(), "Mutual or one-way?");
    assert_eq!(resumed.trail().len(), trail.len() + exchange.records.len());
    assert_eq!(resumed.trail().last(), exchange.records.last());
}

#[test]
fn test_record_without_trail_still_loads() {
    let record = ibdm::SessionRecord::new(Uuid::new_v4(), initial_state());
    let mut raw: serde_json::Value = serde_json::to_value(&record).unwrap();
    raw.as_object_mut().unwrap().remove("trail");

    let mut store = InMemorySessionStore::new();
    store.save(&serde_json::from_value(raw).unwrap()).unwrap();
    let loaded = store.load(record.id).unwrap().unwrap();
    assert!(loaded.trail.is_empty());
    assert_eq!(loaded.state, record.state);
}

#[test]
fn test_file_store_round_trip() {
    let dir = std::env::temp_dir().join(format!("ibdm-store-{}", Uuid::new_v4()));
    let mut store = FileSessionStore::new(&dir);
    assert!(store.list().unwrap().is_empty(), "Missing directory lists as empty");

    let mut state = initial_state();
    state.push_qud(city());
    state.add_commitment(Proposition::new("party", "Acme"));
    let record = ibdm::SessionRecord::new(Uuid::new_v4(), state);

    store.save(&record).unwrap();
    assert_eq!(store.list().unwrap(), vec![record.id]);
    assert_eq!(store.load(record.id).unwrap(), Some(record.clone()));
    assert_eq!(store.load(Uuid::new_v4()).unwrap(), None);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_in_memory_store_lists_every_saved_session() {
    let mut store = InMemorySessionStore::new();
    let first = ibdm::SessionRecord::new(Uuid::new_v4(), initial_state());
    let second = ibdm::SessionRecord::new(Uuid::new_v4(), initial_state());
    store.save(&first).unwrap();
    store.save(&second).unwrap();

    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(store.list().unwrap(), expected);
    assert_eq!(store.load(second.id).unwrap(), Some(second));
}
