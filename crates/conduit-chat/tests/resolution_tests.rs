//! End-to-end tests for parser, dispatch engine and resolution loop.
//!
//! Each test builds its own engine over fresh in-memory collaborators and
//! drives it with a scripted responder.

use std::sync::{Arc, Mutex};

use conduit_action::collaborators::in_memory::{
    InMemoryDirectory, InMemoryInventory, InMemoryMemoryStore, InMemoryScenario,
    InMemorySpatialGraph, ManualClock,
};
use conduit_action::collaborators::{AgentProfile, WorldTime};
use conduit_action::{ActionEngine, BroadcastListener, Collaborators};
use conduit_chat::{Conversation, Outcome, ResolutionLoop, Role, ScriptedResponder};
use conduit_core::config::{EngineConfig, ResolverConfig};
use conduit_core::events::{EventKind, LifecycleEvent};
use serde_json::Value;

// =============================================================================
// Helpers
// =============================================================================

struct World {
    engine: Arc<ActionEngine>,
    inventory: Arc<InMemoryInventory>,
    scenario: Arc<InMemoryScenario>,
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

fn make_world() -> World {
    let graph = InMemorySpatialGraph::new();
    graph.connect("square", "tavern");
    graph.connect("square", "mill");
    graph.place("ada", "square");
    graph.place("bo", "mill");

    let inventory = Arc::new(InMemoryInventory::new());
    inventory.add("ada", "bread", 2);

    let directory = InMemoryDirectory::new();
    directory.insert(AgentProfile {
        id: "bo".into(),
        name: "Bo".into(),
        description: "Runs the mill".into(),
        traits: vec!["gruff".into()],
    });

    let scenario = Arc::new(InMemoryScenario::new("harvest"));

    let collaborators = Collaborators::none()
        .with_memory(Arc::new(InMemoryMemoryStore::new()))
        .with_spatial(Arc::new(graph))
        .with_inventory(inventory.clone())
        .with_clock(Arc::new(ManualClock::new(WorldTime::new(1, 8, 0))))
        .with_scenario(scenario.clone())
        .with_directory(Arc::new(directory));

    let engine = ActionEngine::new(EngineConfig::default(), collaborators);
    engine.initialize().unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(Arc::new(move |e: &LifecycleEvent| {
        sink.lock().unwrap().push(e.clone());
    }));

    World {
        engine: Arc::new(engine),
        inventory,
        scenario,
        events,
    }
}

fn make_loop(world: &World, replies: Vec<&str>) -> (ResolutionLoop, Arc<ScriptedResponder>) {
    let responder = Arc::new(ScriptedResponder::new(replies));
    let lp = ResolutionLoop::new(
        world.engine.clone(),
        responder.clone(),
        ResolverConfig::default(),
    );
    (lp, responder)
}

fn system_notes(conv: &Conversation) -> Vec<String> {
    conv.turns()
        .iter()
        .filter(|t| t.role == Role::System)
        .map(|t| t.content.clone())
        .collect()
}

fn event_kinds(world: &World) -> Vec<EventKind> {
    world
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.kind)
        .collect()
}

// =============================================================================
// Multi-step resolution
// =============================================================================

#[tokio::test]
async fn test_chain_of_actions_resolves() {
    let world = make_world();
    let (lp, responder) = make_loop(
        &world,
        vec![
            r#"Now I'll head over. action-execute move_to {"destination": "tavern"}"#,
            r#"action-execute remember {"content": "Went to the tavern at dawn", "importance": 0.6}"#,
            "I am settled in at the tavern.",
        ],
    );
    let mut conv = Conversation::for_agent("ada");
    conv.push_user("What will you do this morning?");

    let res = lp
        .resolve("action-execute look_around {}", &mut conv)
        .await
        .unwrap();

    assert_eq!(res.outcome, Outcome::Completed);
    assert_eq!(res.text, "I am settled in at the tavern.");
    assert_eq!(res.commands, 3);
    assert_eq!(responder.calls(), 3);

    let notes = system_notes(&conv);
    assert_eq!(notes.len(), 3);
    let look: Value = serde_json::from_str(&notes[0]).unwrap();
    assert_eq!(look["location"], "square");
    let moved: Value = serde_json::from_str(&notes[1]).unwrap();
    assert_eq!(moved["location"], "tavern");
    assert!(notes[2].contains("memory_id"));
}

#[tokio::test]
async fn test_errors_are_fed_back_and_loop_recovers() {
    let world = make_world();
    let (lp, _) = make_loop(
        &world,
        vec![
            r#"action-execute give_item {"recipient": "bo"}"#,
            r#"action-execute give_item {"recipient": "bo", "item": "bread", "quantity": 2}"#,
            "Done giving.",
        ],
    );
    let mut conv = Conversation::for_agent("ada");

    let res = lp
        .resolve("action-execute give_item {oops}", &mut conv)
        .await
        .unwrap();
    assert_eq!(res.outcome, Outcome::Completed);

    let notes = system_notes(&conv);
    assert!(notes[0].starts_with("Error: invalid arguments for give_item"));
    assert_eq!(notes[1], "Error: Validation failed for give_item: item is required");
    let given: Value = serde_json::from_str(&notes[2]).unwrap();
    assert_eq!(given["remaining"], 0);
    assert_eq!(world.inventory.count("bo", "bread"), 2);

    assert!(event_kinds(&world).contains(&EventKind::MonitorWarning));
}

// =============================================================================
// Describe / agent lookup
// =============================================================================

#[tokio::test]
async fn test_describe_and_lookup_bypass_dispatch() {
    let world = make_world();
    let (lp, _) = make_loop(&world, vec!["agent-lookup bo", "action-describe fly", "Ok."]);
    let mut conv = Conversation::for_agent("ada");
    let registered = world.events.lock().unwrap().len();

    lp.resolve("action-describe give_item", &mut conv)
        .await
        .unwrap();

    let notes = system_notes(&conv);
    let described: Value = serde_json::from_str(&notes[0]).unwrap();
    assert_eq!(described["name"], "give_item");
    assert_eq!(described["monitored"], true);
    let profile: Value = serde_json::from_str(&notes[1]).unwrap();
    assert_eq!(profile["name"], "Bo");
    assert_eq!(notes[2], "Error: Action not found: fly");

    // Neither form reaches the dispatch path.
    assert_eq!(world.events.lock().unwrap().len(), registered);
    assert_eq!(world.engine.in_flight(), 0);
}

#[tokio::test]
async fn test_unknown_agent_lookup() {
    let world = make_world();
    let (lp, _) = make_loop(&world, vec!["Never mind."]);
    let mut conv = Conversation::for_agent("ada");
    lp.resolve("agent-lookup zed", &mut conv).await.unwrap();
    assert_eq!(system_notes(&conv), vec!["Error: Agent not found: zed"]);
}

// =============================================================================
// Bounded depth
// =============================================================================

#[tokio::test]
async fn test_malformed_forever_stops_at_max_depth() {
    let world = make_world();
    let malformed = "action-execute wait";
    let (lp, responder) = make_loop(&world, vec![malformed; 200]);
    let mut conv = Conversation::for_agent("ada");

    let res = lp.resolve(malformed, &mut conv).await.unwrap();

    assert_eq!(res.outcome, Outcome::DepthExhausted);
    assert_eq!(res.depth, 120);
    assert_eq!(responder.calls(), 120);
    assert_eq!(responder.remaining(), 80);
    assert_eq!(world.engine.in_flight(), 0);
}

#[tokio::test]
async fn test_scenario_flag_round_trip_through_loop() {
    let world = make_world();
    let (lp, _) = make_loop(&world, vec!["action-execute scenario_status {}", "Storm noted."]);
    let mut conv = Conversation::for_agent("ada");

    lp.resolve(
        r#"action-execute set_scenario_flag {"flag": "storm", "value": true}"#,
        &mut conv,
    )
    .await
    .unwrap();

    assert_eq!(world.scenario.flag("storm"), Some(Value::Bool(true)));
    let status: Value = serde_json::from_str(&system_notes(&conv)[1]).unwrap();
    assert_eq!(status["flags"]["storm"], true);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn test_broadcast_listener_sees_dispatches() {
    let world = make_world();
    let (listener, mut rx) = BroadcastListener::channel(64);
    world.engine.subscribe(Arc::new(listener));
    let (lp, _) = make_loop(&world, vec!["It is morning."]);
    let mut conv = Conversation::for_agent("ada");

    lp.resolve("action-execute check_time {}", &mut conv)
        .await
        .unwrap();

    let started = rx.recv().await.unwrap();
    let completed = rx.recv().await.unwrap();
    assert_eq!(started.kind, EventKind::Started);
    assert_eq!(completed.kind, EventKind::Completed);
    assert_eq!(completed.action_name, "check_time");
    assert_eq!(completed.payload["result"]["display"], "Day 1, 08:00");
}
