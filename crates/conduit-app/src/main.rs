//! Conduit application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Seed an in-memory demo world for the built-in actions
//! 3. Initialize the dispatch engine
//! 4. Run the requested subcommand, then shut the engine down

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use conduit_action::collaborators::in_memory::{
    InMemoryDirectory, InMemoryInventory, InMemoryMemoryStore, InMemoryScenario,
    InMemorySpatialGraph, ManualClock,
};
use conduit_action::collaborators::{AgentProfile, WorldTime};
use conduit_action::{ActionEngine, Collaborators};
use conduit_chat::{
    CommandParser, Conversation, ParsedCommand, ResolutionLoop, Responder, ScriptedResponder,
};
use conduit_core::config::ConduitConfig;
use conduit_core::events::LifecycleEvent;

use cli::{CliArgs, Command};

/// A small village with two agents, used by `run` and `actions`.
fn demo_world() -> Collaborators {
    let graph = InMemorySpatialGraph::new();
    graph.connect("square", "tavern");
    graph.connect("square", "mill");
    graph.connect("mill", "river");
    graph.place("ada", "square");
    graph.place("bo", "mill");

    let inventory = InMemoryInventory::new();
    inventory.add("ada", "bread", 3);
    inventory.add("ada", "apple", 1);
    inventory.add("bo", "flour", 5);

    let directory = InMemoryDirectory::new();
    directory.insert(AgentProfile {
        id: "ada".into(),
        name: "Ada".into(),
        description: "A baker new to the village".into(),
        traits: vec!["curious".into(), "generous".into()],
    });
    directory.insert(AgentProfile {
        id: "bo".into(),
        name: "Bo".into(),
        description: "Runs the mill by the river".into(),
        traits: vec!["gruff".into()],
    });

    Collaborators::none()
        .with_memory(Arc::new(InMemoryMemoryStore::new()))
        .with_spatial(Arc::new(graph))
        .with_inventory(Arc::new(inventory))
        .with_clock(Arc::new(ManualClock::new(WorldTime::new(1, 8, 0))))
        .with_scenario(Arc::new(InMemoryScenario::new("village")))
        .with_directory(Arc::new(directory))
}

fn list_actions(
    engine: &ActionEngine,
    category: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    for action in engine.list_actions(category)? {
        let def = &action.definition;
        println!("{:<20} {:<10} {}", action.name(), def.category, def.description);
    }
    Ok(())
}

fn print_parse(text: &str) {
    match CommandParser::new().parse(text) {
        ParsedCommand::None => println!("none"),
        ParsedCommand::Execute { action, params } => println!("execute {} {}", action, params),
        ParsedCommand::Describe { action } => println!("describe {}", action),
        ParsedCommand::AgentLookup { agent_id } => println!("agent-lookup {}", agent_id),
        ParsedCommand::Malformed { action, error } => println!("malformed {}: {}", action, error),
    }
}

async fn run_script(
    engine: Arc<ActionEngine>,
    config: &ConduitConfig,
    script: &Path,
    agent: &str,
    max_depth: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(script)?;
    let responder = Arc::new(ScriptedResponder::from_json(&content)?);

    let mut conversation = Conversation::for_agent(agent);
    // The first reply opens the exchange; the rest answer follow-ups.
    let initial = responder.respond(&conversation).await?;

    let resolver = ResolutionLoop::new(engine, responder, config.resolver.clone());
    let depth = max_depth.unwrap_or(config.resolver.max_depth);
    let resolution = resolver
        .resolve_with_depth(&initial, &mut conversation, depth)
        .await?;

    tracing::info!(
        outcome = ?resolution.outcome,
        depth = resolution.depth,
        commands = resolution.commands,
        "Resolution finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("{}", conversation.transcript());
        println!();
        println!("{}", resolution.text);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = ConduitConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Conduit v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    if let Command::Parse { text } = &args.command {
        print_parse(text);
        return Ok(());
    }

    // === Engine ===
    let engine = Arc::new(ActionEngine::new(config.engine.clone(), demo_world()));
    engine.initialize()?;
    engine.subscribe(Arc::new(|event: &LifecycleEvent| {
        tracing::debug!(
            kind = %event.kind,
            action = %event.action_name,
            "Lifecycle event"
        );
    }));

    let result = match &args.command {
        Command::Actions { category } => list_actions(&engine, category.as_deref()),
        Command::Run {
            script,
            agent,
            max_depth,
            json,
        } => {
            run_script(
                Arc::clone(&engine),
                &config,
                script,
                agent,
                *max_depth,
                *json,
            )
            .await
        }
        Command::Parse { .. } => Ok(()),
    };

    engine.shutdown();
    result
}
