//! `agentgate run`: Drive one session to a validated finish.

use std::sync::Arc;

use agentgate_agent::{CompletionGate, ConversationLoop, Session};
use agentgate_config::AppConfig;
use agentgate_core::event::EventBus;
use agentgate_providers::AnthropicProvider;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::console::{self, ConsoleResponder};

pub async fn run(
    config: AppConfig,
    prompt: String,
    no_stream: bool,
    max_turns: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(api_key) = config.api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set AGENTGATE_API_KEY or ANTHROPIC_API_KEY, or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let provider = Arc::new(AnthropicProvider::new(api_key)?.with_base_url(config.api_url.clone()));
    let registry = Arc::new(agentgate_tools::default_registry(&config.tools));
    let event_bus = Arc::new(EventBus::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let turn_limit = match max_turns {
        Some(0) => None,
        Some(n) => Some(n),
        None => config.agent.turn_limit(),
    };

    let mut agent = ConversationLoop::new(provider, &config.model, event_bus)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_streaming(config.agent.streaming && !no_stream)
        .with_max_turns(turn_limit)
        .with_gate(CompletionGate::new(
            config.gate.write_tools.clone(),
            config.gate.check_tools.clone(),
        ))
        .with_question_tool(&config.agent.question_tool)
        .with_responder(Arc::new(ConsoleResponder::new(&config.agent.question_tool)))
        .with_live_events(tx);
    if let Some(system) = &config.system_prompt {
        agent = agent.with_system_prompt(system.clone());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        let mut streamed = false;
        while let Some(event) = rx.recv().await {
            streamed |= console::render(&event);
        }
        streamed
    });

    info!(model = %config.model, tools = registry.len(), "Starting run");
    let mut session = Session::with_prompt(registry, prompt);
    let result = agent.run(&mut session, &cancel).await;

    // Dropping the loop closes the live channel so the printer drains.
    drop(agent);
    let streamed = printer.await.unwrap_or(false);

    let outcome = result?;
    if streamed {
        println!();
    } else {
        println!("{}", outcome.final_text);
    }

    Ok(())
}
