//! `agentgate config`: Show configuration.

use agentgate_config::AppConfig;

pub fn run(config: AppConfig, defaults: bool) -> Result<(), Box<dyn std::error::Error>> {
    if defaults {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    config.validate()?;

    println!("⚙️  AgentGate configuration");
    println!();
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!(
        "  API key:      {}",
        if config.has_api_key() { "set" } else { "missing" }
    );
    println!("  API URL:      {}", config.api_url);
    println!("  Model:        {}", config.model);
    println!("  Temperature:  {}", config.temperature);
    println!("  Max tokens:   {}", config.max_tokens);
    println!("  Streaming:    {}", config.agent.streaming);
    match config.agent.turn_limit() {
        Some(limit) => println!("  Turn limit:   {limit}"),
        None => println!("  Turn limit:   unbounded"),
    }
    println!("  Question tool: {}", config.agent.question_tool);
    println!("  Workspace:    {}", config.tools.workspace_root.display());
    println!("  Check:        {}", config.tools.check_command);

    Ok(())
}
