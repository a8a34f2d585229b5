//! `agentgate tools`: Print the tool catalog.

use agentgate_config::AppConfig;

pub fn run(config: AppConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let registry = agentgate_tools::default_registry(&config.tools);
    let tools = registry.list_tools();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("🔧 {} tools available", tools.len());
    println!();
    for tool in &tools {
        println!("  {:<12} {}", tool.name, tool.description);
    }
    println!();
    println!("  Write tools: {}", config.gate.write_tools.join(", "));
    println!("  Check tools: {}", config.gate.check_tools.join(", "));

    Ok(())
}
