//! `agentgate serve`: JSON-RPC tool server on stdin/stdout.

use std::sync::Arc;

use agentgate_config::AppConfig;
use agentgate_protocol::{Dispatcher, LineServer, ServerInfo};
use tracing::info;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(agentgate_tools::default_registry(&config.tools));
    let dispatcher = Dispatcher::new(
        registry,
        ServerInfo {
            name: config.protocol.server_name.clone(),
            version: env!("CARGO_PKG_VERSION").into(),
        },
    );

    let server =
        LineServer::new(Arc::new(dispatcher)).with_max_line_bytes(config.protocol.max_line_bytes);

    info!(
        server = %config.protocol.server_name,
        workspace = %config.tools.workspace_root.display(),
        "Serving tools on stdio"
    );
    let stats = server.serve_stdio().await?;
    info!(
        frames = stats.frames,
        responses = stats.responses,
        rejected = stats.rejected,
        "Input closed, server stopped"
    );

    Ok(())
}
