//! `docflow server`: start the HTTP server.

use docflow_core::CoreConfig;

pub async fn run(host: String, port: u16, db_path: String, core: CoreConfig) -> Result<(), String> {
    let config = docflow_server::ServerConfig {
        host: host.clone(),
        port,
        db_path,
        core,
    };

    println!("Starting Docflow server on {}:{}...", host, port);

    let addr = docflow_server::start_server(config).await?;
    println!("Docflow server listening on http://{}", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
