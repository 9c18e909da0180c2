// CLI daemon commands: serve, stop

use std::path::Path;

use reqwest::Client;

use super::{base_url, handle_request_error, read_response};

/// lsq serve
pub async fn cmd_serve(
    config: Option<&str>,
    port_override: Option<u16>,
    data_dir: Option<&str>,
    workers_override: Option<usize>,
) -> anyhow::Result<()> {
    crate::daemon::start_daemon(
        config.map(Path::new),
        data_dir.map(Path::new),
        port_override,
        workers_override,
    )
    .await
}

/// lsq stop
pub async fn cmd_stop(host: &str, port: u16) -> anyhow::Result<()> {
    let client = Client::new();
    let url = format!("{}/api/shutdown", base_url(host, port));

    let response = client
        .post(&url)
        .send()
        .await
        .map_err(|e| handle_request_error(e, host, port))?;
    read_response(response).await?;

    println!("Daemon is shutting down...");
    Ok(())
}
