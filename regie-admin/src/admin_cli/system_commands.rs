use std::time::Duration;

use clap::Subcommand;

use super::utils::CliResult;

const HEALTHCHECK_PATH: &str = "/api/1/healthcheck";

#[derive(Subcommand)]
pub enum SystemAction {
    #[command(about = "Query a running server's healthcheck")]
    Ping {
        #[arg(default_value = "http://localhost:8000", help = "Base URL of the server")]
        url: String,
        #[arg(short, long, default_value_t = 5, help = "Timeout in seconds")]
        timeout: u64,
    },
}

pub fn handle_system_command(action: SystemAction) -> CliResult {
    match action {
        SystemAction::Ping { url, timeout } => ping_impl(&url, timeout),
    }
}

/// Healthcheck URL under a base URL, with or without a trailing slash
/// or an `/api` suffix.
pub fn healthcheck_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    format!("{}{}", base, HEALTHCHECK_PATH)
}

pub fn ping_impl(base_url: &str, timeout_secs: u64) -> CliResult {
    let url = healthcheck_url(base_url);
    println!("GET {}", url);

    let runtime = tokio::runtime::Runtime::new()?;
    let (status, body) = runtime.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let response = client.get(&url).send().await?;
        let status = response.status();
        let body = response.json::<serde_json::Value>().await?;
        Ok::<_, reqwest::Error>((status, body))
    })?;

    println!("Status: {}", status);
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        return Err(format!("Server is unhealthy ({})", status).into());
    }
    Ok(())
}
