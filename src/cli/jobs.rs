// CLI job commands: submit, status, list, pool

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use super::{base_url, handle_request_error, read_response, PoolAction};

const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Format a relative time string like "2 minutes ago".
fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(*dt).num_seconds().max(0);
    if secs < 60 {
        format!("{} seconds ago", secs)
    } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
    } else if secs < 86400 {
        format!("{} hours ago", secs / 3600)
    } else {
        format!("{} days ago", secs / 86400)
    }
}

fn relative_field(job: &Value, field: &str) -> String {
    job[field]
        .as_str()
        .and_then(|ts| ts.parse::<DateTime<Utc>>().ok())
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|| "-".to_string())
}

fn is_terminal(job: &Value) -> bool {
    matches!(job["status"].as_str(), Some("completed") | Some("failed"))
}

/// Records per platform, e.g. "zhihu: 5, linkedin: 0".
fn result_summary(job: &Value) -> String {
    match job["result"].as_object() {
        Some(result) if !result.is_empty() => result
            .iter()
            .map(|(platform, payload)| {
                let count = payload.as_array().map(|a| a.len()).unwrap_or(1);
                format!("{}: {}", platform, count)
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => "-".to_string(),
    }
}

fn print_job(job: &Value) {
    println!("Job:        {}", job["id"].as_str().unwrap_or("?"));
    println!("Owner:      {}", job["owner"].as_str().unwrap_or("?"));
    println!("Keywords:   {}", job["keywords"].as_str().unwrap_or("?"));
    let platforms: Vec<&str> = job["platforms"]
        .as_array()
        .map(|a| a.iter().filter_map(|p| p.as_str()).collect())
        .unwrap_or_default();
    println!("Platforms:  {}", platforms.join(", "));
    println!("Status:     {}", job["status"].as_str().unwrap_or("?"));
    println!("Progress:   {}%", job["progress"].as_u64().unwrap_or(0));
    println!("Created:    {}", relative_field(job, "created_at"));
    println!("Started:    {}", relative_field(job, "started_at"));
    println!("Finished:   {}", relative_field(job, "completed_at"));
    if let Some(error) = job["error"].as_str() {
        println!("Error:      {}", error);
    } else {
        println!("Results:    {}", result_summary(job));
    }
}

async fn fetch_job(client: &Client, host: &str, port: u16, job: &str) -> anyhow::Result<Value> {
    let url = format!("{}/api/jobs/{}", base_url(host, port), job);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| handle_request_error(e, host, port))?;
    read_response(response).await
}

/// lsq submit
pub async fn cmd_submit(
    host: &str,
    port: u16,
    keywords: &str,
    platforms: &[String],
    owner: &str,
    wait: bool,
    json: bool,
) -> anyhow::Result<()> {
    let client = Client::new();
    let url = format!("{}/api/jobs", base_url(host, port));

    let response = client
        .post(&url)
        .json(&json!({
            "keywords": keywords,
            "platforms": platforms,
            "owner": owner,
        }))
        .send()
        .await
        .map_err(|e| handle_request_error(e, host, port))?;
    let mut job = read_response(response).await?;

    let id = job["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Daemon response is missing the job id"))?
        .to_string();

    if wait {
        if !json {
            println!("Submitted job {}, waiting for it to finish...", id);
        }
        while !is_terminal(&job) {
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            job = fetch_job(&client, host, port, &id).await?;
            tracing::debug!("Job {} is {}", id, job["status"]);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else if wait {
        print_job(&job);
    } else {
        println!("Submitted job {}", id);
        println!("Check progress with: lsq status {}", id);
    }
    Ok(())
}

/// lsq status
pub async fn cmd_status(host: &str, port: u16, job: &str, json: bool) -> anyhow::Result<()> {
    let client = Client::new();
    let body = fetch_job(&client, host, port, job).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_job(&body);
    }
    Ok(())
}

/// lsq list
pub async fn cmd_list(host: &str, port: u16, owner: &str, json: bool) -> anyhow::Result<()> {
    let client = Client::new();
    let url = format!("{}/api/jobs", base_url(host, port));

    let response = client
        .get(&url)
        .query(&[("owner", owner)])
        .send()
        .await
        .map_err(|e| handle_request_error(e, host, port))?;
    let body = read_response(response).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let empty_vec = vec![];
    let jobs = body.as_array().unwrap_or(&empty_vec);

    if jobs.is_empty() {
        println!("No jobs found for {}.", owner);
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:<24}{:<18}{}",
        "ID", "STATUS", "KEYWORDS", "CREATED", "RESULTS"
    );

    for job in jobs {
        let keywords = job["keywords"].as_str().unwrap_or("?");
        let display_keywords = if keywords.chars().count() > 23 {
            format!("{}...", keywords.chars().take(20).collect::<String>())
        } else {
            keywords.to_string()
        };

        let outcome = match job["error"].as_str() {
            Some(error) => error.to_string(),
            None => result_summary(job),
        };

        println!(
            "{:<38}{:<11}{:<24}{:<18}{}",
            job["id"].as_str().unwrap_or("?"),
            job["status"].as_str().unwrap_or("?"),
            display_keywords,
            relative_field(job, "created_at"),
            outcome
        );
    }

    Ok(())
}

/// lsq pool start|stop
pub async fn cmd_pool(host: &str, port: u16, action: PoolAction) -> anyhow::Result<()> {
    let client = Client::new();
    let url = format!("{}/api/pool/{}", base_url(host, port), action.as_str());

    let response = client
        .post(&url)
        .send()
        .await
        .map_err(|e| handle_request_error(e, host, port))?;
    let body = read_response(response).await?;

    if body["running"].as_bool().unwrap_or(false) {
        println!("Worker pool is running.");
    } else {
        println!("Worker pool is stopped. In-flight jobs will finish.");
    }
    Ok(())
}
