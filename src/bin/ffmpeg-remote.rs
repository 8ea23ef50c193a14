//! CLI client for the ffmpeg transcoding server.
//!
//! ```bash
//! ffmpeg-remote ping
//! ffmpeg-remote submit input.mkv output.mp4 -- -c:v libx264 -preset fast
//! ffmpeg-remote status <id>
//! ffmpeg-remote cancel <id>
//! ffmpeg-remote list --state running
//! ```

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use uuid::Uuid;

const DEFAULT_SERVER: &str = "http://127.0.0.1:18080";

#[derive(Parser, Debug)]
#[command(name = "ffmpeg-remote")]
#[command(version)]
#[command(about = "CLI client for the ffmpeg transcoding server")]
struct Cli {
    /// Server base URL
    #[arg(long, default_value = DEFAULT_SERVER)]
    server: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the server health endpoint
    Ping,

    /// Submit a transcoding job
    Submit {
        /// Input file or URI
        source: String,

        /// Output file
        output: String,

        /// Extra transcoder arguments, after `--`
        #[arg(last = true)]
        options: Vec<String>,
    },

    /// Show the status of a job
    Status { id: Uuid },

    /// Cancel a job
    Cancel { id: Uuid },

    /// List jobs, optionally filtered by state
    List {
        /// queued, running, succeeded, failed or cancelled
        #[arg(long)]
        state: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()
        .context("failed to build HTTP client")?;
    let base = cli.server.trim_end_matches('/').to_string();

    let body = match cli.command {
        Commands::Ping => {
            let res = client
                .get(format!("{base}/health"))
                .send()
                .await
                .context("ping failed")?;
            expect_json(res).await.context("ping failed")?
        }
        Commands::Submit {
            source,
            output,
            options,
        } => {
            let payload = json!({
                "source": source,
                "output": output,
                "options": options,
            });
            let res = client
                .post(format!("{base}/api/v1/jobs"))
                .json(&payload)
                .send()
                .await
                .context("submit failed")?;
            expect_json(res).await.context("submit failed")?
        }
        Commands::Status { id } => {
            let res = client
                .get(format!("{base}/api/v1/jobs/{id}"))
                .send()
                .await
                .context("status failed")?;
            expect_json(res).await.context("status failed")?
        }
        Commands::Cancel { id } => {
            let res = client
                .delete(format!("{base}/api/v1/jobs/{id}"))
                .send()
                .await
                .context("cancel failed")?;
            expect_json(res).await.context("cancel failed")?
        }
        Commands::List { state } => {
            let mut req = client.get(format!("{base}/api/v1/jobs"));
            if let Some(state) = state {
                req = req.query(&[("state", state)]);
            }
            let res = req.send().await.context("list failed")?;
            expect_json(res).await.context("list failed")?
        }
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Decode the response body, turning the server's error envelope into a
/// readable failure on non-2xx statuses.
async fn expect_json(res: reqwest::Response) -> anyhow::Result<Value> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(body);
    }
    let code = body
        .pointer("/error/code")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN");
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("no error detail");
    anyhow::bail!("server returned {status}: {message} ({code})")
}
