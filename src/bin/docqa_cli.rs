use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reqwest::multipart;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(
    name = "docqa-cli",
    about = "Command-line client for a running docqa HTTP server"
)]
struct Cli {
    /// Base URL of the docqa server.
    #[arg(long, env = "DOCQA_SERVER", default_value = "http://127.0.0.1:4100")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a .pdf or .txt file, replacing the loaded document.
    Upload {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ask a question about the loaded document.
    Ask {
        question: String,
        #[arg(long, default_value = "qa")]
        mode: String,
        #[arg(long, default_value = "english")]
        language: String,
    },
    /// Print the raw chunks nearest to a query.
    Recall {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Drop the loaded document.
    Reset,
    /// Print pipeline counters.
    Metrics,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .user_agent("docqa-cli")
        .build()
        .context("failed to build HTTP client")?;
    let base = cli.server.trim_end_matches('/');

    match cli.command {
        Command::Upload { file } => {
            let form = upload_form(&file).await?;
            let value = send(client.post(format!("{base}/upload")).multipart(form)).await?;
            print_json(&value)
        }
        Command::Ask {
            question,
            mode,
            language,
        } => {
            let body = json!({ "question": question, "mode": mode, "language": language });
            let value = send(client.post(format!("{base}/answer")).json(&body)).await?;
            match value.get("answer").and_then(Value::as_str) {
                Some(answer) => {
                    println!("{answer}");
                    Ok(())
                }
                None => print_json(&value),
            }
        }
        Command::Recall { query, top_k } => {
            let body = json!({ "query": query, "top_k": top_k });
            let value = send(client.post(format!("{base}/recall")).json(&body)).await?;
            print_json(&value)
        }
        Command::Reset => {
            let value = send(client.post(format!("{base}/reset"))).await?;
            print_json(&value)
        }
        Command::Metrics => {
            let value = send(client.get(format!("{base}/metrics"))).await?;
            print_json(&value)
        }
    }
}

async fn upload_form(path: &Path) -> Result<multipart::Form> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let part = multipart::Part::bytes(bytes).file_name(filename);
    Ok(multipart::Form::new().part("file", part))
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await.context("request to docqa failed")?;
    let status = response.status();
    let value: Value = response
        .json()
        .await
        .context("docqa returned a non-JSON body")?;
    if !status.is_success() {
        let detail = value
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or("no detail");
        bail!("docqa returned {status}: {detail}");
    }
    Ok(value)
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to format response")?
    );
    Ok(())
}
