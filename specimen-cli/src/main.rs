//! specimen-cli — command-line client for the Specimen image classifier
//!
//! # Subcommands
//! - `predict <path> [--content-type <mime>]` — upload an image and print the label
//! - `files [--json]`                         — list logged predictions, newest first
//! - `status`                                 — show server health

use std::path::Path;

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "specimen-cli",
    version,
    about = "Classify images as plant or animal and browse the prediction log"
)]
struct Cli {
    /// Specimen HTTP server URL (overrides SPECIMEN_HTTP_URL env var)
    #[arg(long, env = "SPECIMEN_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload an image for classification
    Predict {
        /// Image file to upload
        path: String,

        /// Declared MIME type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List logged predictions, newest first
    Files {
        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show Specimen server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub filename: String,
    pub prediction: String,
    pub logged: bool,
}

#[derive(Debug, Deserialize, serde::Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub timestamp: String,
    pub filename: String,
    pub prediction: String,
}

#[derive(Debug, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<FileRecord>,
}

// ============================================================================
// Helpers
// ============================================================================

/// MIME type for common image extensions; anything else is sent as
/// `application/octet-stream` and will be refused by the server.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// One listing line: `#id  timestamp  prediction  filename`.
pub fn format_record(r: &FileRecord) -> String {
    format!("#{:<6} {}  {:<7} {}", r.id, r.timestamp, r.prediction, r.filename)
}

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Print the server's error body and exit non-zero.
fn fail_with_response(resp: reqwest::blocking::Response) -> ! {
    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    let message = body["error"].as_str().unwrap_or("no error message");
    eprintln!("specimen-cli: server returned {}: {}", status, message);
    std::process::exit(1);
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn do_predict(server: &str, path: &str, content_type: Option<String>) -> anyhow::Result<()> {
    let file_path = Path::new(path);
    let data = std::fs::read(file_path)?;
    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime = content_type.unwrap_or_else(|| guess_content_type(file_path).to_string());

    let part = reqwest::blocking::multipart::Part::bytes(data)
        .file_name(filename)
        .mime_str(&mime)?;
    let form = reqwest::blocking::multipart::Form::new().part("file", part);

    let url = format!("{}/predict/image", server);
    let resp = match client(30)?.post(&url).multipart(form).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("specimen-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        fail_with_response(resp);
    }

    let result: PredictResponse = resp.json()?;
    println!("{} -> {}", result.filename, result.prediction);
    if !result.logged {
        eprintln!("specimen-cli: warning: prediction was not logged");
    }

    Ok(())
}

fn do_files(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/files", server);
    let resp = match client(30)?.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("specimen-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        fail_with_response(resp);
    }

    let listing: FilesResponse = resp.json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&listing.files)?);
    } else if listing.files.is_empty() {
        eprintln!("No predictions logged yet");
    } else {
        for r in &listing.files {
            println!("{}", format_record(r));
        }
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);

    match client(10)?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Specimen server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:           {}", body["store"].as_str().unwrap_or("?"));
            println!("Backend:         {}", body["backend"].as_str().unwrap_or("?"));
            println!("Predictor:       {}", body["predictor"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("specimen-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("specimen-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Predict { path, content_type } => do_predict(&server, &path, content_type),
        Commands::Files { json } => do_files(&server, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("specimen-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
