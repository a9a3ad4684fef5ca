//! llmrelay CLI — entry point.
//!
//! # Commands
//!
//! - `llmrelay chat -m MESSAGE [--model M] [--system S] [--schema FILE]` — one completion
//! - `llmrelay transcribe INPUT [--language L] [--model M]` — file path or URL
//! - `llmrelay init` — write a default config file
//! - `llmrelay status` — show configuration and endpoint status

mod helpers;
mod init;
mod status;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use llmrelay_core::config::load_config;
use llmrelay_core::types::{Message, StructuredOutputSchema};
use llmrelay_core::{AudioJob, GenerationRequest};
use llmrelay_providers::{CompletionClient, GroqTranscriber, TranscriptionProvider};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// llmrelay — completions with model fallback and chunked Whisper transcription
#[derive(Parser)]
#[command(name = "llmrelay", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.llmrelay/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the completion endpoint
    Chat {
        /// User message
        #[arg(short, long)]
        message: String,

        /// Model identifier (config default otherwise)
        #[arg(long)]
        model: Option<String>,

        /// Optional system prompt
        #[arg(short, long)]
        system: Option<String>,

        /// Structured-output schema file (JSON: name, strict, schema)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f64>,

        /// Call deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the full JSON response
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Transcribe an audio file or URL
    Transcribe {
        /// Audio file path or http(s) URL
        input: String,

        /// Spoken language (ISO-639-1)
        #[arg(short, long)]
        language: Option<String>,

        /// Whisper model (config default otherwise)
        #[arg(long)]
        model: Option<String>,

        /// Per-call deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write a default configuration file
    Init,

    /// Show configuration and endpoint status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Chat {
            message,
            model,
            system,
            schema,
            temperature,
            timeout,
            json,
            logs,
        } => {
            init_logging(logs);
            let opts = ChatOptions {
                message,
                model,
                system,
                schema,
                temperature,
                timeout,
                json,
            };
            run_chat(config_path, opts).await
        }
        Commands::Transcribe {
            input,
            language,
            model,
            timeout,
            logs,
        } => {
            init_logging(logs);
            run_transcribe(config_path, input, language, model, timeout).await
        }
        Commands::Init => init::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()).await,
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

struct ChatOptions {
    message: String,
    model: Option<String>,
    system: Option<String>,
    schema: Option<PathBuf>,
    temperature: Option<f64>,
    timeout: Option<u64>,
    json: bool,
}

async fn run_chat(config_path: Option<PathBuf>, opts: ChatOptions) -> Result<()> {
    let config = load_config(config_path.as_deref());
    if !config.completion.is_configured() {
        bail!("no completion API key configured (set OPENROUTER_API_KEY or completion.apiKey)");
    }

    let client = CompletionClient::from_config(&config.completion);
    let model = opts.model.unwrap_or_else(|| client.default_model().to_string());

    let mut messages = Vec::new();
    if let Some(system) = opts.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(opts.message));

    let mut builder = GenerationRequest::builder(&model).messages(messages);
    if let Some(path) = &opts.schema {
        builder = builder.schema(read_schema(path)?);
    }
    if let Some(t) = opts.temperature {
        builder = builder.temperature(t);
    }
    if let Some(secs) = opts.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let request = builder.build()?;

    info!(model = %model, "sending completion request");
    let response = client
        .generate(&request)
        .await
        .context("completion request failed")?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        helpers::print_response(&response);
    }
    Ok(())
}

/// Load a structured-output schema from a JSON file.
fn read_schema(path: &std::path::Path) -> Result<StructuredOutputSchema> {
    let path = helpers::expand_tilde(&path.to_string_lossy());
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid schema file {}", path.display()))
}

// ─────────────────────────────────────────────
// Transcribe command
// ─────────────────────────────────────────────

async fn run_transcribe(
    config_path: Option<PathBuf>,
    input: String,
    language: Option<String>,
    model: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let config = load_config(config_path.as_deref());
    if !config.transcription.is_configured() {
        bail!("no transcription API key configured (set GROQ_API_KEY or transcription.apiKey)");
    }

    let mut builder = AudioJob::builder().upload_limit_bytes(config.transcription.max_upload_bytes);
    if helpers::is_url(&input) {
        builder = builder.url(input.as_str());
    } else {
        let path = helpers::expand_tilde(&input);
        let audio = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read audio file {}", path.display()))?;
        builder = builder.bytes(audio);
    }
    if let Some(language) = language {
        builder = builder.language(language);
    }
    if let Some(model) = model {
        builder = builder.model(model);
    }
    if let Some(secs) = timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let job = builder.build()?;

    let transcriber = GroqTranscriber::from_config(&config.transcription);
    info!(input = %input, "starting transcription");
    let result = transcriber
        .transcribe(&job)
        .await
        .context("transcription failed")?;

    helpers::print_transcript(&result);
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("llmrelay=debug,llmrelay_core=debug,llmrelay_providers=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
