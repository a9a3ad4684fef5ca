//! `llmrelay status` — show configuration and endpoint status.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use tokio::process::Command;

use llmrelay_core::config::{get_config_path, load_config};
use llmrelay_core::utils::expand_home;

/// Run the status command.
pub async fn run(path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let config = load_config(Some(&config_path));

    println!();
    println!("{}", "llmrelay Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    // Completion
    let completion = &config.completion;
    println!();
    println!("  {}", "Completion:".bold());
    println!("    {:<16} {}", "Endpoint:", completion.api_base);
    println!("    {:<16} {}", "Model:", completion.model);
    println!("    {:<16} {}", "API key:", key_status(completion.is_configured()));
    println!(
        "    {:<16} {}",
        "Timeout:",
        format!("{}s", completion.timeout_secs).dimmed()
    );
    let fallback = match (&completion.fallback, completion.retry_enabled) {
        (Some(f), true) => format!("{} {}", "✓".green(), f.model),
        (Some(f), false) => format!("{} (retry disabled)", f.model.dimmed()),
        (None, _) => format!("{}", "· none".dimmed()),
    };
    println!("    {:<16} {}", "Fallback:", fallback);

    // Transcription
    let transcription = &config.transcription;
    println!();
    println!("  {}", "Transcription:".bold());
    println!("    {:<16} {}", "Endpoint:", transcription.api_base);
    println!("    {:<16} {}", "Model:", transcription.model);
    println!(
        "    {:<16} {}",
        "API key:",
        key_status(transcription.is_configured())
    );
    println!(
        "    {:<16} {}",
        "Upload limit:",
        format!("{} bytes", transcription.max_upload_bytes).dimmed()
    );
    let ffmpeg = if binary_available(&ffmpeg_binary(&transcription.ffmpeg_path)).await {
        format!("{} {}", "✓".green(), transcription.ffmpeg_path)
    } else {
        format!("{} {}", transcription.ffmpeg_path, "(not found)".red())
    };
    println!("    {:<16} {}", "ffmpeg:", ffmpeg);

    println!();

    Ok(())
}

fn key_status(configured: bool) -> String {
    if configured {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

/// The ffmpeg binary the transcriber will run, with `~` expanded.
fn ffmpeg_binary(configured: &str) -> PathBuf {
    expand_home(configured)
}

/// Whether `binary -version` runs successfully.
async fn binary_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
