//! Shared CLI helpers — path expansion, input classification, output printing.

use std::path::PathBuf;

use colored::Colorize;

use llmrelay_core::types::GenerationResponse;
use llmrelay_core::TranscriptResult;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Whether a transcription input should be sent as a URL rather than read from disk.
pub fn is_url(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Print a completion response to stdout.
pub fn print_response(response: &GenerationResponse) {
    println!();
    let mut header = format!("{}", response.model.cyan().bold());
    if !response.provider.is_empty() {
        header.push_str(&format!(" via {}", response.provider).dimmed().to_string());
    }
    println!("{header}");

    let calls = response.tool_calls();
    match response.content() {
        Some(content) if !content.is_empty() => println!("{content}"),
        _ if !calls.is_empty() => {}
        _ => println!("{}", "(no response)".dimmed()),
    }
    for call in calls {
        println!(
            "{} {}({})",
            "→".yellow(),
            call.function.name.bold(),
            call.function.arguments
        );
    }

    println!(
        "{}",
        format!(
            "tokens: {} prompt / {} completion",
            response.usage.prompt_tokens, response.usage.completion_tokens
        )
        .dimmed()
    );
    println!();
}

/// Print a merged transcript to stdout.
pub fn print_transcript(result: &TranscriptResult) {
    println!();
    if result.text.trim().is_empty() {
        println!("{}", "(no speech detected)".dimmed());
    } else {
        println!("{}", result.text.trim());
    }
    println!("{}", format_duration(result.duration).dimmed());
    println!();
}

/// `"1m 05.3s"`-style rendering of an audio duration in seconds.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - (minutes as f64) * 60.0;
    if minutes == 0 {
        format!("{rest:.1}s")
    } else {
        format!("{minutes}m {rest:04.1}s")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
