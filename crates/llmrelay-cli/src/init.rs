//! `llmrelay init` — write `~/.llmrelay/config.json` with defaults.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use llmrelay_core::config::{get_config_path, save_config, Config};

/// Run the init command.
pub fn run(path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    println!();
    println!("{}", "llmrelay — Setup".cyan().bold());
    println!();

    if write_default_config(&config_path)? {
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!("  Next steps:");
    println!(
        "    1. Add API keys to {} (or set OPENROUTER_API_KEY / GROQ_API_KEY)",
        config_path.display()
    );
    println!("    2. Optionally set completion.fallback.model");
    println!("    3. Check with: {}", "llmrelay status".cyan());
    println!();

    Ok(())
}

/// Write the default config unless one exists. Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_defaults_to_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert!(write_default_config(&path).unwrap());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["completion"]["timeoutSecs"], 15);
        assert_eq!(raw["transcription"]["ffmpegPath"], "ffmpeg");
    }

    #[test]
    fn test_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{\"completion\":{\"model\":\"mine\"}}").unwrap();

        assert!(!write_default_config(&path).unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("mine"));
    }
}
