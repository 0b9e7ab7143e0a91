//! Command-line interface for wakestream
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streaming voice-activity and wake-word detection
#[derive(Parser, Debug)]
#[command(name = "wakestream", version, about = "Streaming wake-word detection")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress per-event output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (per-window scores)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the detectors over a 16kHz mono WAV file
    Scan {
        /// WAV file to scan
        wav: PathBuf,

        /// Directory holding the model graphs
        #[arg(long, value_name = "DIR")]
        model_dir: Option<PathBuf>,

        /// Wake-word detection threshold override
        #[arg(long, value_name = "SCORE")]
        threshold: Option<f32>,
    },

    /// Listen on a microphone and report detections
    Listen {
        /// Audio input device (e.g., pipewire)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,

        /// Directory holding the model graphs
        #[arg(long, value_name = "DIR")]
        model_dir: Option<PathBuf>,

        /// Stop after this long (default: run until interrupted). Examples: 30s, 5m, 1h30m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_secs)]
        duration: Option<u64>,
    },

    /// List available audio input devices
    Devices,

    /// Print the effective configuration as TOML
    Config,
}

/// Parse a duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`).
fn parse_duration_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}
