//! Command-line interface for talkback
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Record, replay and transcribe speech
#[derive(Parser, Debug)]
#[command(name = "talkback", version, about = "Record, replay and transcribe speech")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory containing the recognition model
    #[arg(long, global = true, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Audio input device name (as listed by `devices`)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub input_device: Option<String>,

    /// Audio output device name (as listed by `devices`)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub output_device: Option<String>,

    /// Emit recognition events as JSON lines instead of plain text
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the microphone, then transcribe the recording
    Record {
        /// Stop automatically after this many seconds instead of waiting
        /// for Enter
        #[arg(long, value_name = "SECONDS")]
        duration: Option<u64>,
    },

    /// Replay the last recording
    Replay,

    /// Transcribe a WAV or raw PCM file
    Transcribe {
        /// File to transcribe (16kHz 16-bit mono)
        file: PathBuf,
    },

    /// List available audio devices
    Devices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_with_duration() {
        let cli = Cli::parse_from(["talkback", "record", "--duration", "5"]);
        assert!(matches!(
            cli.command,
            Commands::Record { duration: Some(5) }
        ));
        assert!(!cli.json);
    }

    #[test]
    fn parses_transcribe_with_global_flags() {
        let cli = Cli::parse_from([
            "talkback",
            "--model",
            "/opt/model",
            "--json",
            "transcribe",
            "take1.wav",
        ]);
        assert_eq!(cli.model, Some(PathBuf::from("/opt/model")));
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Transcribe { ref file } if file == &PathBuf::from("take1.wav")
        ));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["talkback"]).is_err());
    }
}
