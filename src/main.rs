use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn, Level};
use voicescribe::audio::list_input_devices;
use voicescribe::{
    AudioSource, Config, PipelineOutcome, RecordingSession, RecordingWriter, SessionConfig,
    TranscriptStatus, TranscriptionError, TranscriptionPipeline,
};

#[derive(Parser)]
#[command(
    name = "voicescribe",
    version,
    about = "Record voice audio and transcribe it with the Whisper API"
)]
struct Cli {
    /// Path to a config file (defaults to ./voicescribe.* if present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone, then transcribe the recording
    Record {
        /// Stop automatically after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Input device name (see `devices`)
        #[arg(long)]
        device: Option<String>,

        /// Save the recording without transcribing it
        #[arg(long)]
        no_transcribe: bool,
    },

    /// Transcribe an existing WAV recording
    Transcribe {
        /// Path to the WAV file
        file: PathBuf,
    },

    /// List available input devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Record {
            duration,
            device,
            no_transcribe,
        } => cmd_record(config, duration, device, no_transcribe).await,
        Command::Transcribe { file } => cmd_transcribe(config, &file).await,
        Command::Devices => cmd_devices(),
    }
}

async fn cmd_record(
    config: Config,
    duration: Option<u64>,
    device: Option<String>,
    no_transcribe: bool,
) -> Result<()> {
    let session_config = SessionConfig {
        source: AudioSource::Microphone,
        device: device.or_else(|| config.audio.device.clone()),
        sample_rate: config.audio.sample_rate,
        channels: config.audio.channels,
    };

    let mut session = RecordingSession::new(session_config);
    session.start().await?;

    match duration {
        Some(secs) => println!("Recording for {secs}s (Ctrl-C stops early)..."),
        None => println!("Recording... press Enter or Ctrl-C to stop."),
    }

    wait_for_stop(duration.map(Duration::from_secs)).await;

    let captured = session.stop().await?;

    if captured.is_empty() {
        println!("No audio captured, nothing to save.");
        return Ok(());
    }

    let writer = RecordingWriter::new(config.storage.recordings_path())?;
    let audio_path = writer.write(&captured)?;
    println!(
        "Saved {} ({:.1}s of audio).",
        audio_path.display(),
        captured.duration_seconds()
    );

    if no_transcribe {
        return Ok(());
    }

    // A missing API key keeps the recording and skips transcription
    let pipeline = match TranscriptionPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(TranscriptionError::Auth(reason)) => {
            warn!("Transcription skipped: {}", reason);
            println!("Recording kept; transcription skipped (no usable API key).");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let outcome = pipeline.transcribe_file(&audio_path).await?;
    report_outcome(&outcome);
    Ok(())
}

async fn cmd_transcribe(config: Config, file: &Path) -> Result<()> {
    let pipeline = TranscriptionPipeline::from_config(&config)?;
    let outcome = pipeline.transcribe_file(file).await?;
    report_outcome(&outcome);
    Ok(())
}

fn cmd_devices() -> Result<()> {
    let devices = list_input_devices()?;

    if devices.is_empty() {
        println!("No input devices found.");
    } else {
        for name in devices {
            println!("{name}");
        }
    }

    Ok(())
}

fn report_outcome(outcome: &PipelineOutcome) {
    match &outcome.status {
        TranscriptStatus::Complete => {
            println!(
                "Transcript saved: {} ({} chunk(s), {} characters)",
                outcome.transcript_path.display(),
                outcome.chunk_count,
                outcome.characters
            );
        }
        TranscriptStatus::PartialFailure { failed_indices } => {
            println!(
                "Transcript saved with gaps: {} ({} of {} chunk(s) failed: {:?})",
                outcome.transcript_path.display(),
                failed_indices.len(),
                outcome.chunk_count,
                failed_indices
            );
        }
        TranscriptStatus::TotalFailure => {
            println!(
                "Transcription failed for every chunk; gap markers written to {}",
                outcome.transcript_path.display()
            );
        }
    }
}

/// Resolve when the recording should stop: Enter, Ctrl-C, or the duration
/// limit, whichever comes first.
async fn wait_for_stop(limit: Option<Duration>) {
    let timer = async {
        match limit {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    let enter = async {
        let mut line = String::new();
        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let _ = stdin.read_line(&mut line).await;
    };

    tokio::select! {
        _ = timer => info!("Duration limit reached"),
        _ = enter => info!("Stop requested"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
}
