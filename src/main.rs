use anyhow::Result;
use clap::Parser;
use lingotube::{Config, Pipeline, StudyMaterialGenerator};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

#[derive(Parser)]
#[command(name = "lingotube")]
#[command(version, author = "TigreRoll")]
#[command(about = "Transcribe long YouTube videos into English study material")]
struct Cli {
    /// YouTube video URL
    url: String,

    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Segment length in seconds
    #[arg(long, value_name = "SECS")]
    chunk_length: Option<u32>,

    /// Output directory for transcript files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Extract important words and phrases
    #[arg(long)]
    vocabulary: bool,

    /// Generate a comprehension quiz
    #[arg(long)]
    quiz: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Filter directives used when RUST_LOG is not set
fn default_directives(verbose: bool, log_level: &str) -> String {
    if verbose {
        "lingotube=debug,warn".to_string()
    } else {
        format!("lingotube={},warn", log_level)
    }
}

fn log_filter(verbose: bool, log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, log_level)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging before config; the configured level is applied after loading
    let (filter, filter_handle) = reload::Layer::new(log_filter(cli.verbose, "info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(chunk) = cli.chunk_length {
        config.audio.chunk_length_seconds = chunk;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.base_dir = dir.clone();
    }
    if cli.vocabulary || cli.quiz {
        config.study.enabled = true;
    }

    if let Err(e) = filter_handle.reload(log_filter(cli.verbose, &config.output.log_level)) {
        warn!("Failed to apply log level {}: {}", config.output.log_level, e);
    }

    config.validate()?;
    info!("🚀 lingotube starting...");
    info!("{}", config.summary());

    let output_dir = config.output.base_dir.clone();
    let study_config = config.study.clone();
    let pipeline = Pipeline::from_config(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, stopping after the current segment...");
            ctrl_c_token.cancel();
        }
    });

    let report = pipeline.transcribe_with_cancel(&cli.url, &cancel).await?;
    report.save_to_dir(&output_dir).await?;

    if !report.failed_segments.is_empty() {
        for failure in &report.failed_segments {
            warn!(
                "⚠️ Segment {} missing ({:?}): {}",
                failure.index, failure.stage, failure.reason
            );
        }
    }

    if cli.vocabulary || cli.quiz {
        let generator = StudyMaterialGenerator::new(&study_config)?;

        if cli.vocabulary {
            let vocabulary = generator.extract_vocabulary(&report.full_text).await?;
            let path = output_dir.join("vocabulary.json");
            tokio::fs::write(&path, serde_json::to_string_pretty(&vocabulary)?).await?;
            info!(
                "📚 {} words and {} phrases saved to {}",
                vocabulary.important_words.len(),
                vocabulary.important_phrases.len(),
                path.display()
            );
        }

        if cli.quiz {
            let quiz = generator.generate_quiz(&report.full_text).await?;
            let malformed = quiz.iter().filter(|item| !item.is_well_formed()).count();
            if malformed > 0 {
                warn!("{} quiz items have an answer that is not among the choices", malformed);
            }
            let path = output_dir.join("quiz.json");
            tokio::fs::write(&path, serde_json::to_string_pretty(&quiz)?).await?;
            info!("📝 {} quiz questions saved to {}", quiz.len(), path.display());
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Video:     {}", report.video_id);
        println!("Duration:  {:.1}s", report.duration_seconds);
        println!("Segments:  {}", report.segment_count);
        println!("Cues:      {}", report.cue_count);
        println!("Failed:    {}", report.failed_segments.len());
        println!("Skipped:   {}", report.skipped_segments.len());
        println!("Output:    {}", output_dir.display());
    }

    Ok(())
}
