use anyhow::Result;
use lingotube::llm::create_llm;
use lingotube::Config;
use tokio::process::Command;
use tracing::info;

/// Run `tool arg` and return the first line of its output
async fn tool_version(tool: &str, arg: &str) -> Option<String> {
    let output = Command::new(tool).arg(arg).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("lingotube=info,check_tools=info")
        .init();

    let config = Config::load()?;
    let mut ready = true;

    info!("🔍 Checking external tools...");

    let tools = [
        (config.download.tool.as_str(), "--version", "pip install -U yt-dlp"),
        (config.audio.ffmpeg_path.as_str(), "-version", "install ffmpeg from your package manager"),
        (config.audio.ffprobe_path.as_str(), "-version", "ffprobe ships with ffmpeg"),
    ];

    for (tool, arg, hint) in tools {
        match tool_version(tool, arg).await {
            Some(version) => info!("✅ {}: {}", tool, version),
            None => {
                ready = false;
                info!("❌ {} not found", tool);
                info!("💡 {}", hint);
            }
        }
    }

    if config.transcription.api_key.is_some() {
        info!("✅ Transcription API key configured ({})", config.transcription.endpoint);
    } else {
        ready = false;
        info!("❌ No transcription API key");
        info!("💡 export OPENAI_API_KEY=...");
    }

    if config.study.enabled {
        match create_llm(&config.study.provider) {
            Ok(llm) if llm.is_available().await => {
                info!(
                    "✅ {:?} reachable for study materials ({})",
                    llm.provider_type(),
                    config.study.provider.model
                );
            }
            Ok(llm) => {
                ready = false;
                info!("❌ {:?} provider not reachable", llm.provider_type());
            }
            Err(e) => {
                ready = false;
                info!("❌ Study materials misconfigured: {}", e);
            }
        }
    }

    if ready {
        info!("🎉 All components ready!");
    } else {
        info!("⚠️ Some components are missing; lingotube will fail until they are installed");
    }

    Ok(())
}
