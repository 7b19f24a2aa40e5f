use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::{LLMConfig, LLMProvider};

/// Default OpenAI transcription endpoint
pub const DEFAULT_TRANSCRIPTION_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Upstream upload limit of the transcription service
pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = 25 * 1024 * 1024;

/// Configuration for the lingotube pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source audio download settings
    pub download: DownloadConfig,

    /// Chunking and segment extraction settings
    pub audio: AudioConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Vocabulary and quiz generation settings
    pub study: StudyConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Downloader executable
    pub tool: String,

    /// Audio format requested from the downloader
    pub audio_format: String,

    /// Download retries passed to the tool
    pub retries: u32,

    /// Timeout for the whole download (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Length of one transcription segment in seconds
    pub chunk_length_seconds: u32,

    /// Lossy codec used for segment files
    pub segment_codec: String,

    /// Bitrate of segment files
    pub segment_bitrate: String,

    /// File extension matching the codec
    pub segment_extension: String,

    /// Segments smaller than this are skipped as degenerate cuts
    pub min_segment_bytes: u64,

    /// Segments larger than this are rejected before upload
    pub max_segment_bytes: u64,

    /// Number of segments cut concurrently
    pub extraction_concurrency: usize,

    /// Timeout for a single ffmpeg/ffprobe invocation (seconds)
    pub tool_timeout_seconds: u64,

    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// ffprobe executable
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// API endpoint for the transcription service
    pub endpoint: String,

    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Model to use for transcription
    pub model: String,

    /// Language hint for transcription
    pub language: String,

    /// Timeout for one segment request (seconds)
    pub timeout_seconds: u64,

    /// Treat a run that produced no cues at all as an error
    pub fail_on_empty_transcript: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Generate vocabulary and quizzes after transcription
    pub enabled: bool,

    /// Language used for word meanings
    pub meaning_language: String,

    /// Text completion provider
    pub provider: LLMConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for transcript, subtitle and study files
    pub base_dir: PathBuf,

    /// Root for per-run temporary directories (system temp dir when unset)
    pub work_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            tool: "yt-dlp".to_string(),
            audio_format: "mp3".to_string(),
            retries: 3,
            timeout_seconds: 600, // 10 minutes
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_length_seconds: 600, // 10 minutes
            segment_codec: "libmp3lame".to_string(),
            segment_bitrate: "64k".to_string(),
            segment_extension: "mp3".to_string(),
            min_segment_bytes: 1024,
            max_segment_bytes: DEFAULT_MAX_SEGMENT_BYTES,
            extraction_concurrency: num_cpus::get().clamp(1, 4),
            tool_timeout_seconds: 300,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TRANSCRIPTION_ENDPOINT.to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: "en".to_string(),
            timeout_seconds: 300,
            fail_on_empty_transcript: false,
        }
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            meaning_language: "Japanese".to_string(),
            provider: LLMConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            work_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("lingotube.toml"),
            PathBuf::from("config/lingotube.toml"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            config_paths.push(PathBuf::from(home).join(".config/lingotube/config.toml"));
        }
        config_paths.push(PathBuf::from("/etc/lingotube/config.toml"));

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        config.apply_env_overrides();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.transcription.api_key = Some(api_key.clone());
                if self.study.provider.api_key.is_none() {
                    self.study.provider.api_key = Some(api_key);
                }
            }
        }

        if let Ok(api_key) = std::env::var("LINGOTUBE_API_KEY") {
            if !api_key.trim().is_empty() {
                self.transcription.api_key = Some(api_key);
            }
        }

        if let Ok(chunk) = std::env::var("LINGOTUBE_CHUNK_SECONDS") {
            match chunk.parse() {
                Ok(seconds) => self.audio.chunk_length_seconds = seconds,
                Err(_) => tracing::warn!("Ignoring invalid LINGOTUBE_CHUNK_SECONDS: {}", chunk),
            }
        }

        if let Ok(min_bytes) = std::env::var("LINGOTUBE_MIN_SEGMENT_BYTES") {
            match min_bytes.parse() {
                Ok(bytes) => self.audio.min_segment_bytes = bytes,
                Err(_) => {
                    tracing::warn!("Ignoring invalid LINGOTUBE_MIN_SEGMENT_BYTES: {}", min_bytes)
                }
            }
        }

        if let Ok(language) = std::env::var("LINGOTUBE_LANGUAGE") {
            self.transcription.language = language;
        }

        if let Ok(output_dir) = std::env::var("LINGOTUBE_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(work_dir) = std::env::var("LINGOTUBE_WORK_DIR") {
            self.output.work_dir = Some(PathBuf::from(work_dir));
        }

        if let Ok(log_level) = std::env::var("LINGOTUBE_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.chunk_length_seconds == 0 {
            return Err(anyhow!("chunk_length_seconds must be greater than 0"));
        }

        if self.audio.extraction_concurrency == 0 {
            return Err(anyhow!("extraction_concurrency must be greater than 0"));
        }

        if self.audio.min_segment_bytes >= self.audio.max_segment_bytes {
            return Err(anyhow!(
                "min_segment_bytes ({}) must be smaller than max_segment_bytes ({})",
                self.audio.min_segment_bytes,
                self.audio.max_segment_bytes
            ));
        }

        if self.transcription.language.trim().is_empty() {
            return Err(anyhow!("transcription language must not be empty"));
        }

        if self.transcription.endpoint.trim().is_empty() {
            return Err(anyhow!("transcription endpoint must not be empty"));
        }

        if self.study.enabled {
            match self.study.provider.provider {
                LLMProvider::OpenAI if self.study.provider.api_key.is_none() => {
                    return Err(anyhow!("API key required for study material generation"));
                }
                LLMProvider::LMStudio if self.study.provider.endpoint.is_none() => {
                    return Err(anyhow!("LM Studio endpoint required for study material generation"));
                }
                _ => {}
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "lingotube configuration:\n\
            - Chunk length: {}s\n\
            - Segment codec: {} @ {}\n\
            - Minimum segment size: {} bytes\n\
            - Extraction concurrency: {}\n\
            - Transcription model: {} ({})\n\
            - API key configured: {}\n\
            - Study materials: {}\n\
            - Output directory: {}",
            self.audio.chunk_length_seconds,
            self.audio.segment_codec,
            self.audio.segment_bitrate,
            self.audio.min_segment_bytes,
            self.audio.extraction_concurrency,
            self.transcription.model,
            self.transcription.language,
            self.transcription.api_key.is_some(),
            self.study.enabled,
            self.output.base_dir.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_chunk_length(mut self, seconds: u32) -> Self {
        self.config.audio.chunk_length_seconds = seconds;
        self
    }

    pub fn with_min_segment_bytes(mut self, bytes: u64) -> Self {
        self.config.audio.min_segment_bytes = bytes;
        self
    }

    pub fn with_extraction_concurrency(mut self, concurrency: usize) -> Self {
        self.config.audio.extraction_concurrency = concurrency;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn with_language(mut self, language: String) -> Self {
        self.config.transcription.language = language;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.work_dir = Some(dir);
        self
    }

    pub fn fail_on_empty_transcript(mut self, fail: bool) -> Self {
        self.config.transcription.fail_on_empty_transcript = fail;
        self
    }

    pub fn enable_study_materials(mut self, enable: bool) -> Self {
        self.config.study.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
