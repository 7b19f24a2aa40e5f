use async_trait::async_trait;
use lingotube::audio::{MediaToolError, SegmentEncoding};
use lingotube::download::DownloadError;
use lingotube::transcription::TranscriptionError;
use lingotube::{
    AudioDownloader, ConfigBuilder, MediaToolkit, Pipeline, PipelineError, PipelineStage,
    SpeechToText,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Writes a small fake audio file, or fails like a missing yt-dlp
struct FakeDownloader {
    fail: bool,
    seen_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeDownloader {
    fn ok() -> Self {
        Self {
            fail: false,
            seen_dirs: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            seen_dirs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AudioDownloader for FakeDownloader {
    async fn download_audio(&self, _video_url: &str, work_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.seen_dirs.lock().unwrap().push(work_dir.to_path_buf());
        if self.fail {
            return Err(DownloadError::ExitStatus {
                tool: "yt-dlp".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "ERROR: Video unavailable".to_string(),
            });
        }
        let path = work_dir.join("source.mp3");
        tokio::fs::write(&path, vec![1u8; 4096]).await.unwrap();
        Ok(path)
    }
}

/// Reports a fixed duration and writes 2 KiB per segment
struct FakeToolkit {
    duration: Result<f64, ()>,
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, MediaToolError> {
        self.duration
            .map_err(|_| MediaToolError::InvalidOutput("duration 'N/A'".to_string()))
    }

    async fn cut_segment(
        &self,
        source: &Path,
        _start_seconds: f64,
        _length_seconds: f64,
        _encoding: &SegmentEncoding,
        output: &Path,
    ) -> Result<(), MediaToolError> {
        assert!(source.exists());
        tokio::fs::write(output, vec![0u8; 2048]).await.unwrap();
        Ok(())
    }
}

/// Returns one cue per segment, failing the segments listed in `fail`
struct FakeTranscriber {
    fail: Vec<usize>,
    calls: AtomicUsize,
    cancel_on_call: Option<(usize, CancellationToken)>,
    panic_on_segment: Option<usize>,
}

impl FakeTranscriber {
    fn new(fail: Vec<usize>) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
            cancel_on_call: None,
            panic_on_segment: None,
        }
    }
}

#[async_trait]
impl SpeechToText for FakeTranscriber {
    async fn transcribe_timed_text(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }

        // segment_0003.mp3 -> 3
        let index: usize = audio_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.strip_prefix("segment_"))
            .and_then(|n| n.parse().ok())
            .unwrap();

        if self.panic_on_segment == Some(index) {
            panic!("transcriber crashed on segment {index}");
        }

        if self.fail.contains(&index) {
            return Err(TranscriptionError::Api {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(format!(
            "1\n00:00:01,000 --> 00:00:03,000\nsegment {index}\n\n"
        ))
    }
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

fn pipeline(
    work_root: &Path,
    downloader: FakeDownloader,
    duration: Result<f64, ()>,
    transcriber: FakeTranscriber,
    fail_on_empty: bool,
) -> (Pipeline, Arc<FakeDownloader>) {
    let config = ConfigBuilder::new()
        .with_chunk_length(600)
        .with_work_dir(work_root.to_path_buf())
        .fail_on_empty_transcript(fail_on_empty)
        .build();
    let downloader = Arc::new(downloader);
    let pipeline = Pipeline::with_components(
        config,
        downloader.clone(),
        Arc::new(FakeToolkit { duration }),
        Arc::new(transcriber),
    );
    (pipeline, downloader)
}

#[tokio::test]
async fn test_successful_run_merges_segments_and_cleans_up() {
    let root = TempDir::new().unwrap();
    let (pipeline, downloader) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1500.0),
        FakeTranscriber::new(vec![]),
        false,
    );

    let report = pipeline.transcribe(VIDEO_URL).await.unwrap();

    assert_eq!(report.video_id, "dQw4w9WgXcQ");
    assert_eq!(report.segment_count, 3);
    assert_eq!(report.cue_count, 3);
    assert_eq!(report.full_text, "segment 0 segment 1 segment 2");
    assert!(report.timed_text.contains("2\n00:10:01,000 --> 00:10:03,000\nsegment 1"));
    assert!(report.timed_text.contains("3\n00:20:01,000 --> 00:20:03,000\nsegment 2"));
    assert!(report.is_complete());
    assert_eq!(pipeline.stage(), PipelineStage::Done);

    let run_dir = downloader.seen_dirs.lock().unwrap()[0].clone();
    assert!(run_dir.starts_with(root.path()));
    assert!(!run_dir.exists());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_partial_failure_is_reported_not_fatal() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(3000.0),
        FakeTranscriber::new(vec![2]),
        false,
    );

    let report = pipeline.transcribe(VIDEO_URL).await.unwrap();

    assert_eq!(report.segment_count, 5);
    assert_eq!(report.cue_count, 4);
    assert_eq!(report.failed_segments.len(), 1);
    assert_eq!(report.failed_segments[0].index, 2);
    let numbers: Vec<u32> = report.track.iter().map(|c| c.sequence_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(!report.full_text.contains("segment 2"));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_download_failure_cleans_up() {
    let root = TempDir::new().unwrap();
    let (pipeline, downloader) = pipeline(
        root.path(),
        FakeDownloader::failing(),
        Ok(1500.0),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::DownloadFailed { .. }));
    assert_eq!(pipeline.stage(), PipelineStage::Failed);
    assert_eq!(downloader.seen_dirs.lock().unwrap().len(), 1);
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_probe_failure_cleans_up() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Err(()),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::ProbeFailed { .. }));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_zero_duration_is_probe_failure() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(0.0),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::ProbeFailed { .. }));
}

#[tokio::test]
async fn test_invalid_url_fails_before_any_work() {
    let root = TempDir::new().unwrap();
    let (pipeline, downloader) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1500.0),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe("https://example.com/video").await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidUrl(_)));
    assert!(downloader.seen_dirs.lock().unwrap().is_empty());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_all_segments_failing_returns_empty_report_by_default() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1200.0),
        FakeTranscriber::new(vec![0, 1]),
        false,
    );

    let report = pipeline.transcribe(VIDEO_URL).await.unwrap();

    assert_eq!(report.cue_count, 0);
    assert_eq!(report.full_text, "");
    assert_eq!(report.timed_text, "");
    assert_eq!(report.failed_segments.len(), 2);
}

#[tokio::test]
async fn test_all_segments_failing_is_an_error_when_configured() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1200.0),
        FakeTranscriber::new(vec![0, 1]),
        true,
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::NothingTranscribed { failed: 2, skipped: 0 }
    ));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_cancellation_between_segments_cleans_up() {
    let root = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let mut transcriber = FakeTranscriber::new(vec![]);
    transcriber.cancel_on_call = Some((0, token.clone()));
    let (pipeline, _) = pipeline(root.path(), FakeDownloader::ok(), Ok(1800.0), transcriber, false);

    let err = pipeline.transcribe_with_cancel(VIDEO_URL, &token).await.unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_cancelled_before_start_does_not_download() {
    let root = TempDir::new().unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let (pipeline, downloader) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1500.0),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe_with_cancel(VIDEO_URL, &token).await.unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(downloader.seen_dirs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_panic_mid_pipeline_cleans_up() {
    let root = TempDir::new().unwrap();
    let mut transcriber = FakeTranscriber::new(vec![]);
    transcriber.panic_on_segment = Some(1);
    let (pipeline, downloader) = pipeline(root.path(), FakeDownloader::ok(), Ok(1800.0), transcriber, false);

    let handle = tokio::spawn(async move { pipeline.transcribe(VIDEO_URL).await });
    let join_error = handle.await.unwrap_err();

    assert!(join_error.is_panic());
    let run_dir = downloader.seen_dirs.lock().unwrap()[0].clone();
    assert!(!run_dir.exists());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_zero_chunk_length_fails_before_download() {
    let root = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .with_chunk_length(0)
        .with_work_dir(root.path().to_path_buf())
        .build();
    let downloader = Arc::new(FakeDownloader::ok());
    let pipeline = Pipeline::with_components(
        config,
        downloader.clone(),
        Arc::new(FakeToolkit { duration: Ok(1500.0) }),
        Arc::new(FakeTranscriber::new(vec![])),
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    assert!(downloader.seen_dirs.lock().unwrap().is_empty());
    assert!(is_empty_dir(root.path()));
}

#[tokio::test]
async fn test_implausible_duration_is_probe_failure() {
    let root = TempDir::new().unwrap();
    let (pipeline, _) = pipeline(
        root.path(),
        FakeDownloader::ok(),
        Ok(1.0e12),
        FakeTranscriber::new(vec![]),
        false,
    );

    let err = pipeline.transcribe(VIDEO_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::ProbeFailed { .. }));
    assert!(is_empty_dir(root.path()));
}
