//! Sequential batch loop: one request per image, one text file per image.

use std::future::Future;
use std::path::Path;
use std::pin::pin;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::{ExtractionJob, FileReport, FileStatus, RunReport};
use crate::services::ContentExtractor;
use crate::utils::file::{detect_mime_type, read_image, write_text};

/// First line of an output file that records a failure instead of text.
pub const ERROR_FILE_HEADER: &str = "PROCESSING ERROR:";

pub struct BatchProcessor<'a> {
    extractor: &'a dyn ContentExtractor,
    prompt: String,
    max_file_size: u64,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(extractor: &'a dyn ContentExtractor, prompt: String, max_file_size: u64) -> Self {
        Self {
            extractor,
            prompt,
            max_file_size,
        }
    }

    /// Process every job in order. `on_file` is called after each file.
    ///
    /// When `stop` completes the image in flight is abandoned without writing
    /// its output, and the report is returned with `interrupted` set.
    pub async fn run<F, S>(&self, jobs: &[ExtractionJob], mut on_file: F, stop: S) -> RunReport
    where
        F: FnMut(&FileReport),
        S: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut report = RunReport::new(jobs.len());
        let mut stop = pin!(stop);

        for job in jobs {
            let file = tokio::select! {
                biased;
                _ = &mut stop => {
                    warn!(processed = report.processed(), "run interrupted");
                    report.interrupted = true;
                    break;
                }
                file = self.process(job) => file,
            };
            on_file(&file);
            report.record(file);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Process one image. Failures end up in the output file and the report.
    pub async fn process(&self, job: &ExtractionJob) -> FileReport {
        let start = Instant::now();
        debug!(input = %job.input.display(), extractor = self.extractor.name(), "processing");

        let (mut status, mut error, chars, content) = match self.extract(&job.input).await {
            Ok(text) => (FileStatus::Success, None, text.chars().count(), text),
            Err(e) => {
                debug!(input = %job.input.display(), error = %e, "extraction failed");
                let content = format!("{ERROR_FILE_HEADER}\n{e}");
                (FileStatus::Failed, Some(e.to_string()), 0, content)
            }
        };

        if let Err(e) = write_text(&job.output, &content) {
            let e = ExtractError::WriteError(e);
            warn!(output = %job.output.display(), error = %e, "could not write output");
            status = FileStatus::Failed;
            error = Some(match error {
                Some(previous) => format!("{previous}; {e}"),
                None => e.to_string(),
            });
        }

        FileReport {
            input: job.input.clone(),
            output: job.output.clone(),
            status,
            error,
            chars: if status == FileStatus::Success { chars } else { 0 },
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn extract(&self, image_path: &Path) -> Result<String, ExtractError> {
        let bytes = read_image(image_path, self.max_file_size).map_err(ExtractError::ReadError)?;
        let mime_type = detect_mime_type(image_path);
        self.extractor
            .extract(&self.prompt, &bytes, &mime_type)
            .await
    }
}

/// Whether an existing output file holds a recorded failure.
pub fn is_error_file(content: &str) -> bool {
    content.starts_with(ERROR_FILE_HEADER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeminiError;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Echoes the image bytes back; fails for images whose content is "bad".
    struct FakeExtractor {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeExtractor {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentExtractor for FakeExtractor {
        async fn extract(
            &self,
            prompt: &str,
            image: &[u8],
            mime_type: &str,
        ) -> Result<String, ExtractError> {
            let body = String::from_utf8_lossy(image).to_string();
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), mime_type.to_string()));
            if body == "bad" {
                return Err(GeminiError::Api {
                    status: 400,
                    message: "Unable to process input image.".to_string(),
                }
                .into());
            }
            Ok(format!("text of {body}"))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn job(dir: &TempDir, name: &str, content: &str) -> ExtractionJob {
        let input = dir.path().join("in").join(format!("{name}.png"));
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, content).unwrap();
        ExtractionJob {
            input,
            output: dir.path().join("out").join(format!("{name}.txt")),
        }
    }

    #[tokio::test]
    async fn test_run_writes_text_and_error_files() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "q1", "one"), job(&dir, "q2", "bad"), job(&dir, "q3", "three")];
        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "PROMPT".to_string(), 1024);

        let mut seen = Vec::new();
        let report = processor
            .run(&jobs, |f| seen.push(f.input.clone()), std::future::pending())
            .await;

        assert_eq!(report.files_found, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(seen, jobs.iter().map(|j| j.input.clone()).collect::<Vec<PathBuf>>());

        assert_eq!(fs::read_to_string(&jobs[0].output).unwrap(), "text of one");
        let failed = fs::read_to_string(&jobs[1].output).unwrap();
        assert!(is_error_file(&failed));
        assert_eq!(
            failed,
            "PROCESSING ERROR:\nAPI error (status 400): Unable to process input image."
        );
        assert_eq!(fs::read_to_string(&jobs[2].output).unwrap(), "text of three");

        let calls = extractor.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(p, m)| p == "PROMPT" && m == "image/png"));
    }

    #[tokio::test]
    async fn test_existing_output_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir, "q1", "fresh");
        fs::create_dir_all(job.output.parent().unwrap()).unwrap();
        fs::write(&job.output, "PROCESSING ERROR:\nold").unwrap();

        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);
        let file = processor.process(&job).await;

        assert_eq!(file.status, FileStatus::Success);
        assert_eq!(file.chars, "text of fresh".len());
        assert_eq!(fs::read_to_string(&job.output).unwrap(), "text of fresh");
    }

    #[tokio::test]
    async fn test_oversized_image_records_error_without_request() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir, "big", "0123456789");

        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 4);
        let file = processor.process(&job).await;

        assert_eq!(file.status, FileStatus::Failed);
        assert!(file.error.unwrap().contains("exceeds maximum size"));
        assert!(extractor.calls.lock().unwrap().is_empty());
        assert!(is_error_file(&fs::read_to_string(&job.output).unwrap()));
    }

    #[tokio::test]
    async fn test_write_failure_does_not_abort_run() {
        let dir = TempDir::new().unwrap();
        let blocked = job(&dir, "q1", "one");
        let ok = job(&dir, "q2", "two");
        // A directory where the output file should go makes the write fail.
        fs::create_dir_all(&blocked.output).unwrap();

        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);
        let report = processor
            .run(&[blocked, ok.clone()], |_| {}, std::future::pending())
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);
        let failure = report.failures().next().unwrap();
        assert!(failure.error.as_deref().unwrap().starts_with("failed to write output"));
        assert_eq!(fs::read_to_string(&ok.output).unwrap(), "text of two");
    }

    #[tokio::test]
    async fn test_missing_image_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let job = ExtractionJob {
            input: dir.path().join("gone.png"),
            output: dir.path().join("gone.txt"),
        };

        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);
        let file = processor.process(&job).await;

        assert_eq!(file.status, FileStatus::Failed);
        assert!(file.error.unwrap().starts_with("failed to read image"));
    }

    #[tokio::test]
    async fn test_stop_signal_ends_run_between_images() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "q1", "one"), job(&dir, "q2", "two"), job(&dir, "q3", "three")];
        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let report = processor
            .run(
                &jobs,
                |_| {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                },
                async {
                    let _ = rx.await;
                },
            )
            .await;

        assert!(report.interrupted);
        assert_eq!(report.files_found, 3);
        assert_eq!(report.processed(), 1);
        assert_eq!(fs::read_to_string(&jobs[0].output).unwrap(), "text of one");
        assert!(!jobs[1].output.exists());
        assert!(!jobs[2].output.exists());
        assert_eq!(extractor.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_start_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "q1", "one")];
        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);

        let report = processor.run(&jobs, |_| {}, std::future::ready(())).await;

        assert!(report.interrupted);
        assert_eq!(report.processed(), 0);
        assert!(!jobs[0].output.exists());
        assert!(extractor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let extractor = FakeExtractor::new();
        let processor = BatchProcessor::new(&extractor, "p".to_string(), 1024);
        let report = processor.run(&[], |_| {}, std::future::pending()).await;
        assert_eq!(report.files_found, 0);
        assert_eq!(report.processed(), 0);
        assert!(!report.interrupted);
    }
}
