//! Background transcription jobs.
//!
//! A job is launched through [`JobLauncher`] and tracked by the returned
//! [`JobHandle`]. The handle's done bit is set by a drop guard, so it flips on
//! success, on error and on panic alike.

use super::delivery::deliver_text;
use super::messages;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::telegram::{ChatId, ChatTransport};
use crate::timecode::TimeRange;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Everything a job needs, copied out of the conversation at launch.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub chat_id: ChatId,
    pub user_id: i64,
    pub url: String,
    pub range: TimeRange,
}

/// Per-chat view of job progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// No job has been launched for the chat.
    Idle,
    Running,
    Done,
}

/// Shared handle to one launched job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: Uuid,
    done: Arc<AtomicBool>,
}

impl JobHandle {
    /// A handle for a job that is about to start.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn status(&self) -> JobStatus {
        if self.is_done() {
            JobStatus::Done
        } else {
            JobStatus::Running
        }
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { duration_seconds: f64, cost: f64 },
    Failed(String),
}

/// Message sent when a job ends.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub chat_id: ChatId,
    pub job_id: Uuid,
    pub outcome: JobOutcome,
}

/// Starts jobs in the background.
pub trait JobLauncher: Send + Sync {
    /// Start `request` and return its handle without waiting for it.
    fn launch(&self, request: JobRequest) -> JobHandle;
}

/// Marks the handle done and reports the outcome when dropped.
struct CompletionGuard {
    handle: JobHandle,
    chat_id: ChatId,
    completions: Option<UnboundedSender<JobCompletion>>,
    outcome: JobOutcome,
}

impl CompletionGuard {
    fn new(
        handle: JobHandle,
        chat_id: ChatId,
        completions: Option<UnboundedSender<JobCompletion>>,
    ) -> Self {
        Self {
            handle,
            chat_id,
            completions,
            outcome: JobOutcome::Failed("job ended unexpectedly".to_string()),
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.handle.mark_done();

        if let Some(tx) = self.completions.take() {
            let completion = JobCompletion {
                chat_id: self.chat_id,
                job_id: self.handle.id(),
                outcome: self.outcome.clone(),
            };
            // The listener is gone during shutdown; nothing left to notify.
            let _ = tx.send(completion);
        }
    }
}

/// Runs fetch → send audio → transcribe → deliver → cost report.
#[derive(Clone)]
pub struct JobRunner {
    orchestrator: Arc<Orchestrator>,
    transport: Arc<dyn ChatTransport>,
    completions: Option<UnboundedSender<JobCompletion>>,
    support_chat_id: Option<ChatId>,
    max_message_length: usize,
}

impl JobRunner {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        transport: Arc<dyn ChatTransport>,
        max_message_length: usize,
    ) -> Self {
        Self {
            orchestrator,
            transport,
            completions: None,
            support_chat_id: None,
            max_message_length,
        }
    }

    /// Report every finished job on `tx`.
    pub fn with_completions(mut self, tx: UnboundedSender<JobCompletion>) -> Self {
        self.completions = Some(tx);
        self
    }

    /// Send cost reports to `chat_id`.
    pub fn with_support_chat(mut self, chat_id: Option<ChatId>) -> Self {
        self.support_chat_id = chat_id;
        self
    }

    /// Run a job to completion on the current task.
    ///
    /// Errors are logged and reported to the chat, never returned.
    #[instrument(skip(self, handle), fields(chat_id = %request.chat_id, job_id = %handle.id()))]
    pub async fn run(&self, request: JobRequest, handle: JobHandle) {
        let mut guard = CompletionGuard::new(handle, request.chat_id, self.completions.clone());

        guard.outcome = match self.execute(&request).await {
            Ok((duration_seconds, cost)) => {
                info!("Job finished: {:.1}s of audio, ${:.4}", duration_seconds, cost);
                JobOutcome::Succeeded {
                    duration_seconds,
                    cost,
                }
            }
            Err(e) => {
                error!("Error in processing audio: {}", e);
                let text = format!("{}\n\n{}", messages::JOB_FAILED, e);
                if let Err(send_err) = self.transport.send_text(request.chat_id, &text).await {
                    warn!("Could not report failure to chat: {}", send_err);
                }
                JobOutcome::Failed(e.to_string())
            }
        };
    }

    async fn execute(&self, request: &JobRequest) -> Result<(f64, f64)> {
        let chat_id = request.chat_id;

        self.transport.send_text(chat_id, messages::JOB_STARTED).await?;

        let workdir = self.orchestrator.workdir()?;
        let artifact = self
            .orchestrator
            .fetch_audio(&request.url, &request.range, workdir.path())
            .await?;

        self.transport.send_document(chat_id, &artifact.path).await?;

        let transcript = self.orchestrator.transcribe(&artifact).await?;

        if transcript.trim().is_empty() {
            self.transport.send_text(chat_id, messages::EMPTY_TRANSCRIPT).await?;
        } else {
            let text = format!("{}\n\n{}", messages::JOB_DONE, transcript);
            deliver_text(self.transport.as_ref(), chat_id, &text, self.max_message_length).await?;
        }

        let cost = self.orchestrator.estimate_cost(artifact.duration_seconds);
        self.report_cost(request, artifact.duration_seconds, cost).await;

        Ok((artifact.duration_seconds, cost))
    }

    async fn report_cost(&self, request: &JobRequest, duration_seconds: f64, cost: f64) {
        info!(
            user_id = request.user_id,
            "Transcription cost ${:.4} for {:.1}s of audio", cost, duration_seconds
        );

        let Some(support_chat) = self.support_chat_id else {
            return;
        };

        let report = messages::cost_report(request.user_id, Utc::now(), duration_seconds, cost);
        if let Err(e) = self.transport.send_text(support_chat, &report).await {
            warn!("Could not send cost report: {}", e);
        }
    }
}

impl JobLauncher for JobRunner {
    fn launch(&self, request: JobRequest) -> JobHandle {
        let handle = JobHandle::new();
        info!(
            job_id = %handle.id(),
            chat_id = %request.chat_id,
            "Launching job for {} ({})", request.url, request.range
        );

        let runner = self.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            runner.run(request, task_handle).await;
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::testing::{RecordingTransport, ScriptedFetcher, ScriptedTranscriber, Sent};
    use tokio::sync::mpsc;

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<RecordingTransport>,
        runner: JobRunner,
        completions: mpsc::UnboundedReceiver<JobCompletion>,
    }

    fn fixture(fetcher: ScriptedFetcher, transcriber: ScriptedTranscriber) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.path().display().to_string();

        let orchestrator = Orchestrator::with_components(
            &settings,
            Arc::new(fetcher),
            Arc::new(transcriber),
        )
        .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = JobRunner::new(Arc::new(orchestrator), transport.clone(), 4096)
            .with_completions(tx)
            .with_support_chat(Some(ChatId(-1)));

        Fixture {
            _dir: dir,
            transport,
            runner,
            completions: rx,
        }
    }

    fn request() -> JobRequest {
        JobRequest {
            chat_id: ChatId(7),
            user_id: 70,
            url: "https://example.com/video".to_string(),
            range: TimeRange::full(),
        }
    }

    #[test]
    fn test_handle_status() {
        let handle = JobHandle::new();
        assert_eq!(handle.status(), JobStatus::Running);
        let shared = handle.clone();
        shared.mark_done();
        assert_eq!(handle.status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn test_successful_job_delivers_everything() {
        let mut fx = fixture(ScriptedFetcher::ok(120.0), ScriptedTranscriber::ok("hello there"));
        let handle = JobHandle::new();

        fx.runner.run(request(), handle.clone()).await;

        assert!(handle.is_done());
        let sent = fx.transport.sent();
        assert_eq!(sent[0], Sent::text(7, messages::JOB_STARTED));
        assert_eq!(sent[1], Sent::document(7, "audio.mp3"));
        assert_eq!(sent[2], Sent::text(7, &format!("{}\n\nhello there", messages::JOB_DONE)));
        match &sent[3] {
            Sent::Text { chat_id, text } => {
                assert_eq!(*chat_id, -1);
                assert!(text.contains("70"));
            }
            other => panic!("expected cost report, got {:?}", other),
        }

        let completion = fx.completions.recv().await.unwrap();
        assert_eq!(completion.job_id, handle.id());
        assert_eq!(completion.chat_id, ChatId(7));
        match completion.outcome {
            JobOutcome::Succeeded { duration_seconds, cost } => {
                assert_eq!(duration_seconds, 120.0);
                assert!((cost - 0.012).abs() < 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_still_sets_flag() {
        let mut fx = fixture(
            ScriptedFetcher::failing("yt-dlp failed: video unavailable"),
            ScriptedTranscriber::ok("never"),
        );
        let handle = JobHandle::new();

        fx.runner.run(request(), handle.clone()).await;

        assert!(handle.is_done());
        let sent = fx.transport.sent();
        assert_eq!(sent.len(), 2);
        match &sent[1] {
            Sent::Text { text, .. } => {
                assert!(text.starts_with(messages::JOB_FAILED));
                assert!(text.contains("video unavailable"));
            }
            other => panic!("expected failure message, got {:?}", other),
        }

        let completion = fx.completions.recv().await.unwrap();
        assert!(matches!(completion.outcome, JobOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_transcription_failure_after_audio_sent() {
        let mut fx = fixture(ScriptedFetcher::ok(30.0), ScriptedTranscriber::failing("rate limited"));
        let handle = JobHandle::new();

        fx.runner.run(request(), handle.clone()).await;

        assert!(handle.is_done());
        assert!(fx.transport.sent().contains(&Sent::document(7, "audio.mp3")));
        let completion = fx.completions.recv().await.unwrap();
        assert_eq!(completion.outcome, JobOutcome::Failed("OpenAI API error: rate limited".to_string()));
    }

    #[tokio::test]
    async fn test_empty_transcript_notice() {
        let fx = fixture(ScriptedFetcher::ok(5.0), ScriptedTranscriber::ok("   "));
        fx.runner.run(request(), JobHandle::new()).await;
        assert!(fx.transport.sent().contains(&Sent::text(7, messages::EMPTY_TRANSCRIPT)));
    }

    #[tokio::test]
    async fn test_launch_runs_in_background() {
        let mut fx = fixture(ScriptedFetcher::ok(10.0), ScriptedTranscriber::ok("text"));
        let handle = fx.runner.launch(request());

        let completion = fx.completions.recv().await.unwrap();
        assert_eq!(completion.job_id, handle.id());
        assert!(handle.is_done());
    }

    #[tokio::test]
    async fn test_panicking_job_is_marked_done() {
        let handle = JobHandle::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard_handle = handle.clone();

        let task = tokio::spawn(async move {
            let _guard = CompletionGuard::new(guard_handle, ChatId(1), Some(tx));
            panic!("boom");
        });
        assert!(task.await.is_err());

        assert!(handle.is_done());
        let completion = rx.recv().await.unwrap();
        assert!(matches!(completion.outcome, JobOutcome::Failed(_)));
    }
}
