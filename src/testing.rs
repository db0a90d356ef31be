//! In-memory fakes shared by unit tests.

use crate::audio::{AudioArtifact, MediaFetcher};
use crate::bot::job::{JobHandle, JobLauncher, JobRequest};
use crate::error::{Result, SkrivError};
use crate::telegram::{ChatId, ChatTransport};
use crate::timecode::TimeRange;
use crate::transcription::Transcriber;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

/// One outbound call seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
    },
    Button {
        chat_id: i64,
        text: String,
        label: String,
        data: String,
    },
    Document {
        chat_id: i64,
        file_name: String,
    },
    CallbackAnswer(String),
}

impl Sent {
    pub fn text(chat_id: i64, text: &str) -> Self {
        Sent::Text {
            chat_id,
            text: text.to_string(),
        }
    }

    pub fn document(chat_id: i64, file_name: &str) -> Self {
        Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
        }
    }
}

/// Transport that records everything and always succeeds.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.push(Sent::text(chat_id.0, text));
        Ok(())
    }

    async fn send_with_button(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
        callback_data: &str,
    ) -> Result<()> {
        self.push(Sent::Button {
            chat_id: chat_id.0,
            text: text.to_string(),
            label: button_label.to_string(),
            data: callback_data.to_string(),
        });
        Ok(())
    }

    async fn send_document(&self, chat_id: ChatId, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.push(Sent::document(chat_id.0, &file_name));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.push(Sent::CallbackAnswer(callback_id.to_string()));
        Ok(())
    }
}

/// Launcher that records requests and hands out handles nobody completes.
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<(JobRequest, JobHandle)>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<JobRequest> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn handles(&self) -> Vec<JobHandle> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .map(|(_, handle)| handle.clone())
            .collect()
    }
}

impl JobLauncher for RecordingLauncher {
    fn launch(&self, request: JobRequest) -> JobHandle {
        let handle = JobHandle::new();
        self.launched.lock().unwrap().push((request, handle.clone()));
        handle
    }
}

/// Fetcher that writes a placeholder file or fails with a fixed message.
pub struct ScriptedFetcher {
    result: std::result::Result<f64, String>,
    calls: Mutex<Vec<(String, TimeRange)>>,
}

impl ScriptedFetcher {
    pub fn ok(duration_seconds: f64) -> Self {
        Self {
            result: Ok(duration_seconds),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, TimeRange)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, range: &TimeRange, workdir: &Path) -> Result<AudioArtifact> {
        self.calls.lock().unwrap().push((url.to_string(), *range));

        match &self.result {
            Ok(duration_seconds) => {
                let path = workdir.join("audio.mp3");
                std::fs::write(&path, b"ID3")?;
                Ok(AudioArtifact {
                    path,
                    duration_seconds: *duration_seconds,
                })
            }
            Err(message) => Err(SkrivError::AudioDownload(message.clone())),
        }
    }
}

/// Transcriber that returns fixed text or fails with an API error.
pub struct ScriptedTranscriber {
    result: std::result::Result<String, String>,
}

impl ScriptedTranscriber {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _audio_path: &Path, _language: &str) -> Result<String> {
        self.result.clone().map_err(SkrivError::OpenAI)
    }
}
