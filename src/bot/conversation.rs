//! Per-chat conversation state machine.
//!
//! Each chat walks `AwaitingUrl → AwaitingStartTime → AwaitingEndTime →
//! Processing` and back to idle. Idle is the absence of a [`Conversation`].
//! The job handle lives next to the conversation, so `/cancel` forgets the
//! inputs but the chat still knows a job of its own is running.

use super::event::{Command, Event};
use super::job::{JobCompletion, JobHandle, JobLauncher, JobRequest, JobStatus};
use super::messages;
use crate::error::SkrivError;
use crate::telegram::ChatId;
use crate::timecode::TimeRange;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Which input the conversation expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingUrl,
    AwaitingStartTime,
    AwaitingEndTime,
    Processing,
}

/// Raw user input collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationData {
    pub url: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone)]
struct Conversation {
    state: ConversationState,
    data: ConversationData,
}

impl Conversation {
    fn new() -> Self {
        Self {
            state: ConversationState::AwaitingUrl,
            data: ConversationData::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    conversation: Option<Conversation>,
    job: Option<JobHandle>,
}

impl Session {
    fn job_status(&self) -> JobStatus {
        self.job
            .as_ref()
            .map(JobHandle::status)
            .unwrap_or(JobStatus::Idle)
    }

    fn job_running(&self) -> bool {
        self.job_status() == JobStatus::Running
    }

    fn end_conversation(&mut self) {
        self.conversation = None;
    }
}

/// Something the bot should send in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Text with the skip button under it.
    WithSkip(String),
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    fn with_skip(text: impl Into<String>) -> Self {
        Reply::WithSkip(text.into())
    }
}

/// Tracks one conversation per chat and launches jobs when input is complete.
pub struct ConversationMachine {
    sessions: Mutex<HashMap<ChatId, Session>>,
    launcher: Arc<dyn JobLauncher>,
}

impl ConversationMachine {
    pub fn new(launcher: Arc<dyn JobLauncher>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            launcher,
        }
    }

    /// Apply `event` from `user_id` in `chat_id` and return the replies to send.
    pub async fn handle(&self, chat_id: ChatId, user_id: i64, event: Event) -> Vec<Reply> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(chat_id).or_default();

        if event == Event::Command(Command::Cancel) {
            if session.conversation.is_some() {
                info!(%chat_id, "Conversation cancelled");
            }
            session.end_conversation();
            return vec![Reply::text(messages::CANCELLED)];
        }

        let state = session.conversation.as_ref().map(|c| c.state);
        match state {
            None => self.on_idle(session, chat_id, event),
            Some(ConversationState::Processing) => {
                if session.job_running() {
                    return vec![Reply::text(messages::STILL_PROCESSING)];
                }
                debug!(%chat_id, "Job already finished, ending conversation");
                session.end_conversation();
                self.on_idle(session, chat_id, event)
            }
            Some(awaiting) => self.on_awaiting(session, awaiting, chat_id, user_id, event),
        }
    }

    /// End the conversation that launched `completion`'s job.
    ///
    /// Returns true when a conversation was waiting on that job.
    pub async fn finish_job(&self, completion: &JobCompletion) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(&completion.chat_id) else {
            return false;
        };

        let same_job = session
            .job
            .as_ref()
            .is_some_and(|job| job.id() == completion.job_id);
        let processing = session
            .conversation
            .as_ref()
            .is_some_and(|c| c.state == ConversationState::Processing);

        if same_job && processing {
            debug!(chat_id = %completion.chat_id, "Job completed, ending conversation");
            session.end_conversation();
            true
        } else {
            false
        }
    }

    /// Current state for a chat, None when idle.
    pub async fn state(&self, chat_id: ChatId) -> Option<ConversationState> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&chat_id)
            .and_then(|s| s.conversation.as_ref())
            .map(|c| c.state)
    }

    /// Collected input for a chat, None when idle.
    pub async fn data(&self, chat_id: ChatId) -> Option<ConversationData> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&chat_id)
            .and_then(|s| s.conversation.as_ref())
            .map(|c| c.data.clone())
    }

    /// Status of the chat's most recent job.
    pub async fn job_status(&self, chat_id: ChatId) -> JobStatus {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&chat_id)
            .map(Session::job_status)
            .unwrap_or(JobStatus::Idle)
    }

    fn on_idle(&self, session: &mut Session, chat_id: ChatId, event: Event) -> Vec<Reply> {
        match event {
            Event::Command(Command::Start) => vec![Reply::text(messages::GREETING)],
            Event::Command(Command::Transcribe) => {
                if session.job_running() {
                    return vec![Reply::text(messages::STILL_PROCESSING)];
                }
                info!(%chat_id, "Conversation started");
                session.conversation = Some(Conversation::new());
                vec![Reply::text(messages::ASK_URL)]
            }
            other => {
                debug!(%chat_id, "Ignoring {:?} outside a conversation", other);
                Vec::new()
            }
        }
    }

    fn on_awaiting(
        &self,
        session: &mut Session,
        state: ConversationState,
        chat_id: ChatId,
        user_id: i64,
        event: Event,
    ) -> Vec<Reply> {
        let Some(conversation) = session.conversation.as_mut() else {
            return Vec::new();
        };

        match (state, event) {
            (ConversationState::AwaitingUrl, Event::Text(text)) => {
                conversation.data.url = Some(text.trim().to_string());
                conversation.state = ConversationState::AwaitingStartTime;
                vec![Reply::with_skip(messages::ASK_START_TIME)]
            }
            (ConversationState::AwaitingStartTime, Event::Text(text)) => {
                conversation.data.start_time = Some(text.trim().to_string());
                conversation.state = ConversationState::AwaitingEndTime;
                vec![Reply::with_skip(messages::ASK_END_TIME)]
            }
            (ConversationState::AwaitingStartTime, Event::Skip) => {
                conversation.data.start_time = None;
                conversation.state = ConversationState::AwaitingEndTime;
                vec![Reply::with_skip(messages::ASK_END_TIME)]
            }
            (ConversationState::AwaitingEndTime, Event::Text(text)) => {
                conversation.data.end_time = Some(text.trim().to_string());
                self.launch(session, chat_id, user_id)
            }
            (ConversationState::AwaitingEndTime, Event::Skip) => {
                conversation.data.end_time = None;
                self.launch(session, chat_id, user_id)
            }
            (state, other) => {
                debug!(%chat_id, "Ignoring {:?} in {:?}", other, state);
                Vec::new()
            }
        }
    }

    /// Validate the collected input and start the job.
    fn launch(&self, session: &mut Session, chat_id: ChatId, user_id: i64) -> Vec<Reply> {
        let Some(conversation) = session.conversation.as_mut() else {
            return Vec::new();
        };
        let data = conversation.data.clone();

        let request = match build_request(chat_id, user_id, &data) {
            Ok(request) => request,
            Err(SkrivError::MissingUrl) => {
                warn!(%chat_id, "URL is missing in conversation data");
                session.end_conversation();
                return vec![Reply::text(messages::MISSING_URL)];
            }
            Err(e) => {
                info!(%chat_id, "Rejected time range: {}", e);
                session.end_conversation();
                return vec![Reply::text(messages::invalid_time(&e))];
            }
        };

        if session.job_running() {
            session.end_conversation();
            return vec![Reply::text(messages::STILL_PROCESSING)];
        }

        let handle = self.launcher.launch(request);
        session.job = Some(handle);
        if let Some(conversation) = session.conversation.as_mut() {
            conversation.state = ConversationState::Processing;
        }
        Vec::new()
    }
}

/// Turn collected input into a job request.
fn build_request(
    chat_id: ChatId,
    user_id: i64,
    data: &ConversationData,
) -> crate::error::Result<JobRequest> {
    let url = data
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or(SkrivError::MissingUrl)?;
    let range = TimeRange::parse(data.start_time.as_deref(), data.end_time.as_deref())?;

    Ok(JobRequest {
        chat_id,
        user_id,
        url,
        range,
    })
}
