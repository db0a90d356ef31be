//! The Telegram bot.
//!
//! [`Bot`] decodes updates, checks the allow-list, feeds events to the
//! [`ConversationMachine`] and sends its replies. Jobs run on
//! [`JobRunner`]; their completions come back over a channel so a finished
//! job ends its conversation without waiting for the user's next message.

pub mod conversation;
pub mod delivery;
pub mod event;
pub mod job;
pub mod messages;

pub use conversation::{ConversationData, ConversationMachine, ConversationState, Reply};
pub use delivery::{deliver_text, split_message};
pub use event::{Command, Event, Inbound};
pub use job::{JobCompletion, JobHandle, JobLauncher, JobOutcome, JobRequest, JobRunner, JobStatus};

use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::telegram::{ChatId, ChatTransport, TelegramClient, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Pause after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Update handler shared by the webhook and the long-polling loop.
pub struct Bot {
    machine: ConversationMachine,
    transport: Arc<dyn ChatTransport>,
    allowed_user_ids: Vec<i64>,
}

impl Bot {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        launcher: Arc<dyn JobLauncher>,
        allowed_user_ids: Vec<i64>,
    ) -> Self {
        Self {
            machine: ConversationMachine::new(launcher),
            transport,
            allowed_user_ids,
        }
    }

    /// Conversation state, for inspection.
    pub fn machine(&self) -> &ConversationMachine {
        &self.machine
    }

    /// Whether `user_id` may use the bot. An empty list allows nobody.
    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.allowed_user_ids.contains(&user_id)
    }

    /// Process one update and send the replies it produces.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        let Some(inbound) = Inbound::from_update(update) else {
            debug!("Ignoring update without text or callback");
            return Ok(());
        };

        if let Some(callback_id) = &inbound.callback_id {
            if let Err(e) = self.transport.answer_callback(callback_id).await {
                warn!("Could not answer callback query: {}", e);
            }
        }

        if !self.is_authorized(inbound.user_id) {
            info!(user_id = inbound.user_id, "Unauthorized user");
            if matches!(
                inbound.event,
                Event::Command(Command::Start) | Event::Command(Command::Transcribe)
            ) {
                self.transport
                    .send_text(inbound.chat_id, messages::NOT_AUTHORIZED)
                    .await?;
            }
            return Ok(());
        }

        let replies = self
            .machine
            .handle(inbound.chat_id, inbound.user_id, inbound.event)
            .await;

        for reply in replies {
            self.send_reply(inbound.chat_id, reply).await?;
        }

        Ok(())
    }

    async fn send_reply(&self, chat_id: ChatId, reply: Reply) -> Result<()> {
        match reply {
            Reply::Text(text) => self.transport.send_text(chat_id, &text).await,
            Reply::WithSkip(text) => {
                self.transport
                    .send_with_button(chat_id, &text, messages::SKIP_LABEL, messages::SKIP_DATA)
                    .await
            }
        }
    }

    /// React to a finished job.
    pub async fn on_job_finished(&self, completion: &JobCompletion) {
        match &completion.outcome {
            JobOutcome::Succeeded { .. } => {
                info!(chat_id = %completion.chat_id, job_id = %completion.job_id, "Job succeeded")
            }
            JobOutcome::Failed(reason) => {
                warn!(chat_id = %completion.chat_id, job_id = %completion.job_id, "Job failed: {}", reason)
            }
        }

        if self.machine.finish_job(completion).await {
            debug!(chat_id = %completion.chat_id, "Conversation returned to idle");
        }
    }

    /// Consume job completions until every sender is gone.
    pub fn spawn_completion_listener(
        self: &Arc<Self>,
        mut completions: UnboundedReceiver<JobCompletion>,
    ) -> JoinHandle<()> {
        let bot = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(completion) = completions.recv().await {
                bot.on_job_finished(&completion).await;
            }
            debug!("Completion channel closed");
        })
    }

    /// Fetch updates with `getUpdates` and handle them until the task is dropped.
    pub async fn run_polling(&self, client: &TelegramClient, timeout_secs: u64) -> Result<()> {
        client.delete_webhook().await?;
        info!("Long polling started");

        let mut offset: Option<i64> = None;
        loop {
            let updates = match client.get_updates(offset, timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                if let Err(e) = self.handle_update(update).await {
                    error!("Failed to handle update: {}", e);
                }
            }
        }
    }
}

/// A wired-up bot with its Telegram client and pipeline.
pub struct BotRuntime {
    pub bot: Arc<Bot>,
    pub client: Arc<TelegramClient>,
    pub orchestrator: Arc<Orchestrator>,
}

impl BotRuntime {
    /// Build the production bot from settings and start its completion listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(settings: &Settings) -> Result<Self> {
        let client = Arc::new(TelegramClient::new(
            &settings.telegram.api_url,
            settings.bot_token()?,
        )?);
        let orchestrator = Arc::new(Orchestrator::new(settings)?);

        let (tx, rx) = mpsc::unbounded_channel();
        let runner = JobRunner::new(
            orchestrator.clone(),
            client.clone(),
            settings.delivery.max_message_length,
        )
        .with_completions(tx)
        .with_support_chat(settings.telegram.support_chat_id.map(ChatId));

        let bot = Arc::new(Bot::new(
            client.clone(),
            Arc::new(runner),
            settings.telegram.allowed_user_ids.clone(),
        ));
        bot.spawn_completion_listener(rx);

        if settings.telegram.allowed_user_ids.is_empty() {
            warn!("No allowed user ids configured; every user will be refused");
        }

        Ok(Self {
            bot,
            client,
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::testing::{
        RecordingLauncher, RecordingTransport, ScriptedFetcher, ScriptedTranscriber, Sent,
    };

    const ALLOWED: i64 = 11;

    fn bot() -> (Bot, Arc<RecordingTransport>, Arc<RecordingLauncher>) {
        let transport = Arc::new(RecordingTransport::new());
        let launcher = Arc::new(RecordingLauncher::new());
        let bot = Bot::new(transport.clone(), launcher.clone(), vec![ALLOWED]);
        (bot, transport, launcher)
    }

    fn message(user_id: i64, text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "chat": { "id": 10 },
                "from": { "id": user_id },
                "text": text,
            }
        }))
        .unwrap()
    }

    fn skip(user_id: i64, query_id: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": query_id,
                "from": { "id": user_id },
                "message": { "message_id": 3, "chat": { "id": 10 } },
                "data": messages::SKIP_DATA,
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_user_is_refused() {
        let (bot, transport, _) = bot();

        bot.handle_update(message(99, "/transcribe")).await.unwrap();
        bot.handle_update(message(99, "https://example.com/v")).await.unwrap();

        assert_eq!(transport.sent(), vec![Sent::text(10, messages::NOT_AUTHORIZED)]);
        assert_eq!(bot.machine().state(ChatId(10)).await, None);
    }

    #[tokio::test]
    async fn test_empty_allow_list_refuses_everyone() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = Bot::new(transport.clone(), Arc::new(RecordingLauncher::new()), Vec::new());

        bot.handle_update(message(ALLOWED, "/start")).await.unwrap();
        assert_eq!(transport.sent(), vec![Sent::text(10, messages::NOT_AUTHORIZED)]);
    }

    #[tokio::test]
    async fn test_conversation_over_updates() {
        let (bot, transport, launcher) = bot();

        bot.handle_update(message(ALLOWED, "/transcribe")).await.unwrap();
        bot.handle_update(message(ALLOWED, "https://youtu.be/dQw4w9WgXcQ")).await.unwrap();
        bot.handle_update(skip(ALLOWED, "q1")).await.unwrap();
        bot.handle_update(message(ALLOWED, "2:00")).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0], Sent::text(10, messages::ASK_URL));
        assert_eq!(
            sent[1],
            Sent::Button {
                chat_id: 10,
                text: messages::ASK_START_TIME.to_string(),
                label: messages::SKIP_LABEL.to_string(),
                data: messages::SKIP_DATA.to_string(),
            }
        );
        assert_eq!(sent[2], Sent::CallbackAnswer("q1".to_string()));
        assert!(matches!(&sent[3], Sent::Button { text, .. } if text == messages::ASK_END_TIME));
        assert_eq!(sent.len(), 4);

        let requests = launcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].range.start_seconds, None);
        assert_eq!(requests[0].range.end_seconds, Some(120));
    }

    #[tokio::test]
    async fn test_unauthorized_callback_is_still_answered() {
        let (bot, transport, _) = bot();
        bot.handle_update(skip(99, "q9")).await.unwrap();
        assert_eq!(transport.sent(), vec![Sent::CallbackAnswer("q9".to_string())]);
    }

    #[tokio::test]
    async fn test_job_completion_returns_chat_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.path().display().to_string();

        let orchestrator = Orchestrator::with_components(
            &settings,
            Arc::new(ScriptedFetcher::ok(60.0)),
            Arc::new(ScriptedTranscriber::ok("transcript text")),
        )
        .unwrap();

        let transport = Arc::new(RecordingTransport::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = JobRunner::new(Arc::new(orchestrator), transport.clone(), 4096)
            .with_completions(tx);
        let bot = Arc::new(Bot::new(transport.clone(), Arc::new(runner), vec![ALLOWED]));
        let listener = bot.spawn_completion_listener(rx);

        bot.handle_update(message(ALLOWED, "/transcribe")).await.unwrap();
        bot.handle_update(message(ALLOWED, "https://example.com/v")).await.unwrap();
        bot.handle_update(skip(ALLOWED, "q1")).await.unwrap();
        bot.handle_update(skip(ALLOWED, "q2")).await.unwrap();

        for _ in 0..200 {
            if bot.machine().state(ChatId(10)).await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(bot.machine().state(ChatId(10)).await, None);
        assert_eq!(bot.machine().job_status(ChatId(10)).await, JobStatus::Done);
        assert!(transport
            .sent()
            .contains(&Sent::text(10, &format!("{}\n\ntranscript text", messages::JOB_DONE))));

        listener.abort();
    }
}
