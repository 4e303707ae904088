//! All mutable client state in one place.
//!
//! `ClientState` never performs I/O. User actions and backend events go in,
//! [`Command`]s come out, and the UI hands those to the backend client.

use crate::config::Mode;
use crate::error::{ClientError, ClientResult};
use crate::event::{AppEvent, Command};
use crate::input::{InputController, QuickAction};
use crate::session::directory::{self, Confirmation, SessionDirectory};
use crate::session::{Role, DEFAULT_SESSION_ID};
use crate::status::StatusMonitor;
use crate::stream::channel::RECONNECT_DELAY;
use crate::stream::{Outcome, PushEvent, Reconciler};
use crate::transcript::Transcript;
use crate::upload::{self, FileCandidate};
use chrono::{DateTime, Local};

const THINKING: &str = "AI is thinking...";
const UPLOADING: &str = "Uploading file...";

pub struct ClientState {
    mode: Mode,
    pub input: InputController,
    pub transcript: Transcript,
    pub directory: SessionDirectory,
    pub status: StatusMonitor,
    reconciler: Reconciler,
    conversation_id: Option<String>,
    thinking: bool,
    /// The latest selection still uploading. Results for any other file are
    /// stale.
    pending_upload: Option<FileCandidate>,
    /// Set while the active session's history is on its way.
    awaiting_history: bool,
    last_response_time: Option<f64>,
    reconnecting: bool,
    show_system_status: bool,
    diagnostics_log: Vec<String>,
}

impl ClientState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            input: InputController::default(),
            transcript: Transcript::default(),
            directory: SessionDirectory::default(),
            status: StatusMonitor::default(),
            reconciler: Reconciler::default(),
            conversation_id: None,
            thinking: false,
            pending_upload: None,
            awaiting_history: false,
            last_response_time: None,
            reconnecting: false,
            show_system_status: false,
            diagnostics_log: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Progress lines under the transcript, upload first.
    pub fn working(&self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.pending_upload.is_some() {
            lines.push(UPLOADING);
        }
        if self.thinking {
            lines.push(THINKING);
        }
        lines
    }

    pub fn last_response_time(&self) -> Option<f64> {
        self.last_response_time
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconnect_notice(&self) -> Option<String> {
        self.reconnecting.then(|| {
            format!(
                "Connection lost. Reconnecting every {} seconds...",
                RECONNECT_DELAY.as_secs()
            )
        })
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics_log
    }

    pub fn system_status_open(&self) -> bool {
        self.show_system_status
    }

    pub fn close_system_status(&mut self) {
        self.show_system_status = false;
    }

    pub fn startup(&mut self) -> Vec<Command> {
        self.log_diagnostic(format!("starting in {:?} mode", self.mode));
        match self.mode {
            Mode::Request => vec![Command::NewConversation, Command::SystemStatus { silent: true }],
            Mode::Streaming => {
                self.awaiting_history = true;
                vec![
                    Command::CheckStatus,
                    Command::ListSessions,
                    Command::FetchHistory {
                        session_id: self.directory.active_id().to_string(),
                    },
                ]
            }
        }
    }

    /// Surfaces a locally raised error as a transcript notice.
    pub fn report(&mut self, error: &ClientError) {
        self.log_diagnostic(format!("{} error: {error}", error.kind()));
        self.transcript.error(error.to_string());
    }

    pub fn submit(&mut self) -> ClientResult<Vec<Command>> {
        if !self.input.can_send() {
            return Ok(Vec::new());
        }
        self.status.ensure_can_send()?;

        let Some(submission) = self.input.take_submission() else {
            return Ok(Vec::new());
        };

        let mut shown = submission.text.clone();
        if let Some(attachment) = &submission.attachment {
            if !shown.is_empty() {
                shown.push('\n');
            }
            shown.push_str(&format!("[attached: {}]", attachment.name));
        }
        self.transcript.append(Role::User, shown);
        self.thinking = true;
        if self.pending_upload.take().is_some() {
            tracing::debug!("message sent before upload finished, upload will be dropped");
        }

        let command = match self.mode {
            Mode::Request => Command::Chat {
                message: submission.text,
                conversation_id: self.conversation_id.clone(),
                attachment: submission.attachment,
            },
            Mode::Streaming => Command::StreamChat {
                message: submission.text,
                session_id: self.directory.active_id().to_string(),
            },
        };
        Ok(vec![command])
    }

    /// Validates a picked or dropped file and, if acceptable, asks for it to
    /// be uploaded. Any previous attachment or unfinished upload is dropped
    /// either way.
    pub fn select_file(&mut self, candidate: FileCandidate) -> ClientResult<Vec<Command>> {
        self.input.clear_attachment();
        self.pending_upload = None;
        upload::validate(&candidate.name(), candidate.size)?;
        self.pending_upload = Some(candidate.clone());
        Ok(vec![Command::Upload(candidate)])
    }

    pub fn remove_attachment(&mut self) {
        self.input.clear_attachment();
        self.pending_upload = None;
    }

    pub fn quick_action(&mut self, action: QuickAction) {
        self.input.prefill(action.prompt());
    }

    pub fn new_conversation(&mut self) -> Vec<Command> {
        vec![Command::NewConversation]
    }

    pub fn select_session(&mut self, session_id: &str) -> Vec<Command> {
        if !self.directory.activate(session_id) {
            return Vec::new();
        }
        self.log_diagnostic(format!("switched to session {session_id}"));
        self.reconciler.reset();
        self.transcript.clear();
        self.thinking = false;
        self.input.release();
        self.awaiting_history = true;
        vec![Command::FetchHistory {
            session_id: session_id.to_string(),
        }]
    }

    pub fn create_session(&mut self, name_input: &str, now: DateTime<Local>) -> Vec<Command> {
        vec![Command::CreateSession {
            name: directory::resolve_name(name_input, now),
        }]
    }

    pub fn request_delete(&mut self, session_id: &str) -> ClientResult<()> {
        self.directory.request_delete(session_id)
    }

    pub fn request_clear(&mut self, session_id: &str) {
        self.directory.request_clear(session_id);
    }

    pub fn pending_confirmation(&self) -> Option<&Confirmation> {
        self.directory.pending_confirmation()
    }

    pub fn cancel_confirmation(&mut self) {
        self.directory.cancel_confirmation();
    }

    pub fn confirm(&mut self) -> Vec<Command> {
        match self.directory.take_confirmation() {
            Some(Confirmation::DeleteSession { session_id, .. }) => {
                vec![Command::DeleteSession { session_id }]
            }
            Some(Confirmation::ClearHistory { session_id, .. }) => {
                vec![Command::ClearHistory { session_id }]
            }
            None => Vec::new(),
        }
    }

    pub fn open_system_status(&mut self) -> Vec<Command> {
        self.show_system_status = true;
        vec![Command::SystemStatus { silent: false }]
    }

    pub fn recheck_status(&mut self) -> Vec<Command> {
        match self.mode {
            Mode::Streaming => {
                self.status.mark_checking();
                vec![Command::CheckStatus]
            }
            Mode::Request => vec![Command::SystemStatus { silent: true }],
        }
    }

    pub fn handle(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::ConversationStarted(conversation_id) => {
                self.log_diagnostic(format!("conversation started: {conversation_id}"));
                self.conversation_id = Some(conversation_id);
                self.status.mark_connected();
                self.transcript.clear();
                self.input.clear_attachment();
                self.pending_upload = None;
                self.input.buffer.clear();
                Vec::new()
            }
            AppEvent::ChatReplied {
                response,
                conversation_id,
            } => {
                self.thinking = false;
                self.input.release();
                self.status.mark_connected();
                if conversation_id.is_some() {
                    self.conversation_id = conversation_id;
                }
                match response {
                    Some(response) if !response.is_empty() => {
                        self.transcript.append(Role::Assistant, response);
                    }
                    _ => self.transcript.error("No response received"),
                }
                Vec::new()
            }
            AppEvent::ChatAccepted { session_id } => {
                // The composer stays locked until the reply completes or fails.
                tracing::debug!(%session_id, "chat accepted, awaiting stream");
                Vec::new()
            }
            AppEvent::Uploaded {
                candidate,
                attachment,
            } => {
                if self.pending_upload.as_ref() != Some(&candidate) {
                    tracing::debug!(file = %attachment.name, "dropping stale upload result");
                    return Vec::new();
                }
                self.pending_upload = None;
                self.log_diagnostic(format!("uploaded {}", attachment.name));
                self.input.set_attachment(attachment);
                Vec::new()
            }
            AppEvent::SystemStatusLoaded(components) => {
                if self.mode == Mode::Request {
                    self.status.mark_connected();
                }
                self.status.set_components(components);
                Vec::new()
            }
            AppEvent::StatusChecked(status) => {
                self.status.apply(&status);
                self.log_diagnostic(format!("backend status: {}", self.status.label()));
                Vec::new()
            }
            AppEvent::SessionsLoaded(sessions) => {
                self.directory.replace_sessions(sessions);
                Vec::new()
            }
            AppEvent::HistoryLoaded {
                session_id,
                messages,
            } => {
                if !self.directory.is_active(&session_id) {
                    tracing::debug!(%session_id, "dropping history for inactive session");
                    return Vec::new();
                }
                if !std::mem::take(&mut self.awaiting_history) {
                    tracing::debug!(%session_id, "dropping duplicate history");
                    return Vec::new();
                }
                if self.transcript.is_empty() {
                    self.reconciler.reset();
                    self.transcript.replace(messages);
                } else {
                    // The user got ahead of the load; keep the live exchange.
                    let moved = self.transcript.prepend(messages);
                    self.reconciler.shift(moved);
                }
                Vec::new()
            }
            AppEvent::SessionCreated(session) => {
                let session_id = session.session_id.clone();
                self.log_diagnostic(format!("session created: {} ({session_id})", session.name));
                self.directory.insert(session);
                let mut commands = self.select_session(&session_id);
                commands.push(Command::ListSessions);
                commands
            }
            AppEvent::SessionDeleted(session_id) => {
                self.log_diagnostic(format!("session deleted: {session_id}"));
                self.directory.remove(&session_id);
                self.reconciler.reset();
                self.transcript.clear();
                self.thinking = false;
                self.input.release();
                self.awaiting_history = true;
                vec![
                    Command::FetchHistory {
                        session_id: DEFAULT_SESSION_ID.to_string(),
                    },
                    Command::ListSessions,
                ]
            }
            AppEvent::HistoryCleared(session_id) => {
                if self.directory.is_active(&session_id) {
                    self.reconciler.reset();
                    self.transcript.clear();
                }
                vec![Command::ListSessions]
            }
            AppEvent::Push(event) => self.apply_push(event),
            AppEvent::StreamConnected => {
                if !std::mem::take(&mut self.reconnecting) {
                    return Vec::new();
                }
                self.log_diagnostic("push channel reconnected");
                self.reconciler.reset();
                // Whatever was streaming is lost with the old connection.
                self.thinking = false;
                self.input.release();
                self.transcript.notice("Reconnected.");
                vec![Command::CheckStatus, Command::ListSessions]
            }
            AppEvent::StreamDisconnected(reason) => {
                self.log_diagnostic(format!("push channel lost: {reason}"));
                self.reconnecting = true;
                Vec::new()
            }
            AppEvent::Failed { command, error } => self.apply_failure(command, error),
        }
    }

    fn apply_push(&mut self, event: PushEvent) -> Vec<Command> {
        let active = self.directory.active_id().to_string();
        match self.reconciler.apply(event, &active, &mut self.transcript) {
            Outcome::Completed {
                response_time,
                for_active,
            } => {
                if for_active {
                    self.thinking = false;
                    self.input.release();
                    self.last_response_time = response_time;
                }
                vec![Command::ListSessions]
            }
            Outcome::Failed(message) => {
                self.thinking = false;
                self.input.release();
                self.report(&ClientError::Stream(format!("Error: {message}")));
                Vec::new()
            }
            Outcome::Opened | Outcome::Appended | Outcome::Ignored | Outcome::KeepAlive => {
                Vec::new()
            }
        }
    }

    fn apply_failure(&mut self, command: Command, error: ClientError) -> Vec<Command> {
        self.log_diagnostic(format!("{} failed ({}): {error}", command.name(), error.kind()));
        match command {
            Command::NewConversation => {
                if matches!(error, ClientError::Transport(_)) {
                    self.status.mark_unreachable(error.to_string());
                }
                self.transcript
                    .error(format!("Failed to start new conversation: {error}"));
            }
            Command::Chat { .. } | Command::StreamChat { .. } => {
                self.thinking = false;
                self.input.release();
                self.transcript
                    .error(format!("Failed to send message: {error}"));
            }
            Command::Upload(candidate) => {
                if self.pending_upload.as_ref() == Some(&candidate) {
                    self.pending_upload = None;
                    self.transcript.error(format!("File upload failed: {error}"));
                }
            }
            Command::SystemStatus { silent: true } => {
                tracing::debug!(%error, "background system status check failed");
            }
            Command::SystemStatus { silent: false } => {
                self.status.set_components_failed();
            }
            Command::CheckStatus => {
                self.status.mark_unreachable(error.to_string());
            }
            Command::ListSessions => {
                self.transcript
                    .error(format!("Failed to load sessions: {error}"));
            }
            Command::FetchHistory { session_id } => {
                if self.directory.is_active(&session_id) {
                    self.awaiting_history = false;
                    self.transcript
                        .error(format!("Failed to load history: {error}"));
                }
            }
            Command::CreateSession { .. } => {
                self.transcript
                    .error(format!("Failed to create session: {error}"));
            }
            Command::DeleteSession { .. } => {
                self.transcript
                    .error(format!("Failed to delete session: {error}"));
            }
            Command::ClearHistory { .. } => {
                self.transcript
                    .error(format!("Failed to clear history: {error}"));
            }
        }
        Vec::new()
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.diagnostics_log
            .push(format!("[{}] {message}", Local::now().format("%H:%M:%S")));
    }
}
