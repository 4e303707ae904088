use crate::error::ClientError;
use crate::session::{Message, Session};
use crate::status::{BackendStatus, ComponentStatus};
use crate::stream::PushEvent;
use crate::upload::{FileCandidate, PendingAttachment};

/// Results delivered from network tasks to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ConversationStarted(String),
    ChatReplied {
        response: Option<String>,
        conversation_id: Option<String>,
    },
    ChatAccepted {
        session_id: String,
    },
    /// `candidate` is the selection that produced the upload, so stale
    /// results can be told apart from the latest pick.
    Uploaded {
        candidate: FileCandidate,
        attachment: PendingAttachment,
    },
    SystemStatusLoaded(Vec<ComponentStatus>),
    StatusChecked(BackendStatus),
    SessionsLoaded(Vec<Session>),
    HistoryLoaded {
        session_id: String,
        messages: Vec<Message>,
    },
    SessionCreated(Session),
    SessionDeleted(String),
    HistoryCleared(String),
    Push(PushEvent),
    StreamConnected,
    StreamDisconnected(String),
    Failed {
        command: Command,
        error: ClientError,
    },
}

/// Network work requested by a state transition. Executed by
/// [`crate::backend::BackendClient::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NewConversation,
    Chat {
        message: String,
        conversation_id: Option<String>,
        attachment: Option<PendingAttachment>,
    },
    Upload(FileCandidate),
    SystemStatus {
        silent: bool,
    },
    CheckStatus,
    StreamChat {
        message: String,
        session_id: String,
    },
    ListSessions,
    FetchHistory {
        session_id: String,
    },
    CreateSession {
        name: String,
    },
    DeleteSession {
        session_id: String,
    },
    ClearHistory {
        session_id: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewConversation => "new_conversation",
            Self::Chat { .. } => "chat",
            Self::Upload(_) => "upload",
            Self::SystemStatus { .. } => "system_status",
            Self::CheckStatus => "check_status",
            Self::StreamChat { .. } => "stream_chat",
            Self::ListSessions => "list_sessions",
            Self::FetchHistory { .. } => "fetch_history",
            Self::CreateSession { .. } => "create_session",
            Self::DeleteSession { .. } => "delete_session",
            Self::ClearHistory { .. } => "clear_history",
        }
    }
}
