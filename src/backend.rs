use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::event::{AppEvent, Command};
use crate::session::{messages_from_history, Exchange, Session};
use crate::status::{BackendStatus, SystemStatusResponse};
use crate::stream::channel::{self, RECONNECT_DELAY};
use crate::upload::{FileCandidate, UploadResponse};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tokio::runtime::Handle;

#[derive(Debug, Deserialize)]
struct NewChatResponse {
    conversation_id: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<Exchange>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP side of the client. Every call runs on the tokio runtime and reports
/// back through the event channel; nothing here touches UI state.
#[derive(Clone)]
pub struct BackendClient {
    config: Arc<Config>,
    tx: mpsc::Sender<AppEvent>,
    http: reqwest::Client,
    stream_http: reqwest::Client,
    runtime_handle: Handle,
    stream_started: Arc<AtomicBool>,
}

impl BackendClient {
    pub fn new(config: Config, tx: mpsc::Sender<AppEvent>) -> ClientResult<Self> {
        let runtime_handle = Handle::try_current()
            .map_err(|err| ClientError::Transport(format!("tokio runtime unavailable: {err}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ClientError::transport)?;
        // The push channel is long-lived, so only connecting is bounded.
        let stream_http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ClientError::transport)?;

        Ok(Self {
            config: Arc::new(config),
            tx,
            http,
            stream_http,
            runtime_handle,
            stream_started: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn dispatch(&self, command: Command) {
        let client = self.clone();
        self.runtime_handle.spawn(async move {
            tracing::debug!(command = command.name(), "dispatching request");
            let event = match client.run(&command).await {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(command = command.name(), kind = error.kind(), %error, "request failed");
                    AppEvent::Failed { command, error }
                }
            };
            let _ = client.tx.send(event);
        });
    }

    pub fn dispatch_all(&self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }

    /// Starts the push channel once; later calls are no-ops.
    pub fn start_stream(&self) {
        if self
            .stream_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let http = self.stream_http.clone();
        let url = self.config.endpoint("/api/stream");
        let tx = self.tx.clone();
        self.runtime_handle.spawn(channel::run_with_reconnect(
            move || channel::open_stream(http.clone(), url.clone(), tx.clone()),
            self.tx.clone(),
            RECONNECT_DELAY,
        ));
    }

    async fn run(&self, command: &Command) -> ClientResult<AppEvent> {
        match command {
            Command::NewConversation => {
                let body: NewChatResponse = self.post_json("/new_chat", &json!({})).await?;
                Ok(AppEvent::ConversationStarted(body.conversation_id))
            }
            Command::Chat {
                message,
                conversation_id,
                attachment,
            } => {
                let request = ChatRequest {
                    message,
                    conversation_id: conversation_id.as_deref(),
                    file_path: attachment.as_ref().map(|file| file.file_path.as_str()),
                    file_type: attachment.as_ref().map(|file| file.file_type.as_str()),
                };
                let body: ChatResponse = self.post_json("/chat", &request).await?;
                if let Some(error) = body.error {
                    return Err(ClientError::Application(error));
                }
                Ok(AppEvent::ChatReplied {
                    response: body.response,
                    conversation_id: body.conversation_id,
                })
            }
            Command::Upload(candidate) => self.upload(candidate).await,
            Command::SystemStatus { .. } => {
                let body: SystemStatusResponse = self.get_json("/system_status").await?;
                Ok(AppEvent::SystemStatusLoaded(body.into_components()))
            }
            Command::CheckStatus => {
                let status: BackendStatus = self.get_json("/api/status").await?;
                tracing::info!(
                    ollama_available = status.ollama_available,
                    model_available = status.model_available,
                    model = %status.model_name,
                    "backend status"
                );
                Ok(AppEvent::StatusChecked(status))
            }
            Command::StreamChat {
                message,
                session_id,
            } => {
                let response = self
                    .http
                    .post(self.config.endpoint("/api/chat"))
                    .json(&json!({ "message": message, "session_id": session_id }))
                    .send()
                    .await?;
                check_status(response).await?;
                Ok(AppEvent::ChatAccepted {
                    session_id: session_id.clone(),
                })
            }
            Command::ListSessions => {
                let body: SessionsResponse = self.get_json("/api/sessions").await?;
                Ok(AppEvent::SessionsLoaded(body.sessions))
            }
            Command::FetchHistory { session_id } => {
                let body: HistoryResponse =
                    self.get_json(&format!("/api/history/{session_id}")).await?;
                Ok(AppEvent::HistoryLoaded {
                    session_id: session_id.clone(),
                    messages: messages_from_history(body.history),
                })
            }
            Command::CreateSession { name } => {
                let session: Session = self
                    .post_json("/api/session/new", &json!({ "name": name }))
                    .await?;
                Ok(AppEvent::SessionCreated(session))
            }
            Command::DeleteSession { session_id } => {
                let response = self
                    .http
                    .delete(self.config.endpoint(&format!("/api/session/{session_id}")))
                    .send()
                    .await?;
                check_status(response).await?;
                Ok(AppEvent::SessionDeleted(session_id.clone()))
            }
            Command::ClearHistory { session_id } => {
                let response = self
                    .http
                    .post(self.config.endpoint(&format!("/api/history/{session_id}/clear")))
                    .send()
                    .await?;
                check_status(response).await?;
                Ok(AppEvent::HistoryCleared(session_id.clone()))
            }
        }
    }

    async fn upload(&self, candidate: &FileCandidate) -> ClientResult<AppEvent> {
        let name = candidate.name();
        let bytes = tokio::fs::read(&candidate.path).await.map_err(|err| {
            ClientError::Validation(format!("Could not read {}: {err}", candidate.path.display()))
        })?;
        tracing::info!(file = %name, size = bytes.len(), "uploading file");

        let form = Form::new().part("file", Part::bytes(bytes).file_name(name.clone()));
        let response = self
            .http
            .post(self.config.endpoint("/upload_file"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = read_json(response).await?;
        Ok(AppEvent::Uploaded {
            candidate: candidate.clone(),
            attachment: body.into_attachment(&name)?,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.http.get(self.config.endpoint(path)).send().await?;
        read_json(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

/// Maps non-2xx responses to errors, preferring the server's own `{error}`
/// message when it sent one.
async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

fn error_from_body(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(payload) => ClientError::Application(payload.error),
        Err(_) => ClientError::Transport(format!("Server returned HTTP {status}")),
    }
}
