use crate::error::ClientError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Payload of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub ollama_available: bool,
    #[serde(default)]
    pub model_available: bool,
    #[serde(default)]
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Checking,
    Connected,
    Disconnected(Diagnostic),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    EngineUnreachable,
    ModelMissing { model_name: String },
    Unreachable(String),
}

impl Diagnostic {
    pub fn message(&self) -> String {
        match self {
            Self::EngineUnreachable => {
                "Ollama is not running. Start it with `ollama serve` and try again.".to_string()
            }
            Self::ModelMissing { model_name } => {
                format!("Model {model_name} is not installed. Run `ollama pull {model_name}`.")
            }
            Self::Unreachable(reason) => format!("Cannot reach the chat server: {reason}"),
        }
    }
}

impl From<&BackendStatus> for Connection {
    fn from(status: &BackendStatus) -> Self {
        if !status.ollama_available {
            Self::Disconnected(Diagnostic::EngineUnreachable)
        } else if !status.model_available {
            Self::Disconnected(Diagnostic::ModelMissing {
                model_name: status.model_name.clone(),
            })
        } else {
            Self::Connected
        }
    }
}

/// Connection indicator plus the system-status panel contents.
#[derive(Debug, Clone)]
pub struct StatusMonitor {
    connection: Connection,
    model_name: Option<String>,
    components: Option<Result<Vec<ComponentStatus>, String>>,
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self {
            connection: Connection::Checking,
            model_name: None,
            components: None,
        }
    }
}

impl StatusMonitor {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn apply(&mut self, status: &BackendStatus) {
        self.connection = Connection::from(status);
        if !status.model_name.is_empty() {
            self.model_name = Some(status.model_name.clone());
        }
    }

    pub fn mark_connected(&mut self) {
        self.connection = Connection::Connected;
    }

    pub fn mark_unreachable(&mut self, reason: impl Into<String>) {
        self.connection = Connection::Disconnected(Diagnostic::Unreachable(reason.into()));
    }

    pub fn mark_checking(&mut self) {
        self.connection = Connection::Checking;
    }

    /// Refuses a send while disconnected. `Checking` lets the send through:
    /// only a known-bad state short-circuits.
    pub fn ensure_can_send(&self) -> Result<(), ClientError> {
        match &self.connection {
            Connection::Disconnected(diagnostic) => Err(ClientError::Disconnected(format!(
                "Not connected. {}",
                diagnostic.message()
            ))),
            Connection::Checking | Connection::Connected => Ok(()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self.connection {
            Connection::Checking => "Checking...",
            Connection::Connected => "Connected",
            Connection::Disconnected(_) => "Disconnected",
        }
    }

    pub fn components(&self) -> Option<&Result<Vec<ComponentStatus>, String>> {
        self.components.as_ref()
    }

    pub fn set_components(&mut self, components: Vec<ComponentStatus>) {
        self.components = Some(Ok(components));
    }

    pub fn set_components_failed(&mut self) {
        self.components = Some(Err("Failed to load system status".to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStatus {
    pub label: String,
    pub status: String,
    pub level: Level,
}

/// Payload of `GET /system_status`. Status values are usually strings with
/// an embedded glyph; anything else is shown as its JSON text.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemStatusResponse {
    #[serde(default)]
    pub components: BTreeMap<String, serde_json::Value>,
}

impl SystemStatusResponse {
    pub fn into_components(self) -> Vec<ComponentStatus> {
        self.components
            .into_iter()
            .map(|(name, value)| {
                let status = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                ComponentStatus {
                    label: component_label(&name),
                    level: classify(&status),
                    status,
                }
            })
            .collect()
    }
}

pub fn classify(status: &str) -> Level {
    if status.contains('❌') {
        Level::Error
    } else if status.contains("⚠️") || status.contains('⚠') {
        Level::Warning
    } else {
        Level::Success
    }
}

/// `pdf_processing` becomes `PDF PROCESSING`; only the first underscore is
/// replaced.
pub fn component_label(name: &str) -> String {
    name.replacen('_', " ", 1).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::{
        classify, component_label, BackendStatus, Connection, Diagnostic, Level, StatusMonitor,
        SystemStatusResponse,
    };
    use crate::error::ClientError;

    fn status(engine: bool, model: bool) -> BackendStatus {
        BackendStatus {
            ollama_available: engine,
            model_available: model,
            model_name: "gemma2:2b".to_string(),
        }
    }

    #[test]
    fn each_missing_piece_gets_its_own_diagnostic() {
        assert_eq!(
            Connection::from(&status(false, false)),
            Connection::Disconnected(Diagnostic::EngineUnreachable)
        );
        assert_eq!(
            Connection::from(&status(true, false)),
            Connection::Disconnected(Diagnostic::ModelMissing {
                model_name: "gemma2:2b".to_string()
            })
        );
        assert_eq!(Connection::from(&status(true, true)), Connection::Connected);
    }

    #[test]
    fn disconnected_monitor_refuses_sends() {
        let mut monitor = StatusMonitor::default();
        assert!(monitor.ensure_can_send().is_ok());

        monitor.apply(&status(false, true));
        let error = monitor.ensure_can_send().expect_err("engine is down");
        assert!(matches!(error, ClientError::Disconnected(message) if message.contains("ollama serve")));

        monitor.apply(&status(true, true));
        assert!(monitor.ensure_can_send().is_ok());
        assert_eq!(monitor.model_name(), Some("gemma2:2b"));
    }

    #[test]
    fn glyphs_decide_the_level() {
        assert_eq!(classify("❌ Not connected"), Level::Error);
        assert_eq!(classify("⚠️ Degraded"), Level::Warning);
        assert_eq!(classify("✅ Working"), Level::Success);
    }

    #[test]
    fn only_first_underscore_is_replaced() {
        assert_eq!(component_label("ollama_connection"), "OLLAMA CONNECTION");
        assert_eq!(component_label("active_model_count"), "ACTIVE MODEL_COUNT");
    }

    #[test]
    fn non_string_values_are_shown_verbatim() {
        let response: SystemStatusResponse = serde_json::from_str(
            r#"{"components": {"email_service": "✅ Ready", "active_conversations": 3}}"#,
        )
        .expect("status should parse");
        let components = response.into_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].label, "ACTIVE CONVERSATIONS");
        assert_eq!(components[0].status, "3");
        assert_eq!(components[1].level, Level::Success);
    }
}
