use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub mod directory;

pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// History loaded from the backend carries no timestamps.
    pub timestamp: Option<DateTime<Local>>,
}

impl Message {
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Local::now()),
        }
    }

    fn from_history(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub created_at: String,
}

/// One user/assistant pair as returned by `/api/history/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub assistant: String,
}

pub fn messages_from_history(history: Vec<Exchange>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2);
    for exchange in history {
        if !exchange.user.is_empty() {
            messages.push(Message::from_history(Role::User, exchange.user));
        }
        if !exchange.assistant.is_empty() {
            messages.push(Message::from_history(Role::Assistant, exchange.assistant));
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::{messages_from_history, Exchange, Role, Session};

    #[test]
    fn history_pairs_flatten_in_order() {
        let history = vec![
            Exchange {
                user: "hi".to_string(),
                assistant: "hello".to_string(),
            },
            Exchange {
                user: "weather?".to_string(),
                assistant: String::new(),
            },
        ];

        let messages = messages_from_history(history);
        let roles: Vec<Role> = messages.iter().map(|message| message.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[2].content, "weather?");
        assert!(messages.iter().all(|message| message.timestamp.is_none()));
    }

    #[test]
    fn session_list_tolerates_missing_counts() {
        let data = r#"{"session_id": "abc", "name": "Trip planning"}"#;
        let session: Session = serde_json::from_str(data).expect("session should parse");
        assert_eq!(session.message_count, 0);
    }
}
