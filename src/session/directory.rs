use crate::error::{ClientError, ClientResult};
use crate::session::{Session, DEFAULT_SESSION_ID};
use chrono::{DateTime, Local};

/// A destructive session action waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteSession { session_id: String, name: String },
    ClearHistory { session_id: String, name: String },
}

impl Confirmation {
    pub fn prompt(&self) -> String {
        match self {
            Self::DeleteSession { name, .. } => {
                format!("Delete session \"{name}\"? This cannot be undone.")
            }
            Self::ClearHistory { name, .. } => {
                format!("Clear all messages in \"{name}\"? The session itself is kept.")
            }
        }
    }
}

/// Known conversations and which one is on screen.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    sessions: Vec<Session>,
    active_id: String,
    pending: Option<Confirmation>,
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            active_id: DEFAULT_SESSION_ID.to_string(),
            pending: None,
        }
    }
}

impl SessionDirectory {
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active_id == session_id
    }

    pub fn replace_sessions(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions;
    }

    /// Returns `false` when `session_id` was already active.
    pub fn activate(&mut self, session_id: &str) -> bool {
        if self.active_id == session_id {
            return false;
        }
        self.active_id = session_id.to_string();
        true
    }

    /// Upserts a freshly created session so the list highlights it before
    /// the next refresh arrives.
    pub fn insert(&mut self, session: Session) {
        if let Some(existing) = self
            .sessions
            .iter_mut()
            .find(|existing| existing.session_id == session.session_id)
        {
            *existing = session;
        } else {
            self.sessions.push(session);
        }
    }

    pub fn request_delete(&mut self, session_id: &str) -> ClientResult<()> {
        if session_id == DEFAULT_SESSION_ID {
            return Err(ClientError::Refused(
                "The default session cannot be deleted.".to_string(),
            ));
        }
        self.pending = Some(Confirmation::DeleteSession {
            session_id: session_id.to_string(),
            name: self.name_of(session_id),
        });
        Ok(())
    }

    pub fn request_clear(&mut self, session_id: &str) {
        self.pending = Some(Confirmation::ClearHistory {
            session_id: session_id.to_string(),
            name: self.name_of(session_id),
        });
    }

    pub fn pending_confirmation(&self) -> Option<&Confirmation> {
        self.pending.as_ref()
    }

    pub fn take_confirmation(&mut self) -> Option<Confirmation> {
        self.pending.take()
    }

    pub fn cancel_confirmation(&mut self) {
        self.pending = None;
    }

    /// Drops the session from the list and falls back to the default session.
    pub fn remove(&mut self, session_id: &str) {
        self.sessions
            .retain(|session| session.session_id != session_id);
        self.active_id = DEFAULT_SESSION_ID.to_string();
    }

    pub fn name_of(&self, session_id: &str) -> String {
        self.sessions
            .iter()
            .find(|session| session.session_id == session_id)
            .map(|session| session.name.clone())
            .unwrap_or_else(|| session_id.to_string())
    }
}

/// Name used when the user leaves the new-session field blank.
pub fn generated_name(now: DateTime<Local>) -> String {
    format!("Chat {}", now.format("%Y-%m-%d %H:%M:%S"))
}

pub fn resolve_name(input: &str, now: DateTime<Local>) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        generated_name(now)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_name, Confirmation, SessionDirectory};
    use crate::error::ClientError;
    use crate::session::{Session, DEFAULT_SESSION_ID};
    use chrono::{Local, TimeZone};

    fn session(id: &str, name: &str) -> Session {
        Session {
            session_id: id.to_string(),
            name: name.to_string(),
            message_count: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn starts_on_default_session() {
        let directory = SessionDirectory::default();
        assert_eq!(directory.active_id(), DEFAULT_SESSION_ID);
    }

    #[test]
    fn deleting_default_session_is_refused_without_confirmation() {
        let mut directory = SessionDirectory::default();
        let error = directory
            .request_delete(DEFAULT_SESSION_ID)
            .expect_err("default session must not be deletable");
        assert!(matches!(error, ClientError::Refused(_)));
        assert!(directory.pending_confirmation().is_none());
    }

    #[test]
    fn delete_request_waits_for_confirmation_with_session_name() {
        let mut directory = SessionDirectory::default();
        directory.replace_sessions(vec![session("s1", "Trip")]);
        directory
            .request_delete("s1")
            .expect("non-default session can be deleted");
        assert_eq!(
            directory.take_confirmation(),
            Some(Confirmation::DeleteSession {
                session_id: "s1".to_string(),
                name: "Trip".to_string(),
            })
        );
        assert!(directory.pending_confirmation().is_none());
    }

    #[test]
    fn removal_falls_back_to_default() {
        let mut directory = SessionDirectory::default();
        directory.replace_sessions(vec![session(DEFAULT_SESSION_ID, "Default"), session("s1", "Trip")]);
        directory.activate("s1");
        directory.remove("s1");
        assert_eq!(directory.active_id(), DEFAULT_SESSION_ID);
        assert_eq!(directory.sessions().len(), 1);
    }

    #[test]
    fn activate_reports_whether_anything_changed() {
        let mut directory = SessionDirectory::default();
        assert!(!directory.activate(DEFAULT_SESSION_ID));
        assert!(directory.activate("s2"));
        assert!(directory.is_active("s2"));
    }

    #[test]
    fn blank_name_becomes_timestamped() {
        let now = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("valid local time");
        assert_eq!(resolve_name("   ", now), "Chat 2024-03-09 14:05:07");
        assert_eq!(resolve_name(" Notes ", now), "Notes");
    }
}
