//! Folding push-channel events into the visible transcript.
//!
//! The reconciler is either idle or accumulating into exactly one assistant
//! message. Each response opens one bubble; chunks for any session other than
//! the active one never touch the transcript.

use crate::session::Role;
use crate::transcript::Transcript;
use serde::Deserialize;

pub mod channel;

/// One JSON payload from `/api/stream`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    Chunk {
        #[serde(default)]
        content: String,
        #[serde(default)]
        session_id: Option<String>,
    },
    Complete {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        response_time: Option<f64>,
    },
    Error {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Ping,
}

impl PushEvent {
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    /// `index` is the transcript entry receiving chunks.
    Accumulating { index: usize },
}

/// What an event did, so the caller can run side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Opened,
    Appended,
    Ignored,
    Completed {
        response_time: Option<f64>,
        for_active: bool,
    },
    Failed(String),
    KeepAlive,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    state: StreamState,
}

impl Reconciler {
    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, StreamState::Accumulating { .. })
    }

    /// Forgets the open message without touching the transcript.
    pub fn reset(&mut self) {
        self.state = StreamState::Idle;
    }

    /// Follows the open message after `offset` entries were inserted ahead
    /// of it.
    pub fn shift(&mut self, offset: usize) {
        if let StreamState::Accumulating { index } = &mut self.state {
            *index += offset;
        }
    }

    pub fn apply(
        &mut self,
        event: PushEvent,
        active_session: &str,
        transcript: &mut Transcript,
    ) -> Outcome {
        match event {
            PushEvent::Chunk {
                content,
                session_id,
            } => {
                if session_id.as_deref() != Some(active_session) {
                    return Outcome::Ignored;
                }
                if let StreamState::Accumulating { index } = self.state {
                    if transcript.append_to(index, &content) {
                        return Outcome::Appended;
                    }
                }
                let index = transcript.append(Role::Assistant, content);
                self.state = StreamState::Accumulating { index };
                Outcome::Opened
            }
            PushEvent::Complete {
                session_id,
                response_time,
            } => {
                let for_active = targets(session_id.as_deref(), active_session);
                if for_active {
                    self.state = StreamState::Idle;
                }
                Outcome::Completed {
                    response_time,
                    for_active,
                }
            }
            PushEvent::Error {
                content,
                session_id,
            } => {
                if !targets(session_id.as_deref(), active_session) {
                    return Outcome::Ignored;
                }
                self.state = StreamState::Idle;
                Outcome::Failed(content.unwrap_or_else(|| "The response failed.".to_string()))
            }
            PushEvent::Ping => Outcome::KeepAlive,
        }
    }
}

/// Completion and error events without a session id apply to the active one.
fn targets(session_id: Option<&str>, active_session: &str) -> bool {
    session_id.map_or(true, |id| id == active_session)
}

#[cfg(test)]
mod tests {
    use super::{Outcome, PushEvent, Reconciler, StreamState};
    use crate::session::{Message, Role};
    use crate::transcript::Transcript;

    fn chunk(content: &str, session: &str) -> PushEvent {
        PushEvent::Chunk {
            content: content.to_string(),
            session_id: Some(session.to_string()),
        }
    }

    fn complete(session: &str) -> PushEvent {
        PushEvent::Complete {
            session_id: Some(session.to_string()),
            response_time: Some(1.25),
        }
    }

    fn assistant_contents(transcript: &Transcript) -> Vec<String> {
        transcript
            .messages()
            .filter(|message| message.role == Role::Assistant)
            .map(|message| message.content.clone())
            .collect()
    }

    #[test]
    fn matching_chunks_concatenate_into_one_message() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        transcript.append(Role::User, "Hello");

        let parts = ["Hi", " there", ",", " how can I help?"];
        let outcomes: Vec<Outcome> = parts
            .iter()
            .map(|part| reconciler.apply(chunk(part, "s1"), "s1", &mut transcript))
            .collect();

        assert_eq!(outcomes[0], Outcome::Opened);
        assert!(outcomes[1..].iter().all(|outcome| *outcome == Outcome::Appended));
        assert_eq!(assistant_contents(&transcript), vec![parts.concat()]);
        assert_eq!(reconciler.state(), StreamState::Accumulating { index: 1 });
    }

    #[test]
    fn chunk_for_other_session_leaves_transcript_untouched() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("mine", "s1"), "s1", &mut transcript);
        let before = transcript.entries().to_vec();

        let outcome = reconciler.apply(chunk("theirs", "s2"), "s1", &mut transcript);
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(transcript.entries(), before.as_slice());
        assert!(reconciler.is_accumulating());
    }

    #[test]
    fn chunk_without_session_id_is_dropped() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        let event = PushEvent::Chunk {
            content: "orphan".to_string(),
            session_id: None,
        };
        assert_eq!(reconciler.apply(event, "s1", &mut transcript), Outcome::Ignored);
        assert!(transcript.is_empty());
    }

    #[test]
    fn complete_then_chunk_opens_new_message() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("first", "s1"), "s1", &mut transcript);

        let outcome = reconciler.apply(complete("s1"), "s1", &mut transcript);
        assert_eq!(
            outcome,
            Outcome::Completed {
                response_time: Some(1.25),
                for_active: true
            }
        );
        assert_eq!(reconciler.state(), StreamState::Idle);

        assert_eq!(
            reconciler.apply(chunk("second", "s1"), "s1", &mut transcript),
            Outcome::Opened
        );
        assert_eq!(assistant_contents(&transcript), vec!["first", "second"]);
    }

    #[test]
    fn shifted_reconciler_keeps_feeding_the_same_message() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        transcript.append(Role::User, "Hello");
        reconciler.apply(chunk("Hi", "s1"), "s1", &mut transcript);

        let moved = transcript.prepend(vec![Message::now(Role::User, "earlier")]);
        reconciler.shift(moved);
        assert_eq!(reconciler.state(), StreamState::Accumulating { index: 2 });

        assert_eq!(
            reconciler.apply(chunk(" there", "s1"), "s1", &mut transcript),
            Outcome::Appended
        );
        assert_eq!(assistant_contents(&transcript), vec!["Hi there"]);
    }

    #[test]
    fn complete_for_background_session_keeps_accumulating() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("open", "s1"), "s1", &mut transcript);

        let outcome = reconciler.apply(complete("s2"), "s1", &mut transcript);
        assert_eq!(
            outcome,
            Outcome::Completed {
                response_time: Some(1.25),
                for_active: false
            }
        );
        assert!(reconciler.is_accumulating());
    }

    #[test]
    fn error_event_returns_to_idle() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("partial", "s1"), "s1", &mut transcript);
        let event = PushEvent::Error {
            content: Some("model crashed".to_string()),
            session_id: None,
        };
        assert_eq!(
            reconciler.apply(event, "s1", &mut transcript),
            Outcome::Failed("model crashed".to_string())
        );
        assert_eq!(reconciler.state(), StreamState::Idle);
    }

    #[test]
    fn ping_changes_nothing() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("open", "s1"), "s1", &mut transcript);
        let state = reconciler.state();
        assert_eq!(
            reconciler.apply(PushEvent::Ping, "s1", &mut transcript),
            Outcome::KeepAlive
        );
        assert_eq!(reconciler.state(), state);
        assert_eq!(transcript.entries().len(), 1);
    }

    #[test]
    fn chunk_after_transcript_replaced_opens_fresh_bubble() {
        let mut reconciler = Reconciler::default();
        let mut transcript = Transcript::default();
        reconciler.apply(chunk("open", "s1"), "s1", &mut transcript);
        transcript.clear();
        transcript.notice("Reconnecting...");

        assert_eq!(
            reconciler.apply(chunk("more", "s1"), "s1", &mut transcript),
            Outcome::Opened
        );
        assert_eq!(assistant_contents(&transcript), vec!["more"]);
    }

    #[test]
    fn parses_wire_payloads() {
        assert_eq!(
            PushEvent::parse(r#"{"type": "chunk", "content": "Hi", "session_id": "default"}"#)
                .expect("chunk parses"),
            chunk("Hi", "default")
        );
        assert_eq!(
            PushEvent::parse(r#"{"type": "ping", "timestamp": 12}"#).expect("ping parses"),
            PushEvent::Ping
        );
        assert_eq!(
            PushEvent::parse(r#"{"type": "complete", "session_id": "a", "response_time": 2.5}"#)
                .expect("complete parses"),
            PushEvent::Complete {
                session_id: Some("a".to_string()),
                response_time: Some(2.5)
            }
        );
        assert!(PushEvent::parse(r#"{"type": "mystery"}"#).is_err());
    }
}
