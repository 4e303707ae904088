use crate::upload::PendingAttachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Send,
    NewLine,
}

/// Enter sends; Shift+Enter breaks the line.
pub fn key_action(shift_held: bool) -> KeyAction {
    if shift_held {
        KeyAction::NewLine
    } else {
        KeyAction::Send
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text: String,
    pub attachment: Option<PendingAttachment>,
}

/// Composer text, the optional attachment, and whether a send is in flight.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    pub buffer: String,
    attachment: Option<PendingAttachment>,
    busy: bool,
}

impl InputController {
    pub fn text(&self) -> &str {
        self.buffer.trim()
    }

    pub fn attachment(&self) -> Option<&PendingAttachment> {
        self.attachment.as_ref()
    }

    pub fn set_attachment(&mut self, attachment: PendingAttachment) {
        self.attachment = Some(attachment);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn release(&mut self) {
        self.busy = false;
    }

    pub fn has_content(&self) -> bool {
        !self.text().is_empty() || self.attachment.is_some()
    }

    pub fn can_send(&self) -> bool {
        !self.busy && self.has_content()
    }

    /// Empties the composer and locks it until [`release`](Self::release).
    pub fn take_submission(&mut self) -> Option<Submission> {
        if !self.can_send() {
            return None;
        }
        let submission = Submission {
            text: self.text().to_string(),
            attachment: self.attachment.take(),
        };
        self.buffer.clear();
        self.busy = true;
        Some(submission)
    }

    pub fn prefill(&mut self, text: &str) {
        self.buffer = text.to_string();
    }
}

/// Canned prompts offered on the welcome screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Weather,
    News,
    Email,
    Pdf,
    Image,
    Calculator,
}

impl QuickAction {
    pub const ALL: [QuickAction; 6] = [
        QuickAction::Weather,
        QuickAction::News,
        QuickAction::Email,
        QuickAction::Pdf,
        QuickAction::Image,
        QuickAction::Calculator,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Weather => "Weather",
            Self::News => "News",
            Self::Email => "Email",
            Self::Pdf => "PDF",
            Self::Image => "Image",
            Self::Calculator => "Calculator",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::Weather => "What is the current weather in London?",
            Self::News => "What are the latest news headlines?",
            Self::Email => {
                "Send a test email to test@example.com with subject \"Test\" and content \"This is a test email from the chatbot\""
            }
            Self::Pdf => "Can you read and summarize a PDF document for me?",
            Self::Image => "What can you see in this image?",
            Self::Calculator => "Calculate 25 * 40 + 15",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{key_action, InputController, KeyAction, QuickAction};
    use crate::upload::PendingAttachment;

    fn attachment() -> PendingAttachment {
        PendingAttachment {
            name: "photo.png".to_string(),
            file_path: "uploads/photo.png".to_string(),
            file_type: "image".to_string(),
            file_size: 1024,
        }
    }

    #[test]
    fn whitespace_only_text_cannot_be_sent() {
        let mut input = InputController::default();
        input.buffer = "  \n ".to_string();
        assert!(!input.can_send());
        assert!(input.take_submission().is_none());
    }

    #[test]
    fn attachment_alone_enables_send() {
        let mut input = InputController::default();
        input.set_attachment(attachment());
        assert!(input.can_send());
    }

    #[test]
    fn submission_clears_and_locks_until_released() {
        let mut input = InputController::default();
        input.buffer = "  Hello  ".to_string();
        input.set_attachment(attachment());

        let submission = input.take_submission().expect("content present");
        assert_eq!(submission.text, "Hello");
        assert_eq!(submission.attachment, Some(attachment()));
        assert!(input.buffer.is_empty());
        assert!(input.attachment().is_none());

        input.buffer = "again".to_string();
        assert!(!input.can_send());
        input.release();
        assert!(input.can_send());
    }

    #[test]
    fn shift_enter_breaks_line() {
        assert_eq!(key_action(false), KeyAction::Send);
        assert_eq!(key_action(true), KeyAction::NewLine);
    }

    #[test]
    fn quick_action_prefills_without_locking() {
        let mut input = InputController::default();
        input.prefill(QuickAction::Calculator.prompt());
        assert_eq!(input.text(), "Calculate 25 * 40 + 15");
        assert!(input.can_send());
    }
}
