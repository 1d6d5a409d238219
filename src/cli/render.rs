//! Plain-text rendering of sessions and records for the terminal.

use chrono::Local;

use crate::session::{ChatMessage, JoiningStatus, MeetingRecord, SessionViewModel, Utterance};

pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn format_utterance(utterance: &Utterance) -> String {
    let speaker = if utterance.speaker.is_empty() {
        "Unknown"
    } else {
        utterance.speaker.as_str()
    };
    format!(
        "[{}] {}: {}",
        format_timestamp(utterance.start),
        speaker,
        utterance.transcript.trim()
    )
}

pub fn format_chat(message: &ChatMessage) -> String {
    format!("💬 {}: {}", message.sender, message.message)
}

/// One line per record for listings.
pub fn format_record_line(record: &MeetingRecord) -> String {
    let created = record
        .created_at
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = record
        .joining_status
        .map(|s| s.as_str())
        .unwrap_or("UNKNOWN");
    let platform = record.platform.map(|p| p.as_str()).unwrap_or("-");
    format!(
        "{}  {} [{} / {}] {}",
        record.id,
        record.display_title(),
        platform,
        status,
        created
    )
}

/// Turns successive view models into the lines that are new since the last
/// call. The last utterance may still be refined, so it is only printed once
/// a newer one starts or the session is flushed.
#[derive(Debug, Default)]
pub struct SessionPrinter {
    header_printed: bool,
    status: Option<JoiningStatus>,
    participants: Option<i64>,
    chats_printed: usize,
    utterances_printed: usize,
}

impl SessionPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&mut self, model: &SessionViewModel) -> Vec<String> {
        if model.loading {
            return Vec::new();
        }

        let mut lines = Vec::new();

        if !self.header_printed {
            self.header_printed = true;
            if let Some(meta) = &model.metadata {
                lines.push(format!("Meeting: {}", meta.display_title()));
                if let Some(organizer) = meta.organizer.as_deref().filter(|o| !o.is_empty()) {
                    lines.push(format!("Organizer: {}", organizer));
                }
            }
        }

        if model.status != self.status {
            self.status = model.status;
            if let Some(status) = model.status {
                let suffix = if model.join_pending {
                    " (waiting for the bot)"
                } else {
                    ""
                };
                lines.push(format!("Status: {}{}", status.as_str(), suffix));
            }
        }

        if model.participants != self.participants {
            self.participants = model.participants;
            if let Some(count) = model.participants {
                lines.push(format!("Participants: {}", count));
            }
        }

        if let Some(new_messages) = model.chat_messages.get(self.chats_printed..) {
            lines.extend(new_messages.iter().map(format_chat));
        }
        self.chats_printed = model.chat_messages.len();

        let settled = model.utterances.len().saturating_sub(1);
        lines.extend(self.take_utterances(model, settled));

        lines
    }

    /// The utterance still being refined, if it has not been printed yet.
    pub fn caption(&self, model: &SessionViewModel) -> Option<String> {
        if model.utterances.len() > self.utterances_printed {
            model.utterances.last().map(format_utterance)
        } else {
            None
        }
    }

    /// Print everything left, including the last utterance.
    pub fn flush(&mut self, model: &SessionViewModel) -> Vec<String> {
        let mut lines = self.lines(model);
        lines.extend(self.take_utterances(model, model.utterances.len()));
        lines
    }

    fn take_utterances(&mut self, model: &SessionViewModel, upto: usize) -> Vec<String> {
        if upto <= self.utterances_printed {
            return Vec::new();
        }
        let lines = model
            .utterances
            .get(self.utterances_printed..upto)
            .map(|slice| slice.iter().map(format_utterance).collect())
            .unwrap_or_default();
        self.utterances_printed = upto;
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MeetingSessionId;

    fn utterance(speaker: &str, text: &str, start: f64) -> Utterance {
        Utterance {
            speaker: speaker.to_string(),
            transcript: text.to_string(),
            start,
            end: start + 1.0,
            is_new_utterance: true,
        }
    }

    fn loaded() -> SessionViewModel {
        let mut model = SessionViewModel::loading(MeetingSessionId::parse("m1").unwrap());
        model.loading = false;
        model.metadata = Some(MeetingRecord {
            id: "m1".to_string(),
            title: Some("Weekly sync".to_string()),
            ..MeetingRecord::default()
        });
        model.status = Some(JoiningStatus::Processing);
        model
    }

    #[test]
    fn test_format_utterance() {
        assert_eq!(
            format_utterance(&utterance("Ann", " hello ", 75.4)),
            "[01:15] Ann: hello"
        );
        assert_eq!(
            format_utterance(&utterance("", "hi", 0.0)),
            "[00:00] Unknown: hi"
        );
    }

    #[test]
    fn test_nothing_while_loading() {
        let mut printer = SessionPrinter::new();
        let model = SessionViewModel::loading(MeetingSessionId::parse("m1").unwrap());
        assert!(printer.lines(&model).is_empty());
    }

    #[test]
    fn test_last_utterance_held_back_until_superseded() {
        let mut printer = SessionPrinter::new();
        let mut model = loaded();
        model.utterances.push(utterance("A", "Hel", 0.0));

        let lines = printer.lines(&model);
        assert_eq!(lines, vec!["Meeting: Weekly sync", "Status: PROCESSING"]);
        assert_eq!(printer.caption(&model).as_deref(), Some("[00:00] A: Hel"));

        model.utterances[0].transcript = "Hello".to_string();
        model.utterances.push(utterance("B", "Hi", 2.0));
        let lines = printer.lines(&model);
        assert_eq!(lines, vec!["[00:00] A: Hello"]);
        assert_eq!(printer.caption(&model).as_deref(), Some("[00:02] B: Hi"));

        let lines = printer.flush(&model);
        assert_eq!(lines, vec!["[00:02] B: Hi"]);
        assert!(printer.caption(&model).is_none());
    }

    #[test]
    fn test_chat_and_participants_printed_once() {
        let mut printer = SessionPrinter::new();
        let mut model = loaded();
        printer.lines(&model);

        model.participants = Some(3);
        model.chat_messages.push(ChatMessage {
            sender: "Ann".to_string(),
            message: "hi".to_string(),
            timestamp: 1,
        });
        assert_eq!(
            printer.lines(&model),
            vec!["Participants: 3", "💬 Ann: hi"]
        );
        assert!(printer.lines(&model).is_empty());
    }
}
