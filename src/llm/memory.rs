use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

/// One utterance in a conversation. Immutable once appended; ordering is
/// defined by insertion into [`ConversationMemory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered log of turns for a single session.
///
/// Usually alternates user/assistant, but consecutive same-speaker turns
/// are allowed (e.g. a seeded opening message). All operations are total.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push(Turn::new(speaker, text));
    }

    /// Copy-out view of the full history; mutating the returned turns does
    /// not touch internal state.
    pub fn history(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// The most recent `window` turns, oldest first.
    pub fn recent(&self, window: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..].to_vec()
    }

    /// Idempotent.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Render turns as a plain transcript, one "Speaker: text" line each.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker.as_str(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "first");
        memory.append(Speaker::Assistant, "second");
        memory.append(Speaker::User, "third");

        let history = memory.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "first");
        assert_eq!(history[2].text, "third");
    }

    #[test]
    fn history_is_copy_out() {
        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "original");

        let mut history = memory.history();
        history[0].text = "mutated".to_string();

        assert_eq!(memory.history()[0].text, "original");
    }

    #[test]
    fn clear_is_idempotent() {
        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "hello");

        memory.clear();
        assert!(memory.is_empty());

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn consecutive_same_speaker_turns_are_kept() {
        let mut memory = ConversationMemory::new();
        memory.append(Speaker::Assistant, "opening");
        memory.append(Speaker::Assistant, "follow-up");

        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn recent_returns_last_window() {
        let mut memory = ConversationMemory::new();
        for i in 0..10 {
            memory.append(Speaker::User, format!("turn {}", i));
        }

        let recent = memory.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].text, "turn 7");
        assert_eq!(recent[2].text, "turn 9");

        assert_eq!(memory.recent(100).len(), 10);
    }

    #[test]
    fn transcript_renders_speaker_labels() {
        let mut memory = ConversationMemory::new();
        memory.append(Speaker::User, "hi");
        memory.append(Speaker::Assistant, "hello");

        let transcript = render_transcript(&memory.history());
        assert_eq!(transcript, "User: hi\nAssistant: hello");
    }
}
