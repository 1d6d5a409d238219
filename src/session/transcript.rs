use super::events::TranscriptFragment;
use super::types::Utterance;
use tracing::debug;

/// What a fragment did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    Appended,
    Refined,
    Ignored,
}

/// Ordered utterances built from streamed transcript fragments.
#[derive(Debug, Clone, Default)]
pub struct TranscriptAggregator {
    utterances: Vec<Utterance>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence, e.g. from a snapshot.
    pub fn reset(&mut self, utterances: Vec<Utterance>) {
        self.utterances = utterances;
    }

    pub fn apply(&mut self, fragment: TranscriptFragment) -> TranscriptChange {
        if fragment.new_words {
            self.utterances.push(Utterance {
                speaker: fragment.speaker.unwrap_or_default(),
                transcript: fragment.transcript,
                start: fragment.start.unwrap_or_default(),
                end: fragment.end.unwrap_or_default(),
                is_new_utterance: true,
            });
            return TranscriptChange::Appended;
        }

        // Only the text is refined; speaker and timing stay as first seen.
        match self.utterances.last_mut() {
            Some(last) => {
                last.transcript = fragment.transcript;
                TranscriptChange::Refined
            }
            None => {
                debug!("Dropping transcript refinement with no utterance to refine");
                TranscriptChange::Ignored
            }
        }
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_words(speaker: &str, text: &str, start: f64, end: f64) -> TranscriptFragment {
        TranscriptFragment {
            new_words: true,
            speaker: Some(speaker.to_string()),
            transcript: text.to_string(),
            start: Some(start),
            end: Some(end),
        }
    }

    fn refine(text: &str) -> TranscriptFragment {
        TranscriptFragment {
            new_words: false,
            speaker: None,
            transcript: text.to_string(),
            start: None,
            end: None,
        }
    }

    #[test]
    fn test_refinement_on_empty_sequence_is_noop() {
        let mut transcript = TranscriptAggregator::new();
        assert_eq!(transcript.apply(refine("orphan")), TranscriptChange::Ignored);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_new_words_append() {
        let mut transcript = TranscriptAggregator::new();
        assert_eq!(
            transcript.apply(new_words("A", "hello", 0.0, 500.0)),
            TranscriptChange::Appended
        );
        assert_eq!(
            transcript.apply(new_words("B", "hi", 600.0, 900.0)),
            TranscriptChange::Appended
        );
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.utterances()[1].speaker, "B");
    }

    #[test]
    fn test_refinement_replaces_only_last_text() {
        let mut transcript = TranscriptAggregator::new();
        transcript.apply(new_words("A", "hello", 0.0, 500.0));
        transcript.apply(new_words("B", "so", 600.0, 700.0));

        let mut refinement = refine("so what now");
        refinement.speaker = Some("Z".to_string());
        refinement.start = Some(999.0);
        assert_eq!(transcript.apply(refinement), TranscriptChange::Refined);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.utterances()[0].transcript, "hello");
        let last = &transcript.utterances()[1];
        assert_eq!(last.transcript, "so what now");
        assert_eq!(last.speaker, "B");
        assert_eq!(last.start, 600.0);
        assert_eq!(last.end, 700.0);
    }

    #[test]
    fn test_length_tracks_event_kinds() {
        let events = vec![
            refine("x"),
            new_words("A", "a", 0.0, 1.0),
            refine("ab"),
            refine("abc"),
            new_words("B", "b", 1.0, 2.0),
            refine("bc"),
            new_words("A", "c", 2.0, 3.0),
        ];

        let mut transcript = TranscriptAggregator::new();
        for event in events {
            let before = transcript.len();
            let appends = event.new_words;
            transcript.apply(event);
            if appends {
                assert_eq!(transcript.len(), before + 1);
            } else {
                assert_eq!(transcript.len(), before);
            }
        }
        let texts: Vec<&str> = transcript
            .utterances()
            .iter()
            .map(|u| u.transcript.as_str())
            .collect();
        assert_eq!(texts, vec!["abc", "bc", "c"]);
    }

    #[test]
    fn test_reset_replaces_sequence() {
        let mut transcript = TranscriptAggregator::new();
        transcript.apply(new_words("A", "stale", 0.0, 1.0));
        transcript.reset(vec![Utterance {
            speaker: "S".to_string(),
            transcript: "from snapshot".to_string(),
            ..Utterance::default()
        }]);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.utterances()[0].transcript, "from snapshot");
    }
}
