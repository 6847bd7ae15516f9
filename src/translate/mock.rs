use std::thread;
use std::time::Duration;

use super::{CompletionRequest, RequestError, Requester, StreamSink};

const DEFAULT_WORD_DELAY: Duration = Duration::from_millis(40);

/// Echoes the input back, tagged with the target language, one word at a
/// time. No model access needed.
#[derive(Debug, Clone)]
pub struct MockRequester {
    word_delay: Duration,
}

impl Default for MockRequester {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRequester {
    pub fn new() -> Self {
        Self {
            word_delay: DEFAULT_WORD_DELAY,
        }
    }

    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }
}

pub fn mock_translation(target_language: &str, text: &str) -> String {
    format!("[Mocked translation to {target_language}]: {text}")
}

impl Requester for MockRequester {
    fn run(&self, request: &CompletionRequest, sink: &StreamSink) -> Result<(), RequestError> {
        let reply = mock_translation(&request.target_language, &request.text);
        for word in reply.split_inclusive(' ') {
            if !sink.append(word) {
                break;
            }
            if !self.word_delay.is_zero() {
                thread::sleep(self.word_delay);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::translate::{StreamingTranslator, Translator, settle};

    #[test]
    fn streams_tagged_echo() {
        let settings = Settings {
            target_language: "Japanese".into(),
            ..Settings::default()
        };
        let mut translator =
            StreamingTranslator::new(MockRequester::new().with_word_delay(Duration::ZERO), &settings);
        let buffer = translator.request("good morning");
        assert!(settle(&mut translator, Duration::from_secs(5)));
        assert_eq!(
            buffer.borrow().content(),
            "[Mocked translation to Japanese]: good morning"
        );
        assert!(!buffer.borrow().has_error());
    }
}
