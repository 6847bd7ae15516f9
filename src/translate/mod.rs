//! Translation producers.
//!
//! A `Translator` hands back a fresh `StreamBuffer` immediately and fills it
//! later. Requesters run on background threads and never touch the buffer:
//! they push chunks through a `StreamSink`, and the UI thread applies them
//! when it calls `Translator::poll`, so every buffer write and observer
//! notification happens on the thread that owns the overlay.

pub mod command;
pub mod mock;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use thiserror::Error;

use crate::settings::{Provider, Settings};
use crate::stream::{SharedBuffer, StreamBuffer};

pub use command::CommandRequester;
pub use mock::MockRequester;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no command line configured for the `command` provider")]
    MissingCommand,
    #[error("invalid command line `{command}`: {source}")]
    InvalidCommand {
        command: String,
        #[source]
        source: shell_words::ParseError,
    },
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}{}", stderr_suffix(.stderr))]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("i/o error while streaming: {0}")]
    Io(#[from] io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Instruction given to the model ahead of the user's text.
pub fn system_prompt(target_language: &str) -> String {
    format!("You are a professional translator. When given text, translate it into {target_language}.")
}

/// Text shown after whatever partial translation arrived before a failure.
pub fn failure_text(err: &dyn fmt::Display) -> String {
    format!("\n[translation failed: {err}]")
}

/// Everything a requester needs for one translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub api_key: String,
    pub target_language: String,
    pub system_prompt: String,
    pub text: String,
}

impl CompletionRequest {
    /// Request template carrying everything but the user text.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            target_language: settings.target_language.clone(),
            system_prompt: system_prompt(&settings.target_language),
            text: String::new(),
        }
    }
}

/// The capability the tooltip depends on.
pub trait Translator {
    /// Start translating `text`. Returns at once; failures only ever show up
    /// as the buffer's error text.
    fn request(&mut self, text: &str) -> SharedBuffer;

    /// Apply pending producer writes. Returns how many were applied.
    fn poll(&mut self) -> usize;

    /// Streams whose producer has not finished yet.
    fn in_flight(&self) -> usize {
        0
    }
}

/// One provider's way of producing a translation. Runs on a worker thread.
pub trait Requester: Send + Sync + 'static {
    fn run(&self, request: &CompletionRequest, sink: &StreamSink) -> Result<(), RequestError>;
}

type StreamId = u64;

#[derive(Debug)]
enum StreamEvent {
    Chunk(String),
    Failed(String),
    Finished,
}

/// Producer end of one stream.
///
/// Dropping the sink tells the pump the producer is done.
#[derive(Debug)]
pub struct StreamSink {
    id: StreamId,
    tx: Sender<(StreamId, StreamEvent)>,
}

impl StreamSink {
    /// Queue `text` for appending. Returns `false` once nobody is pumping
    /// anymore, which producers take as a signal to stop early.
    pub fn append(&self, text: impl Into<String>) -> bool {
        self.tx.send((self.id, StreamEvent::Chunk(text.into()))).is_ok()
    }

    pub fn fail(&self, err: &dyn fmt::Display) -> bool {
        self.tx
            .send((self.id, StreamEvent::Failed(failure_text(err))))
            .is_ok()
    }
}

impl Drop for StreamSink {
    fn drop(&mut self) {
        let _ = self.tx.send((self.id, StreamEvent::Finished));
    }
}

/// UI-thread end of every stream a translator has opened.
///
/// Buffers stay registered until their producer finishes, whether or not
/// anyone still observes them.
#[derive(Debug)]
pub struct StreamPump {
    tx: Sender<(StreamId, StreamEvent)>,
    rx: Receiver<(StreamId, StreamEvent)>,
    next_id: StreamId,
    live: HashMap<StreamId, SharedBuffer>,
}

impl Default for StreamPump {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamPump {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            next_id: 0,
            live: HashMap::new(),
        }
    }

    /// A fresh buffer and the sink that feeds it.
    pub fn open(&mut self) -> (SharedBuffer, StreamSink) {
        let id = self.next_id;
        self.next_id += 1;
        let buffer = StreamBuffer::shared();
        self.live.insert(id, buffer.clone());
        let sink = StreamSink {
            id,
            tx: self.tx.clone(),
        };
        (buffer, sink)
    }

    /// Apply everything producers have sent so far.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok((id, event)) = self.rx.try_recv() {
            match event {
                StreamEvent::Chunk(text) => {
                    if let Some(buffer) = self.live.get(&id) {
                        buffer.borrow_mut().append(&text);
                        applied += 1;
                    }
                }
                StreamEvent::Failed(message) => {
                    if let Some(buffer) = self.live.get(&id) {
                        buffer.borrow_mut().set_error_message(message);
                        applied += 1;
                    }
                }
                StreamEvent::Finished => {
                    if let Some(buffer) = self.live.remove(&id) {
                        let buffer = buffer.borrow();
                        tracing::debug!(
                            stream = id,
                            bytes = buffer.content().len(),
                            failed = buffer.has_error(),
                            observed = buffer.has_live_observer(),
                            "stream finished"
                        );
                    }
                }
            }
        }
        applied
    }

    pub fn live_streams(&self) -> usize {
        self.live.len()
    }
}

/// `Translator` that runs a `Requester` per request on its own thread.
pub struct StreamingTranslator<R> {
    requester: Arc<R>,
    template: CompletionRequest,
    pump: StreamPump,
}

impl<R: Requester> StreamingTranslator<R> {
    pub fn new(requester: R, settings: &Settings) -> Self {
        Self {
            requester: Arc::new(requester),
            template: CompletionRequest::from_settings(settings),
            pump: StreamPump::new(),
        }
    }

    pub fn template(&self) -> &CompletionRequest {
        &self.template
    }

    pub fn pump(&self) -> &StreamPump {
        &self.pump
    }
}

impl<R: Requester> Translator for StreamingTranslator<R> {
    fn request(&mut self, text: &str) -> SharedBuffer {
        let (buffer, sink) = self.pump.open();
        let request = CompletionRequest {
            text: text.to_string(),
            ..self.template.clone()
        };
        let requester = Arc::clone(&self.requester);
        let spawned = thread::Builder::new()
            .name("gloss-request".into())
            .spawn(move || {
                if let Err(err) = requester.run(&request, &sink) {
                    tracing::warn!(%err, "translation request failed");
                    sink.fail(&err);
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(%err, "failed to start translation worker");
            buffer
                .borrow_mut()
                .set_error_message(failure_text(&RequestError::Io(err)));
        }
        buffer
    }

    fn poll(&mut self) -> usize {
        self.pump.drain()
    }

    fn in_flight(&self) -> usize {
        self.pump.live_streams()
    }
}

/// Build the translator selected by `settings.provider`.
pub fn from_settings(settings: &Settings) -> Box<dyn Translator> {
    tracing::info!(
        provider = ?settings.provider,
        target_language = %settings.target_language,
        model = %settings.model,
        "translator ready"
    );
    match settings.provider {
        Provider::Mock => Box::new(StreamingTranslator::new(MockRequester::new(), settings)),
        Provider::Command => Box::new(StreamingTranslator::new(
            CommandRequester::new(settings.command.clone()),
            settings,
        )),
    }
}

/// Poll `translator` until nothing is in flight or `timeout` passes.
///
/// Handy for tests and benchmarks that want a stream to settle.
pub fn settle(translator: &mut dyn Translator, timeout: std::time::Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        translator.poll();
        if translator.in_flight() == 0 {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        thread::sleep(std::time::Duration::from_millis(2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Scripted {
        chunks: Vec<&'static str>,
        error: Option<&'static str>,
    }

    impl Requester for Scripted {
        fn run(&self, _request: &CompletionRequest, sink: &StreamSink) -> Result<(), RequestError> {
            for chunk in &self.chunks {
                sink.append(*chunk);
            }
            match self.error {
                Some(message) => Err(RequestError::Io(io::Error::other(message))),
                None => Ok(()),
            }
        }
    }

    struct Echo;

    impl Requester for Echo {
        fn run(&self, request: &CompletionRequest, sink: &StreamSink) -> Result<(), RequestError> {
            sink.append(format!("{}|{}", request.system_prompt, request.text));
            Ok(())
        }
    }

    #[test]
    fn system_prompt_names_target_language() {
        assert_eq!(
            system_prompt("Korean"),
            "You are a professional translator. When given text, translate it into Korean."
        );
    }

    #[test]
    fn pump_applies_chunks_in_order_then_forgets_stream() {
        let mut pump = StreamPump::new();
        let (buffer, sink) = pump.open();
        sink.append("Hello");
        sink.append(" World");
        drop(sink);
        assert_eq!(pump.live_streams(), 1);
        assert_eq!(pump.drain(), 2);
        assert_eq!(buffer.borrow().content(), "Hello World");
        assert_eq!(pump.live_streams(), 0);
    }

    #[test]
    fn failure_keeps_partial_content() {
        let mut pump = StreamPump::new();
        let (buffer, sink) = pump.open();
        sink.append("partial");
        sink.fail(&"boom");
        drop(sink);
        pump.drain();
        let buffer = buffer.borrow();
        assert_eq!(buffer.content(), "partial");
        assert_eq!(buffer.error_message(), Some("\n[translation failed: boom]"));
    }

    #[test]
    fn sink_reports_closed_pump() {
        let mut pump = StreamPump::new();
        let (_buffer, sink) = pump.open();
        drop(pump);
        assert!(!sink.append("late"));
    }

    #[test]
    fn translator_streams_through_requester() {
        let settings = Settings::default();
        let mut translator = StreamingTranslator::new(
            Scripted {
                chunks: vec!["un", "deux"],
                error: Some("network down"),
            },
            &settings,
        );
        let buffer = translator.request("one two");
        assert!(settle(&mut translator, Duration::from_secs(5)));
        let buffer = buffer.borrow();
        assert_eq!(buffer.content(), "undeux");
        assert!(
            buffer
                .error_message()
                .is_some_and(|message| message.contains("network down"))
        );
    }

    #[test]
    fn request_carries_prompt_and_text() {
        let settings = Settings {
            target_language: "French".into(),
            ..Settings::default()
        };
        let mut translator = StreamingTranslator::new(Echo, &settings);
        assert_eq!(translator.template().model, settings.model);
        let buffer = translator.request("bonjour?");
        assert!(settle(&mut translator, Duration::from_secs(5)));
        assert_eq!(
            buffer.borrow().content(),
            format!("{}|bonjour?", system_prompt("French"))
        );
    }

    #[test]
    fn superseded_buffers_keep_filling_unobserved() {
        let settings = Settings::default();
        let mut translator = StreamingTranslator::new(Echo, &settings);
        let first = translator.request("a");
        let second = translator.request("b");
        assert!(settle(&mut translator, Duration::from_secs(5)));
        assert!(first.borrow().content().ends_with("|a"));
        assert!(second.borrow().content().ends_with("|b"));
        assert_eq!(translator.in_flight(), 0);
    }
}
