use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use super::{CompletionRequest, RequestError, Requester, StreamSink};

pub const ENV_MODEL: &str = "GLOSS_MODEL";
pub const ENV_API_KEY: &str = "GLOSS_API_KEY";
pub const ENV_TARGET_LANGUAGE: &str = "GLOSS_TARGET_LANGUAGE";
pub const ENV_SYSTEM_PROMPT: &str = "GLOSS_SYSTEM_PROMPT";

const READ_CHUNK: usize = 4096;

/// Runs an external command per request.
///
/// The text to translate goes to the command's stdin; whatever it prints on
/// stdout is streamed into the buffer as it arrives. Model, key, language and
/// system prompt are passed as `GLOSS_*` environment variables so any CLI
/// client can be wrapped with a short shell script.
#[derive(Debug, Clone)]
pub struct CommandRequester {
    command: Option<String>,
}

impl CommandRequester {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    fn argv(&self) -> Result<Vec<String>, RequestError> {
        let line = self
            .command
            .as_deref()
            .filter(|line| !line.trim().is_empty())
            .ok_or(RequestError::MissingCommand)?;
        let argv = shell_words::split(line).map_err(|source| RequestError::InvalidCommand {
            command: line.to_string(),
            source,
        })?;
        if argv.is_empty() {
            return Err(RequestError::MissingCommand);
        }
        Ok(argv)
    }
}

impl Requester for CommandRequester {
    fn run(&self, request: &CompletionRequest, sink: &StreamSink) -> Result<(), RequestError> {
        let argv = self.argv()?;
        let (program, args) = argv.split_first().ok_or(RequestError::MissingCommand)?;

        let mut child = Command::new(program)
            .args(args)
            .env(ENV_MODEL, &request.model)
            .env(ENV_API_KEY, &request.api_key)
            .env(ENV_TARGET_LANGUAGE, &request.target_language)
            .env(ENV_SYSTEM_PROMPT, &request.system_prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RequestError::Spawn {
                program: program.clone(),
                source,
            })?;
        tracing::debug!(program = %program, pid = child.id(), "translation command started");

        // stdin and stderr get their own threads so a chatty child can never
        // block on a full pipe while we wait on stdout.
        let writer = child.stdin.take().map(|mut stdin| {
            let text = request.text.clone();
            thread::spawn(move || stdin.write_all(text.as_bytes()))
        });
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = String::new();
                let _ = stderr.read_to_string(&mut captured);
                captured
            })
        });

        if let Some(mut stdout) = child.stdout.take() {
            forward_utf8(&mut stdout, sink)?;
        }
        let status = child.wait()?;

        if let Some(writer) = writer
            && let Ok(Err(err)) = writer.join()
        {
            tracing::debug!(%err, "translation command did not read all of stdin");
        }
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        tracing::debug!(program = %program, %status, "translation command exited");
        if !status.success() {
            return Err(RequestError::Exit {
                program: program.clone(),
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Copy `reader` into `sink` as text, never splitting a UTF-8 sequence
/// across two chunks.
fn forward_utf8(reader: &mut impl Read, sink: &StreamSink) -> io::Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        pending.extend_from_slice(&chunk[..read]);
        let ready = match std::str::from_utf8(&pending) {
            Ok(_) => pending.len(),
            // Incomplete trailing sequence: hold it back for the next read.
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => pending.len(),
        };
        if ready == 0 {
            continue;
        }
        let text = String::from_utf8_lossy(&pending[..ready]).into_owned();
        pending.drain(..ready);
        if !sink.append(text) {
            return Ok(());
        }
    }
    if !pending.is_empty() {
        sink.append(String::from_utf8_lossy(&pending).into_owned());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::translate::{StreamPump, StreamingTranslator, Translator, settle};
    use std::time::Duration;

    fn translate_with(command: Option<&str>, text: &str) -> (String, Option<String>) {
        let settings = Settings {
            target_language: "Spanish".into(),
            ..Settings::default()
        };
        let mut translator =
            StreamingTranslator::new(CommandRequester::new(command.map(str::to_string)), &settings);
        let buffer = translator.request(text);
        assert!(settle(&mut translator, Duration::from_secs(10)));
        let buffer = buffer.borrow();
        (
            buffer.content().to_string(),
            buffer.error_message().map(str::to_string),
        )
    }

    #[test]
    fn missing_command_fails_through_buffer() {
        let (content, error) = translate_with(None, "hello");
        assert!(content.is_empty());
        assert!(error.is_some_and(|e| e.contains("no command line configured")));
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        let (_, error) = translate_with(Some("echo 'oops"), "hello");
        assert!(error.is_some_and(|e| e.contains("invalid command line")));
    }

    #[test]
    fn nonexistent_program_is_reported() {
        let (_, error) = translate_with(Some("term-gloss-no-such-program-xyz"), "hello");
        assert!(error.is_some_and(|e| e.contains("failed to start")));
    }

    #[cfg(unix)]
    #[test]
    fn streams_stdout_of_command() {
        let (content, error) = translate_with(Some("cat"), "hola mundo");
        assert_eq!(content, "hola mundo");
        assert!(error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn exposes_settings_as_environment() {
        let (content, _) = translate_with(
            Some("sh -c 'printf %s \"$GLOSS_TARGET_LANGUAGE\"'"),
            "ignored",
        );
        assert_eq!(content, "Spanish");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_keeps_partial_output_and_stderr() {
        let (content, error) = translate_with(
            Some("sh -c 'printf partial; echo quota exceeded >&2; exit 3'"),
            "hello",
        );
        assert_eq!(content, "partial");
        let error = error.expect("exit is reported");
        assert!(error.contains("quota exceeded"), "{error}");
    }

    #[test]
    fn utf8_sequences_are_not_split() {
        struct Trickle<'a> {
            bytes: &'a [u8],
        }

        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let Some((first, rest)) = self.bytes.split_first() else {
                    return Ok(0);
                };
                buf[0] = *first;
                self.bytes = rest;
                Ok(1)
            }
        }

        let mut pump = StreamPump::new();
        let (buffer, sink) = pump.open();
        let mut reader = Trickle {
            bytes: "안녕".as_bytes(),
        };
        forward_utf8(&mut reader, &sink).expect("reads");
        drop(sink);
        assert_eq!(pump.drain(), 2);
        assert_eq!(buffer.borrow().content(), "안녕");
    }
}
