#[cfg(test)]
#[path = "decoder_test.rs"]
mod tests;

use std::io::Cursor;

use eyre::Result;
use futures::{Stream, TryStreamExt, stream};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::client::describe_error;
use crate::models::StreamEvent;

pub const DATA_PREFIX: &str = "data: ";

/// Parse one complete line. Lines without the `data: ` prefix, empty
/// payloads, malformed JSON and unknown event types are protocol noise and
/// yield `None`.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let raw = line.strip_prefix(DATA_PREFIX)?.trim();
    if raw.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(raw) {
        Ok(event) => Some(event),
        Err(err) => {
            log::trace!("skipping stream line {}: {}", raw, err);
            None
        }
    }
}

struct DecodeState<R> {
    reader: R,
    line: Vec<u8>,
    /// Set once a terminal event, a read error or the end of the body was
    /// seen. Nothing is read afterwards.
    finished: bool,
}

/// Lazily decode a body stream into events.
///
/// Lines are split on raw bytes and decoded once complete, so a character
/// split between two chunks is never broken up. Invalid UTF-8 turns into
/// U+FFFD. A last line without a trailing line feed is still parsed. At most
/// one terminal event is yielded and reading stops right after it. A read
/// error is yielded once and ends the stream.
pub fn decode_stream<S>(body: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin,
{
    let body = body.map_ok(Cursor::new).map_err(|err| {
        log::debug!("reading stream body failed: {:?}", err);
        std::io::Error::other(describe_error(&err))
    });

    let state = DecodeState {
        reader: StreamReader::new(body),
        line: Vec::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        while !state.finished {
            state.line.clear();
            match state.reader.read_until(b'\n', &mut state.line).await {
                Ok(0) => state.finished = true,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&state.line);
                    let Some(event) = parse_line(line.trim_end_matches('\n')) else {
                        continue;
                    };
                    state.finished = event.is_terminal();
                    return Some((Ok(event), state));
                }
                Err(err) => {
                    state.finished = true;
                    return Some((Err(eyre::Report::new(err)), state));
                }
            }
        }
        None
    })
}
