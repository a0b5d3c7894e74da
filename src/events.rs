use crate::types::ParsedGame;
use std::io::{self, BufRead, BufReader, Read};

pub type EventInput = Box<dyn Read + Send>;

fn is_id_record(line: &str) -> bool {
    line.split(',').next().is_some_and(|kind| kind.trim() == "id")
}

/// Streams a Retrosheet event file one game at a time.
///
/// A game is the run of lines from one `id` record up to the next. Lines before
/// the first `id` come back as their own group so ingestion can report them.
pub struct EventFileReader {
    input: BufReader<EventInput>,
    buf: Vec<u8>,
    pending_id: Option<String>,
    finished: bool,
}

impl EventFileReader {
    pub fn new(input: EventInput) -> Self {
        Self {
            input: BufReader::new(input),
            buf: Vec::new(),
            pending_id: None,
            finished: false,
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.input.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Next group of lines, or `None` at end of input.
    ///
    /// A read error ends the stream: it is returned once and later calls
    /// yield `None`.
    pub fn next_game(&mut self) -> io::Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let mut lines: Vec<String> = self.pending_id.take().into_iter().collect();
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            };

            if is_id_record(&line) && !lines.is_empty() {
                if lines.iter().all(|l| l.trim().is_empty()) {
                    lines.clear();
                } else {
                    self.pending_id = Some(line);
                    return Ok(Some(lines));
                }
            }
            lines.push(line);
        }

        if lines.iter().all(|l| l.trim().is_empty()) {
            Ok(None)
        } else {
            Ok(Some(lines))
        }
    }
}

/// Result of ingesting one line group.
#[derive(Debug)]
pub enum GameOutcome {
    Parsed(ParsedGame),
    Failed(String),
}

/// Per-file cursor parked between table function calls.
pub struct EventReaderState {
    pub events: EventFileReader,
    pub path_idx: usize,
    pub next_game_index: usize,
    pub current_game: Option<GameOutcome>,
    /// Next play of `current_game` to emit.
    pub next_play: usize,
}

impl EventReaderState {
    pub fn new(input: EventInput, path_idx: usize) -> Self {
        Self {
            events: EventFileReader::new(input),
            path_idx,
            next_game_index: 1,
            current_game: None,
            next_play: 0,
        }
    }
}

pub struct SharedState {
    pub next_path_idx: usize,
    pub available_readers: Vec<EventReaderState>,
}
