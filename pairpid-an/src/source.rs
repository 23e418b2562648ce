//! Event record sources
//!
//! A source is a cursor over events: `has_next` peeks, `advance` moves to
//! the next event, and `track` reads one track of the current event. A
//! track that cannot be read is a per-record error; the engine counts it
//! and moves on. An event that cannot be read at all ends the run.

use pairpid_common::{Error, Result, Track};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

pub trait RecordSource: Send {
    /// Whether another event is available
    fn has_next(&mut self) -> bool;

    /// Move to the next event
    fn advance(&mut self) -> Result<()>;

    /// Tracks in the current event
    fn track_count(&self) -> usize;

    /// One track of the current event
    fn track(&self, index: usize) -> Result<Track>;
}

/// Events held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    events: Vec<Vec<Track>>,
    next: usize,
    current: Option<usize>,
}

impl MemorySource {
    pub fn new(events: Vec<Vec<Track>>) -> Self {
        Self {
            events,
            next: 0,
            current: None,
        }
    }
}

impl RecordSource for MemorySource {
    fn has_next(&mut self) -> bool {
        self.next < self.events.len()
    }

    fn advance(&mut self) -> Result<()> {
        if self.next >= self.events.len() {
            return Err(Error::InvalidInput("no more events".to_string()));
        }
        self.current = Some(self.next);
        self.next += 1;
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.current.map(|i| self.events[i].len()).unwrap_or(0)
    }

    fn track(&self, index: usize) -> Result<Track> {
        self.current
            .and_then(|i| self.events[i].get(index))
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no track {index} in current event")))
    }
}

#[derive(Deserialize)]
struct EventLine {
    #[serde(default)]
    tracks: Vec<serde_json::Value>,
}

/// One JSON object per line: `{"tracks": [ {...}, ... ]}`
///
/// Blank lines are skipped.
pub struct JsonLinesSource<R: BufRead> {
    lines: Lines<R>,
    pending: Option<(usize, std::io::Result<String>)>,
    line_no: usize,
    current_line: usize,
    current: Vec<std::result::Result<Track, String>>,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::InvalidInput(format!("Cannot open input {}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: None,
            line_no: 0,
            current_line: 0,
            current: Vec::new(),
        }
    }

    fn peek(&mut self) {
        while self.pending.is_none() {
            let Some(line) = self.lines.next() else {
                return;
            };
            self.line_no += 1;
            match line {
                Ok(text) if text.trim().is_empty() => continue,
                other => self.pending = Some((self.line_no, other)),
            }
        }
    }
}

impl<R: BufRead + Send> RecordSource for JsonLinesSource<R> {
    fn has_next(&mut self) -> bool {
        self.peek();
        self.pending.is_some()
    }

    fn advance(&mut self) -> Result<()> {
        self.peek();
        let (line_no, line) = self
            .pending
            .take()
            .ok_or_else(|| Error::InvalidInput("no more events".to_string()))?;
        let event: EventLine = serde_json::from_str(&line?)
            .map_err(|e| Error::InvalidInput(format!("line {line_no}: {e}")))?;
        self.current_line = line_no;
        self.current = event
            .tracks
            .into_iter()
            .map(|value| serde_json::from_value::<Track>(value).map_err(|e| e.to_string()))
            .collect();
        Ok(())
    }

    fn track_count(&self) -> usize {
        self.current.len()
    }

    fn track(&self, index: usize) -> Result<Track> {
        match self.current.get(index) {
            Some(Ok(track)) => Ok(track.clone()),
            Some(Err(e)) => Err(Error::InvalidInput(format!(
                "line {} track {}: {}",
                self.current_line, index, e
            ))),
            None => Err(Error::InvalidInput(format!(
                "line {}: no track {}",
                self.current_line, index
            ))),
        }
    }
}
