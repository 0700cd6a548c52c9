//! Line-oriented JSON I/O for work requests and completions.
//!
//! Requests are read as NDJSON; completions are written as NDJSON or as a
//! single JSON array.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, Write};

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes records as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    /// Create a new NDJSON writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single record as an NDJSON line
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON array writer
///
/// Writes records as a JSON array.
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create a new JSON array writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self, SerializationError> {
        write!(writer, "[")?;
        Ok(Self {
            writer,
            first: true,
        })
    }

    /// Write a single record to the JSON array
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SerializationError> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;

        let json = serde_json::to_string(record)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Finish writing the array and close the bracket
    pub fn finish(mut self) -> Result<(), SerializationError> {
        write!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// NDJSON reader
///
/// Yields one parsed record per non-blank line. A line that fails to parse
/// yields an error carrying the line number and the reading continues. An IO
/// error is yielded once and ends the stream.
pub struct NdjsonReader<R: BufRead, T> {
    lines: std::io::Lines<R>,
    line_num: usize,
    done: bool,
    _record: std::marker::PhantomData<T>,
}

impl<R: BufRead, T: DeserializeOwned> NdjsonReader<R, T> {
    /// Create a new NDJSON reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
            done: false,
            _record: std::marker::PhantomData,
        }
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for NdjsonReader<R, T> {
    type Item = Result<T, String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = self.lines.next()?;
            self.line_num += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(format!("Line {}: IO error: {}", self.line_num, e)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(&line)
                    .map_err(|e| format!("Line {}: Invalid JSON: {}", self.line_num, e)),
            );
        }
    }
}
