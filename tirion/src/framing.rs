use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use crate::{ClientError, Result};

const SEPARATOR: u8 = protocol::RECORD_SEPARATOR as u8;

/// An unterminated line may grow to this many read chunks.
const MAX_LINE_CHUNKS: usize = 16;

/// Splits a byte stream into newline-terminated records.
///
/// Lines split out of one read are queued and handed out oldest first.
/// Bytes after the last newline of a read are kept until a later read
/// completes the line, up to `MAX_LINE_CHUNKS` chunks. Empty lines are
/// dropped.
pub struct FramedReceiver<R> {
    reader: R,
    chunk: Vec<u8>,
    max_line: usize,
    partial: Vec<u8>,
    queue: VecDeque<String>,
}

impl<R: Read> FramedReceiver<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        FramedReceiver {
            reader,
            chunk: vec![0u8; chunk_size],
            max_line: chunk_size.saturating_mul(MAX_LINE_CHUNKS),
            partial: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Blocks until a complete line is available. Fails with
    /// [`ClientError::EndOfStream`] once the peer closes the stream; an
    /// unterminated trailing line is discarded. Fails with
    /// [`ClientError::LineTooLong`] once the pending line outgrows the limit;
    /// its bytes are dropped.
    pub fn receive(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.queue.pop_front() {
                return Ok(line);
            }

            if self.partial.len() > self.max_line {
                self.partial = Vec::new();
                return Err(ClientError::LineTooLong(self.max_line));
            }

            let read = match self.reader.read(&mut self.chunk) {
                Ok(0) => return Err(ClientError::EndOfStream),
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            self.split(read);
        }
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        self.queue.len()
    }

    fn split(&mut self, read: usize) {
        let mut data = &self.chunk[..read];

        while let Some(pos) = data.iter().position(|&b| b == SEPARATOR) {
            self.partial.extend_from_slice(&data[..pos]);
            if !self.partial.is_empty() {
                self.queue
                    .push_back(String::from_utf8_lossy(&self.partial).into_owned());
                self.partial.clear();
            }
            data = &data[pos + 1..];
        }

        self.partial.extend_from_slice(data);
    }
}

/// Writes `record` followed by the record separator in one call.
pub fn write_record<W: Write>(writer: &mut W, record: &str) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(record.len() + 1);
    buf.extend_from_slice(record.as_bytes());
    buf.push(SEPARATOR);
    writer.write_all(&buf)?;
    writer.flush()
}
