use crate::error::{ConversionError, Result};
use crate::models::RawRow;
use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads header-less TAFL CSV exports row by row.
///
/// Blank lines are not dropped: each one comes back as a row with no cells
/// so the schema check can report it at its physical line.
pub struct TaflReader {
    encoding: &'static Encoding,
}

impl TaflReader {
    pub fn new() -> Self {
        Self { encoding: UTF_8 }
    }

    /// Use a WHATWG encoding label such as `windows-1252` or `latin1`.
    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ConversionError::InvalidFormat(format!("Unknown text encoding: '{}'", label))
        })?;

        Ok(Self { encoding })
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Stream rows from a file.
    pub fn rows(&self, path: &Path) -> Result<TaflRows<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(self.rows_from_reader(BufReader::new(file)))
    }

    pub fn rows_from_reader<R: Read>(&self, reader: R) -> TaflRows<R> {
        // Flexible so short rows reach the schema mapper instead of failing here
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(LineCounter::new(reader));

        TaflRows {
            reader,
            record: ByteRecord::new(),
            encoding: self.encoding,
            records: 0,
            last_end: 0,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Read every row of a file into memory.
    pub fn read_rows(&self, path: &Path) -> Result<Vec<RawRow>> {
        self.rows(path)?.collect()
    }
}

impl Default for TaflReader {
    fn default() -> Self {
        Self::new()
    }
}

/// End of one physical line as seen by [`LineCounter`].
#[derive(Debug, Clone, Copy)]
struct LineEnd {
    start: u64,
    newline: u64,
    blank: bool,
}

/// Pass-through reader that notes where every `\n` falls.
///
/// The csv parser skips empty lines and only tracks record numbers, so
/// physical line numbers are rebuilt from these offsets.
struct LineCounter<R> {
    inner: R,
    offset: u64,
    line_start: u64,
    blank: bool,
    ends: VecDeque<LineEnd>,
    lines_done: u64,
}

impl<R: Read> LineCounter<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            line_start: 0,
            blank: true,
            ends: VecDeque::new(),
            lines_done: 0,
        }
    }

    /// Number the lines that end at or after `from`.
    ///
    /// Blank lines met before the next record line are pushed to `blanks`
    /// as `(line, byte offset)`. Returns the line the next record starts on.
    fn locate(&mut self, from: u64, blanks: &mut Vec<(u64, u64)>) -> u64 {
        while let Some(end) = self.ends.front().copied() {
            if end.newline < from {
                self.lines_done += 1;
                self.ends.pop_front();
            } else if end.blank {
                self.lines_done += 1;
                blanks.push((self.lines_done, end.start));
                self.ends.pop_front();
            } else if end.newline == from {
                // tail of a CRLF terminator the parser left unread
                self.lines_done += 1;
                self.ends.pop_front();
            } else {
                break;
            }
        }
        self.lines_done + 1
    }
}

impl<R: Read> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for &byte in &buf[..n] {
            match byte {
                b'\n' => {
                    self.ends.push_back(LineEnd {
                        start: self.line_start,
                        newline: self.offset,
                        blank: self.blank,
                    });
                    self.line_start = self.offset + 1;
                    self.blank = true;
                }
                b'\r' => {}
                _ => self.blank = false,
            }
            self.offset += 1;
        }
        Ok(n)
    }
}

/// Iterator over the rows of a TAFL export.
pub struct TaflRows<R> {
    reader: csv::Reader<LineCounter<R>>,
    record: ByteRecord,
    encoding: &'static Encoding,
    records: u64,
    last_end: u64,
    pending: VecDeque<RawRow>,
    done: bool,
}

impl<R: Read> TaflRows<R> {
    /// Queue blank lines found since the previous record; returns the line
    /// the next record starts on.
    fn queue_blank_lines(&mut self) -> u64 {
        let mut blanks = Vec::new();
        let line = self.reader.get_mut().locate(self.last_end, &mut blanks);
        for (blank_line, byte_offset) in blanks {
            debug!("Line {}: blank line", blank_line);
            self.pending.push_back(RawRow {
                line: blank_line,
                byte_offset,
                cells: Vec::new(),
            });
        }
        line
    }

    fn decode_current(&self, line: u64) -> RawRow {
        let byte_offset = self.record.position().map_or(0, |p| p.byte());
        let first = self.records == 0;

        let cells = self
            .record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = if first && i == 0 {
                    cell.strip_prefix(UTF8_BOM).unwrap_or(cell)
                } else {
                    cell
                };
                self.decode_cell(cell, line)
            })
            .collect();

        RawRow {
            line,
            byte_offset,
            cells,
        }
    }

    fn decode_cell(&self, cell: &[u8], line: u64) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(cell);
        if had_errors {
            debug!(
                "Line {}: replaced undecodable bytes as {}",
                line,
                self.encoding.name()
            );
        }
        match text {
            Cow::Borrowed(s) => s.to_string(),
            Cow::Owned(s) => s,
        }
    }
}

impl<R: Read> Iterator for TaflRows<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.pop_front() {
            return Some(Ok(row));
        }
        if self.done {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                let line = self.queue_blank_lines();
                let row = self.decode_current(line);
                self.records += 1;
                self.last_end = self.reader.position().byte();
                self.pending.push_back(row);
            }
            Ok(false) => {
                self.done = true;
                self.queue_blank_lines();
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }
        self.pending.pop_front().map(Ok)
    }
}
