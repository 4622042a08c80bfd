use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::SortError;
use crate::line_record::LineRecord;

/// A batch of records read from the input, not sorted yet.
#[derive(Debug)]
pub(crate) struct Chunk {
    index: usize,
    records: Vec<LineRecord>,
}

impl Chunk {
    pub(crate) fn new(index: usize, records: Vec<LineRecord>) -> Chunk {
        Chunk {
            index,
            records,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn into_records(self) -> Vec<LineRecord> {
        self.records
    }
}

/// Reads the input sequentially and yields chunks of at most `chunk_size` records.
///
/// Chunk indices start at `first_index` and follow read order. Each chunk is an owned batch, the
/// iterator starts a fresh one after handing it out.
pub(crate) struct ChunkIterator {
    path: PathBuf,
    reader: BufReader<File>,
    config: Config,
    chunk_size: usize,
    next_index: usize,
    line_number: usize,
    done: bool,
}

impl ChunkIterator {
    pub(crate) fn new(path: &PathBuf, config: &Config, first_index: usize) -> Result<ChunkIterator, SortError> {
        let file = File::open(path)
            .map_err(|e| SortError::open_input(path, e))?;

        Ok(
            ChunkIterator {
                path: path.clone(),
                reader: BufReader::new(file),
                config: config.clone(),
                chunk_size: config.chunk_size().max(1),
                next_index: first_index,
                line_number: 0,
                done: false,
            }
        )
    }

    /// The index the next chunk will get
    pub(crate) fn next_index(&self) -> usize {
        self.next_index
    }

    fn read_records(&mut self) -> Result<Vec<LineRecord>, SortError> {
        let mut records = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        let mut line = String::new();
        while records.len() < self.chunk_size {
            let bytes = self.reader.read_line(&mut line)
                .map_err(|e| SortError::InputRead { path: self.path.clone(), source: e })?;
            if bytes == 0 {
                self.done = true;
                break;
            }
            self.line_number += 1;
            strip_endl(&mut line);
            if self.config.ignored(&line) {
                line.clear();
                continue;
            }
            let record = LineRecord::new(std::mem::take(&mut line))
                .map_err(|line| SortError::MalformedRecord {
                    path: self.path.clone(),
                    line_number: self.line_number,
                    line,
                })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Drop a trailing `\n` or `\r\n`
pub(crate) fn strip_endl(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

impl Iterator for ChunkIterator {
    type Item = Result<Chunk, SortError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_records() {
            Ok(records) if records.is_empty() => None,
            Ok(records) => {
                let chunk = Chunk::new(self.next_index, records);
                self.next_index += 1;
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
