use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::chunk_iterator::strip_endl;
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::sorted_chunk_file::SortedChunkFile;

/// Merge cursor over one sorted chunk file.
///
/// `head` holds the next record to emit. Cursors order by head and then by chunk index, so that
/// among equal heads the earliest chunk wins.
#[derive(Debug)]
pub(crate) struct UnmergedChunkFile {
    index: usize,
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<LineRecord>,
    line_number: usize,
}

impl UnmergedChunkFile {
    pub(crate) fn new(sorted_chunk_file: &SortedChunkFile) -> Result<UnmergedChunkFile, SortError> {
        let index = sorted_chunk_file.index();
        let path = sorted_chunk_file.path().clone();
        let file = File::open(&path)
            .map_err(|e| SortError::ChunkRead { index, path: path.clone(), source: e })?;
        let mut unmerged_chunk_file = UnmergedChunkFile {
            index,
            path,
            reader: BufReader::new(file),
            head: None,
            line_number: 0,
        };
        unmerged_chunk_file.head = unmerged_chunk_file.read_record()?;
        Ok(unmerged_chunk_file)
    }

    fn read_record(&mut self) -> Result<Option<LineRecord>, SortError> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)
            .map_err(|e| SortError::ChunkRead { index: self.index, path: self.path.clone(), source: e })?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        strip_endl(&mut line);
        let record = LineRecord::new(line)
            .map_err(|line| SortError::MalformedRecord {
                path: self.path.clone(),
                line_number: self.line_number,
                line,
            })?;
        Ok(Some(record))
    }

    /// Emit the head and read the next record in its place.
    pub(crate) fn line_record(&mut self) -> Result<Option<LineRecord>, SortError> {
        let next = if self.head.is_some() {
            self.read_record()?
        } else {
            None
        };
        Ok(std::mem::replace(&mut self.head, next))
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Close the reader and optionally delete the file
    pub(crate) fn close(self, remove: bool) -> Result<(), SortError> {
        let UnmergedChunkFile { index, path, reader, .. } = self;
        drop(reader);
        if remove {
            std::fs::remove_file(&path)
                .map_err(|e| SortError::ChunkRead { index, path, source: e })?;
        }
        Ok(())
    }
}

impl Eq for UnmergedChunkFile {}

impl PartialEq<Self> for UnmergedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for UnmergedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnmergedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = match (&self.head, &other.head) {
            (None, None) => Ordering::Equal,
            // exhausted cursors sort last
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        };
        ordering.then(self.index.cmp(&other.index))
    }
}
