use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use parking_lot::Mutex;

/// A chunk that was sorted and spilled to disk.
#[derive(Debug)]
pub(crate) struct SortedChunkFile {
    index: usize,
    path: PathBuf,
    lines: usize,
}

impl SortedChunkFile {
    pub(crate) fn new(index: usize, path: PathBuf, lines: usize) -> SortedChunkFile {
        SortedChunkFile {
            index,
            path,
            lines,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }

    pub(crate) fn lines(&self) -> usize {
        self.lines
    }
}

impl Eq for SortedChunkFile {}

impl PartialEq<Self> for SortedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.index.eq(&other.index)
    }
}

impl PartialOrd<Self> for SortedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// Results of the sorting pool, shared between the workers and the orchestrator.
///
/// Only the first failure is kept; once set, workers skip their chunks and the planner stops.
#[derive(Default)]
pub(crate) struct SortedChunks {
    files: Mutex<Vec<SortedChunkFile>>,
    error: Mutex<Option<anyhow::Error>>,
    failed: AtomicBool,
}

impl SortedChunks {
    pub(crate) fn push(&self, file: SortedChunkFile) {
        self.files.lock().push(file);
    }

    pub(crate) fn fail(&self, error: anyhow::Error) {
        let mut guard = self.error.lock();
        if guard.is_none() {
            *guard = Some(error);
        }
        self.failed.store(true, AtomicOrdering::SeqCst);
    }

    pub(crate) fn failed(&self) -> bool {
        self.failed.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn take_error(&self) -> Option<anyhow::Error> {
        self.error.lock().take()
    }

    /// Sorted chunk files ordered by chunk index
    pub(crate) fn take_files(&self) -> Vec<SortedChunkFile> {
        let mut files = std::mem::take(&mut *self.files.lock());
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::anyhow;

    use crate::sorted_chunk_file::{SortedChunkFile, SortedChunks};

    #[test]
    fn test_files_ordered_by_index() {
        let sorted_chunks = SortedChunks::default();
        for index in [3, 0, 2, 1] {
            sorted_chunks.push(SortedChunkFile::new(index, PathBuf::from(format!("chunk-{index}")), 10 - index));
        }
        let indices: Vec<usize> = sorted_chunks.take_files().iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(sorted_chunks.take_files().is_empty());
    }

    #[test]
    fn test_first_error_wins() {
        let sorted_chunks = SortedChunks::default();
        assert!(!sorted_chunks.failed());
        sorted_chunks.fail(anyhow!("first"));
        sorted_chunks.fail(anyhow!("second"));
        assert!(sorted_chunks.failed());
        assert_eq!(sorted_chunks.take_error().unwrap().to_string(), "first");
        assert!(sorted_chunks.take_error().is_none());
    }
}
