use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use command_executor::command::Command;
use parking_lot::Mutex;

use crate::chunk_iterator::Chunk;
use crate::error::SortError;
use crate::sorted_chunk_file::{SortedChunkFile, SortedChunks};

/// Location of the chunk file with the given index inside a run directory
pub(crate) fn chunk_file_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("chunk-{index:06}.sorted"))
}

/// Sort the chunk and write it, one record per line, to a new file in `dir`.
pub(crate) fn sort_and_spill(chunk: Chunk, dir: &Path) -> Result<SortedChunkFile, SortError> {
    let index = chunk.index();
    let mut records = chunk.into_records();
    records.sort();

    let path = chunk_file_path(dir, index);
    let write_error = |e| SortError::ChunkWrite { path: path.clone(), source: e };
    let chunk_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(write_error)?;

    let mut buf_writer = BufWriter::new(chunk_file);
    for line_record in &records {
        buf_writer.write_all(line_record.line().as_bytes()).map_err(write_error)?;
        buf_writer.write_all(b"\n").map_err(write_error)?;
    }
    buf_writer.flush().map_err(write_error)?;

    log::debug!("Spilled chunk {} with {} lines to {}", index, records.len(), path.display());
    Ok(SortedChunkFile::new(index, path, records.len()))
}

/// Sorts one chunk on the sorting pool.
pub(crate) struct SortCommand {
    chunk: Mutex<Option<Chunk>>,
    dir: PathBuf,
    sorted_chunks: Arc<SortedChunks>,
}

impl SortCommand {
    pub(crate) fn new(chunk: Chunk, dir: PathBuf, sorted_chunks: Arc<SortedChunks>) -> SortCommand {
        SortCommand {
            chunk: Mutex::new(Some(chunk)),
            dir,
            sorted_chunks,
        }
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let chunk = self.chunk.lock().take();
        if let Some(chunk) = chunk {
            // another chunk already failed, the run is being torn down
            if self.sorted_chunks.failed() {
                return Ok(());
            }
            let index = chunk.index();
            match sort_and_spill(chunk, &self.dir) {
                Ok(sorted_chunk_file) => self.sorted_chunks.push(sorted_chunk_file),
                Err(e) => {
                    log::error!(
                        "Failed to sort chunk {}, thread: {}, error: {}",
                        index,
                        thread::current().name().unwrap_or("unnamed"),
                        e
                    );
                    // reported by the orchestrator after the pool is joined
                    self.sorted_chunks.fail(e.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use command_executor::command::Command;
    use tempfile::TempDir;

    use crate::chunk_iterator::Chunk;
    use crate::error::SortError;
    use crate::line_record::LineRecord;
    use crate::sort_command::{chunk_file_path, sort_and_spill, SortCommand};
    use crate::sorted_chunk_file::SortedChunks;

    fn chunk(index: usize, lines: &[&str]) -> Chunk {
        let records = lines
            .iter()
            .map(|line| LineRecord::new(line.to_string()).unwrap())
            .collect();
        Chunk::new(index, records)
    }

    #[test]
    fn test_sort_and_spill() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let sorted = sort_and_spill(chunk(4, &["415. Apple", "2. Banana", "1. Apple"]), dir.path())?;
        assert_eq!(sorted.index(), 4);
        assert_eq!(sorted.lines(), 3);
        assert_eq!(sorted.path(), &chunk_file_path(dir.path(), 4));
        assert_eq!(fs::read_to_string(sorted.path())?, "1. Apple\n415. Apple\n2. Banana\n");
        Ok(())
    }

    #[test]
    fn test_spill_into_missing_dir() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("missing");
        let result = sort_and_spill(chunk(0, &["1. a"]), &missing);
        assert!(matches!(result, Err(SortError::ChunkWrite { .. })));
        Ok(())
    }

    #[test]
    fn test_command_records_result() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let sorted_chunks = Arc::new(SortedChunks::default());
        let command = SortCommand::new(chunk(0, &["2. b", "1. a"]), dir.path().to_path_buf(), sorted_chunks.clone());
        command.execute()?;
        // the chunk is consumed by the first execution
        command.execute()?;
        let files = sorted_chunks.take_files();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read_to_string(files[0].path())?, "1. a\n2. b\n");
        Ok(())
    }

    #[test]
    fn test_command_records_failure() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let sorted_chunks = Arc::new(SortedChunks::default());
        let command = SortCommand::new(chunk(0, &["1. a"]), dir.path().join("missing"), sorted_chunks.clone());
        command.execute()?;
        assert!(sorted_chunks.failed());
        let error = sorted_chunks.take_error().unwrap();
        assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::ChunkWrite { .. })));
        assert!(sorted_chunks.take_files().is_empty());
        Ok(())
    }
}
