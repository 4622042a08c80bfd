use std::cmp::{max, min, Reverse};
use std::collections::BinaryHeap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool::ThreadPool;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use regex::Regex;
use rlimit::{getrlimit, Resource, setrlimit};
use tempfile::{Builder, TempDir};

use crate::chunk_iterator::ChunkIterator;
use crate::config::Config;
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::sort_command::{chunk_file_path, SortCommand};
use crate::sorted_chunk_file::{SortedChunkFile, SortedChunks};
use crate::unmerged_chunk_file::UnmergedChunkFile;

/// Sort `input` into `output` with the default settings.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// text_record_sort::sort::sort(Path::new("input.txt"), Path::new("sorted.txt")).unwrap();
/// ```
pub fn sort(input: &Path, output: &Path) -> Result<(), anyhow::Error> {
    Sort::new(vec![input.to_path_buf()], output.to_path_buf()).sort()
}

/// Sort text files of `<integer>. <payload>` records
///
/// Records are ordered by payload, comparing bytes, and then by the numeric prefix.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use text_record_sort::sort::Sort;
///
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut text_record_sort = Sort::new(vec![input], output);
///     // number of worker threads, the default is to use all cores
///     text_record_sort.with_tasks(2);
///     // lines held in memory per chunk
///     text_record_sort.with_chunk_size(50_000);
///     // prefer a directory on the same file system as the output
///     text_record_sort.with_tmp_dir(tmp);
///     text_record_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    tmp: PathBuf,
    tasks: usize,
    chunk_size: usize,
    files: usize,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * intermediate files go to std::env::temp_dir()
    /// * all CPU cores are used
    /// * input is read in chunks of 100,000 lines
    /// * at most 1024 sorted chunks are merged at once
    /// * no line is ignored, a line that is not a record fails the sort
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate the merge
    /// fan-in.
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            tasks: 0,
            chunk_size: 100_000,
            files: 1024,
            ignore_empty: false,
            ignore_lines: None,
        }
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the number of tasks. The default is zero which will result in using all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Maximum number of lines sorted in memory as one chunk. Smaller chunks use less memory and
    /// produce more intermediate files.
    pub fn with_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Maximum number of sorted files merged at once. The default is 1024.
    pub fn with_intermediate_files(&mut self, files: usize) {
        self.files = files;
    }

    /// Skip empty lines instead of failing on them
    pub fn with_ignore_empty(&mut self) {
        self.ignore_empty = true;
    }

    /// Each line matching the regex is left out of the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// Sort the input files into the output
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config();
        let (current_soft, current_hard) = Self::raise_rlimits(&config)?;
        let result = Self::internal_sort(&self.input_files, &config, &self.output);
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    /// Merge input files that are already sorted into the output. The inputs are left in place.
    pub fn merge(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config();
        for path in &self.input_files {
            if !path.exists() {
                return Err(SortError::InputNotFound { path: path.clone() }.into());
            }
        }
        let (current_soft, current_hard) = Self::raise_rlimits(&config)?;
        let result = Self::internal_merge_files(&self.input_files, &config, &self.output);
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    /// Check that every input file is sorted
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let config = self.create_config();

        let mut result = true;
        for path in &self.input_files {
            result = Self::internal_check(path, &config)?;
            if !result {
                break;
            }
        }
        Ok(result)
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    /// Raise the soft NOFILE limit for the merge fan-in and return the limits to restore
    fn raise_rlimits(config: &Config) -> Result<(u64, u64), anyhow::Error> {
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let wanted = (config.files() + 256) as u64;
        if wanted > current_hard {
            log::warn!("Merge fan-in of {} files needs rlimit NOFILE {}, hard limit is {}", config.files(), wanted, current_hard);
        }
        let new_soft = max(min(wanted, current_hard), current_soft);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        Ok((current_soft, current_hard))
    }

    fn create_config(&self) -> Config {
        let mut tasks = self.tasks;
        if self.tasks == 0 {
            tasks = num_cpus::get();
        }

        Config::new(
            self.tmp.clone(),
            "text-record-sort-".to_string(),
            tasks,
            max(self.chunk_size, 1),
            max(self.files, 2),
            self.ignore_empty,
            self.ignore_lines.clone(),
        )
    }

    fn create_run_dir(config: &Config) -> Result<TempDir, SortError> {
        Builder::new()
            .prefix(config.tmp_prefix())
            .tempdir_in(config.tmp())
            .map_err(|e| SortError::ChunkWrite { path: config.tmp().clone(), source: e })
    }

    pub(crate) fn internal_check(path: &PathBuf, config: &Config) -> Result<bool, anyhow::Error> {
        let mut previous: Option<LineRecord> = None;
        for chunk in ChunkIterator::new(path, config, 0)? {
            for line_record in chunk?.into_records() {
                if let Some(previous_line_record) = &previous {
                    if previous_line_record > &line_record {
                        return Ok(false);
                    }
                }
                previous = Some(line_record);
            }
        }
        Ok(true)
    }

    /// K-way merge of sorted files into `writer`, returns the number of merged lines.
    ///
    /// The cursor with the smallest head is emitted first, equal heads are taken from the file
    /// with the lowest index. A file is closed, and removed when `remove_merged` is set, as soon
    /// as it is exhausted.
    pub(crate) fn internal_merge<W, E>(
        files: Vec<SortedChunkFile>,
        writer: &mut W,
        remove_merged: bool,
        write_error: E,
    ) -> Result<usize, SortError>
    where
        W: Write,
        E: Fn(std::io::Error) -> SortError,
    {
        log::info!("Merging {} sorted files, thread: {}", files.len(), thread::current().name().unwrap_or("unnamed"));
        let mut merged_len: usize = 0;
        let mut unmerged_files: BinaryHeap<Reverse<UnmergedChunkFile>> = BinaryHeap::with_capacity(files.len());
        for sorted_chunk_file in &files {
            let unmerged_chunk_file = UnmergedChunkFile::new(sorted_chunk_file)?;
            if unmerged_chunk_file.is_exhausted() {
                unmerged_chunk_file.close(remove_merged)?;
            } else {
                unmerged_files.push(Reverse(unmerged_chunk_file));
            }
        }

        while let Some(Reverse(mut current_min)) = unmerged_files.pop() {
            // keep draining the minimum while it stays ahead of the next cursor
            loop {
                if let Some(line_record) = current_min.line_record()? {
                    writer.write_all(line_record.line().as_bytes()).map_err(&write_error)?;
                    writer.write_all(b"\n").map_err(&write_error)?;
                    merged_len += 1;
                }
                if current_min.is_exhausted() {
                    break;
                }
                if let Some(Reverse(next_min)) = unmerged_files.peek() {
                    if next_min < &current_min {
                        break;
                    }
                }
            }

            if current_min.is_exhausted() {
                log::debug!("Merged chunk {}", current_min.index());
                current_min.close(remove_merged)?;
            } else {
                unmerged_files.push(Reverse(current_min));
            }
        }
        writer.flush().map_err(&write_error)?;

        log::info!("Finished merging sorted files, thread: {}, merged length: {} lines", thread::current().name().unwrap_or("unnamed"), merged_len);
        Ok(merged_len)
    }

    /// Merge consecutive groups of files into new chunk files until at most `config.files()`
    /// remain.
    ///
    /// Returns the remaining files and whether they belong to the run, that is, may be removed
    /// once merged.
    fn reduce_fan_in(
        mut files: Vec<SortedChunkFile>,
        config: &Config,
        dir: &Path,
        next_index: &mut usize,
        mut owned: bool,
    ) -> Result<(Vec<SortedChunkFile>, bool), SortError> {
        while files.len() > config.files() {
            log::info!("Reducing {} sorted files in groups of {}", files.len(), config.files());
            let mut merged_files = Vec::with_capacity(files.len() / config.files() + 1);
            let mut remaining = files.into_iter();
            loop {
                let group: Vec<SortedChunkFile> = remaining.by_ref().take(config.files()).collect();
                if group.is_empty() {
                    break;
                }
                let index = *next_index;
                *next_index += 1;
                let path = chunk_file_path(dir, index);
                let write_error = |e| SortError::ChunkWrite { path: path.clone(), source: e };
                let merged_file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(write_error)?;
                let mut merged_writer = BufWriter::new(merged_file);
                let lines = Self::internal_merge(group, &mut merged_writer, owned, write_error)?;
                merged_files.push(SortedChunkFile::new(index, path, lines));
            }
            files = merged_files;
            owned = true;
        }
        Ok((files, owned))
    }

    /// Merge into a temporary file beside `output` and move it over `output` when complete
    fn merge_to_output(files: Vec<SortedChunkFile>, remove_merged: bool, output: &PathBuf) -> Result<usize, SortError> {
        let output_error = |e| SortError::OutputWrite { path: output.clone(), source: e };
        let output_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let merged_file = Builder::new()
            .prefix(".text-record-sort-")
            .tempfile_in(output_dir)
            .map_err(output_error)?;
        let mut merged_writer = BufWriter::new(merged_file);
        let lines = Self::internal_merge(files, &mut merged_writer, remove_merged, output_error)?;
        let merged_file = merged_writer.into_inner()
            .map_err(|e| output_error(e.into_error()))?;
        merged_file.persist(output)
            .map_err(|e| output_error(e.error))?;
        Ok(lines)
    }

    fn internal_merge_files(input_files: &[PathBuf], config: &Config, output: &PathBuf) -> Result<(), anyhow::Error> {
        let run_dir = Self::create_run_dir(config)?;
        let files: Vec<SortedChunkFile> = input_files.iter()
            .enumerate()
            .map(|(index, path)| SortedChunkFile::new(index, path.clone(), 0))
            .collect();
        let mut next_index = files.len();
        let (files, owned) = Self::reduce_fan_in(files, config, run_dir.path(), &mut next_index, false)?;
        let lines = Self::merge_to_output(files, owned, output)?;
        log::info!("Merged {} lines into {}", lines, output.display());
        run_dir.close().with_context(|| "remove intermediate directory")?;
        Ok(())
    }

    /// Read all inputs into chunks and sort them on the pool.
    ///
    /// Returns only after every submitted command has finished, together with the next free chunk
    /// index.
    fn sort_chunks(input_files: &[PathBuf], config: &Config, dir: &Path) -> Result<(Vec<SortedChunkFile>, usize), anyhow::Error> {
        let sorted_chunks = Arc::new(SortedChunks::default());
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("sorting".to_string())
            .with_tasks(config.tasks())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()?;

        let planned = Self::plan_chunks(input_files, config, dir, &mut sorting_pool, &sorted_chunks);

        log::info!("Shutting down sorting pool");
        sorting_pool.shutdown();
        sorting_pool.join()?;

        let next_index = planned?;
        if let Some(e) = sorted_chunks.take_error() {
            return Err(e);
        }
        Ok((sorted_chunks.take_files(), next_index))
    }

    fn plan_chunks(
        input_files: &[PathBuf],
        config: &Config,
        dir: &Path,
        sorting_pool: &mut ThreadPool,
        sorted_chunks: &Arc<SortedChunks>,
    ) -> Result<usize, SortError> {
        let mut next_index = 0;
        for path in input_files {
            let mut chunk_iterator = ChunkIterator::new(path, config, next_index)?;
            for chunk in chunk_iterator.by_ref() {
                if sorted_chunks.failed() {
                    log::info!("Sorting failed, stop reading {}", path.display());
                    return Ok(next_index);
                }
                let chunk = chunk?;
                log::debug!("Submit chunk {} with {} lines", chunk.index(), chunk.len());
                sorting_pool.submit(Box::new(SortCommand::new(chunk, dir.to_path_buf(), sorted_chunks.clone())));
            }
            next_index = chunk_iterator.next_index();
        }
        Ok(next_index)
    }

    fn internal_sort(input_files: &[PathBuf], config: &Config, output: &PathBuf) -> Result<(), anyhow::Error> {
        log::info!("Start parallel sort");
        // dropping the directory removes every chunk file left in it
        let run_dir = Self::create_run_dir(config)?;

        let (sorted_files, mut next_index) = Self::sort_chunks(input_files, config, run_dir.path())?;
        let sorted_lines: usize = sorted_files.iter().map(|f| f.lines()).sum();
        log::info!("Sorted {} lines in {} chunks", sorted_lines, sorted_files.len());

        let (sorted_files, _) = Self::reduce_fan_in(sorted_files, config, run_dir.path(), &mut next_index, true)?;
        let lines = Self::merge_to_output(sorted_files, true, output)?;

        run_dir.close().with_context(|| "remove intermediate directory")?;
        log::info!("Finish parallel sort, {} lines", lines);
        Ok(())
    }
}
