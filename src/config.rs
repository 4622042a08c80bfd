use std::path::PathBuf;

use regex::Regex;

#[derive(Clone)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tasks: usize,
    queue_size: usize,
    chunk_size: usize,
    files: usize,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tasks: usize,
        chunk_size: usize,
        files: usize,
        ignore_empty: bool,
        ignore_lines: Option<Regex>,
    ) -> Config {
        // each queued command holds a full chunk in memory
        let queue_size = tasks * 2;
        Config {
            tmp,
            tmp_prefix,
            tasks,
            queue_size,
            chunk_size,
            files,
            ignore_empty,
            ignore_lines,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn files(&self) -> usize {
        self.files
    }

    /// True when the line is dropped before it reaches the sort
    pub(crate) fn ignored(&self, line: &str) -> bool {
        if self.ignore_empty && line.trim().is_empty() {
            return true;
        }
        match &self.ignore_lines {
            Some(r) => r.is_match(line.trim()),
            None => false,
        }
    }
}
