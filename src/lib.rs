//! This crate implements an external merge sort for text files of numbered records, that is lines
//! of the form `<integer>. <payload>`, for example `415. Apple`.
//!
//! Lines are ordered by their payload, comparing bytes, and lines with equal payloads by the numeric
//! value of the prefix, so `1. Apple` sorts before `415. Apple`, which sorts before
//! `2. Banana is yellow`.
//!
//! The input is read in chunks of a bounded number of lines. Each chunk is sorted on a thread pool
//! and spilled to its own temporary file, then all chunk files are merged into the output with a
//! k-way merge. Memory use is controlled by the chunk size and temporary files never outlive the
//! sort, whether it succeeds or fails.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use text_record_sort::sort::Sort;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut text_record_sort = Sort::new(vec![input], output);
//!
//!     // set number of CPU cores the sort will attempt to use. The default is to use all
//!     // available cores.
//!     text_record_sort.with_tasks(2);
//!
//!     // number of lines sorted in memory at once per chunk, the default is 100,000
//!     text_record_sort.with_chunk_size(10_000);
//!
//!     // set the directory for intermediate results. The default is the system temp dir -
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
//!     // directory for intermediate files, preferably on the same file system as the output result.
//!     text_record_sort.with_tmp_dir(tmp);
//!
//!     text_record_sort.sort()
//! }
//! ```
//!
//! A failed sort can be inspected through [SortError]:
//! ```
//! use std::path::Path;
//! use text_record_sort::SortError;
//!
//! let result = text_record_sort::sort(Path::new("./no/such/input.txt"), Path::new("./sorted.txt"));
//! let error = result.unwrap_err();
//! assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::InputNotFound { .. })));
//! ```

pub(crate) mod chunk_iterator;
pub(crate) mod config;
pub(crate) mod sort_command;
pub(crate) mod sorted_chunk_file;
pub(crate) mod unmerged_chunk_file;

pub mod error;
pub mod line_record;
pub mod sort;

pub use error::SortError;
pub use line_record::{compare, LineRecord};
pub use sort::{sort, Sort};
