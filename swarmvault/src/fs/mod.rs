//! File system helpers: tree summaries and gzip tar archives.

pub mod archive;
pub mod walker;
