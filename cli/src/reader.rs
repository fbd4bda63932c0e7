//! Combat log file access. The game writes WINDOWS-1252, so every line is
//! decoded before it reaches the pipeline.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::WINDOWS_1252;
use memchr::memchr_iter;
use memmap2::Mmap;

pub struct LogFile {
    mmap: Mmap,
}

impl LogFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to memory map {}", path.display()))?;
        Ok(Self { mmap })
    }

    /// Decoded lines, trailing CR stripped, empty lines skipped.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        let bytes = self.mmap.as_ref();
        let mut ranges = Vec::new();
        let mut start = 0;
        for end in memchr_iter(b'\n', bytes) {
            if end > start {
                ranges.push((start, end));
            }
            start = end + 1;
        }
        if start < bytes.len() {
            ranges.push((start, bytes.len()));
        }

        ranges.into_iter().filter_map(move |(start, mut end)| {
            if end > start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
            if end == start {
                return None;
            }
            let (line, _, _) = WINDOWS_1252.decode(&bytes[start..end]);
            Some(line)
        })
    }
}
