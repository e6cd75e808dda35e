/**
 * Content hashing module for duplicate detection using xxhash
 */

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3;

pub struct ContentHasher {
    chunk_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            chunk_size: 65536, // 64KB chunks
        }
    }

    /// Calculate the xxh3 hash of a file's content, streamed in chunks
    pub fn calculate_file_hash(&self, file_path: &Path) -> Result<u64> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file for hashing: {}", file_path.display()))?;

        let mut reader = BufReader::new(file);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut hasher = xxh3::Xxh3::default();

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .with_context(|| format!("Failed to read file for hashing: {}", file_path.display()))?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.digest())
    }

    /// Whether two files hold identical bytes. Sizes are compared before hashing.
    pub fn same_content(&self, a: &Path, b: &Path) -> Result<bool> {
        let len_a = fs::metadata(a)
            .with_context(|| format!("Failed to stat {}", a.display()))?
            .len();
        let len_b = fs::metadata(b)
            .with_context(|| format!("Failed to stat {}", b.display()))?
            .len();
        if len_a != len_b {
            return Ok(false);
        }

        Ok(self.calculate_file_hash(a)? == self.calculate_file_hash(b)?)
    }
}
