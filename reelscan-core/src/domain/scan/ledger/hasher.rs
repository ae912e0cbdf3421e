//! Content hashing via xxh3.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reelscan_model::ContentHash;
use tokio::io::AsyncReadExt;
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::domain::scan::scanner::FileSystem;
use crate::domain::scan::scanner::settings::DEFAULT_HASH_BUFFER_BYTES;
use crate::error::Result;

/// Compute the xxh3 64-bit hash of in-memory content.
#[inline]
pub fn hash_bytes(content: &[u8]) -> ContentHash {
    ContentHash(xxh3_64(content))
}

/// Streams file content through xxh3 and counts how many files it hashed.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    buffer_bytes: usize,
    hashed: Arc<AtomicU64>,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_BUFFER_BYTES)
    }
}

impl ContentHasher {
    pub fn new(buffer_bytes: usize) -> Self {
        Self {
            buffer_bytes: buffer_bytes.max(1),
            hashed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn hash_file(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
    ) -> Result<ContentHash> {
        let mut reader = fs.open(path).await?;
        let mut hasher = Xxh3::new();
        let mut buffer = vec![0u8; self.buffer_bytes];

        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        self.hashed.fetch_add(1, Ordering::Relaxed);
        Ok(ContentHash(hasher.digest()))
    }

    /// Files hashed by this hasher (and its clones) so far.
    pub fn files_hashed(&self) -> u64 {
        self.hashed.load(Ordering::Relaxed)
    }
}
