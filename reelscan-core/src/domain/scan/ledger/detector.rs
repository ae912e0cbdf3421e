use std::path::Path;

use chrono::{DateTime, Utc};
use reelscan_model::{FileChange, ScanId, ScanResultRecord};
use tracing::trace;

use super::hasher::ContentHasher;
use crate::domain::scan::scanner::{FileSystem, FsMetadata};
use crate::error::Result;

/// Outcome of classifying one observed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub change: FileChange,
    /// Ledger entry for the current scan, written regardless of `change`.
    pub record: ScanResultRecord,
    /// Whether content was hashed to reach the verdict.
    pub hashed: bool,
}

/// Classifies files against the previous scan's ledger.
///
/// Level 1: size + modified time equal to the prior record means unchanged
/// without reading the file.
/// Level 2: otherwise the content hash decides. Size or time drift alone
/// never marks a file changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    hasher: ContentHasher,
}

impl ChangeDetector {
    pub fn new(hasher: ContentHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    pub async fn classify(
        &self,
        fs: &dyn FileSystem,
        scan_id: ScanId,
        path: &Path,
        metadata: &FsMetadata,
        previous: Option<&ScanResultRecord>,
    ) -> Result<Classification> {
        let path_key = path_key(path);
        let file_size = metadata.len;
        let last_modified = metadata
            .modified
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        // Without a real modified time the fast path cannot be trusted.
        if let Some(prior) = previous
            && metadata.modified.is_some()
            && prior.metadata_matches(file_size, last_modified)
        {
            trace!(path = %path_key, "metadata unchanged; skipping hash");
            return Ok(Classification {
                change: FileChange::Unchanged,
                record: ScanResultRecord::new(
                    scan_id,
                    path_key,
                    prior.content_hash,
                    file_size,
                    last_modified,
                ),
                hashed: false,
            });
        }

        let content_hash = self.hasher.hash_file(fs, path).await?;
        let change = match previous {
            None => FileChange::New,
            Some(prior) if prior.content_hash == content_hash => {
                FileChange::Unchanged
            }
            Some(_) => FileChange::Changed,
        };
        trace!(path = %path_key, %content_hash, %change, "hashed file");

        Ok(Classification {
            change,
            record: ScanResultRecord::new(
                scan_id,
                path_key,
                content_hash,
                file_size,
                last_modified,
            ),
            hashed: true,
        })
    }
}

/// Ledger key for a filesystem path.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
