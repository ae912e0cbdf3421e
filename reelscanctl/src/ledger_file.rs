use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reelscan_model::{LibraryId, LibraryType, ScanId, ScanResultRecord};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

pub const LEDGER_FORMAT_VERSION: u32 = 1;

/// On-disk copy of a library's last completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFile {
    pub version: u32,
    pub library_id: LibraryId,
    pub library_type: LibraryType,
    pub roots: Vec<PathBuf>,
    pub scan_id: ScanId,
    pub completed_at: DateTime<Utc>,
    pub records: Vec<ScanResultRecord>,
}

impl LedgerFile {
    pub fn new(
        library_id: LibraryId,
        library_type: LibraryType,
        roots: Vec<PathBuf>,
        scan_id: ScanId,
        records: Vec<ScanResultRecord>,
    ) -> Self {
        Self {
            version: LEDGER_FORMAT_VERSION,
            library_id,
            library_type,
            roots,
            scan_id,
            completed_at: Utc::now(),
            records,
        }
    }

    /// `None` when no ledger has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read ledger {}", path.display()))?;
        let ledger: Self = serde_json::from_str(&contents)
            .with_context(|| format!("invalid ledger {}", path.display()))?;
        if ledger.version != LEDGER_FORMAT_VERSION {
            bail!(
                "ledger {} has format version {}, expected {}",
                path.display(),
                ledger.version,
                LEDGER_FORMAT_VERSION
            );
        }
        Ok(Some(ledger))
    }

    /// Write through a temp file in the same directory so a crash never
    /// leaves a truncated ledger behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to stage ledger in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self)
            .context("failed to serialize ledger")?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .with_context(|| format!("failed to write ledger {}", path.display()))?;
        Ok(())
    }
}
