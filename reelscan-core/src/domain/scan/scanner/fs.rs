use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;
use tokio::io::AsyncRead;

use crate::error::{Result, ScanError};

/// Byte stream handed to the content hasher.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Minimal, async-capable filesystem abstraction used by scan jobs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check whether a path exists.
    async fn path_exists(&self, path: &Path) -> bool;

    /// Open a directory for iteration.
    async fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Box<dyn ReadDirStream + Send>>;

    /// Fetch lightweight file metadata without reading content.
    async fn metadata(&self, path: &Path) -> Result<FsMetadata>;

    /// Open a file for sequential reading.
    async fn open(&self, path: &Path) -> Result<FileReader>;
}

/// Lightweight metadata needed by scanners.
#[derive(Debug, Clone, Copy)]
pub struct FsMetadata {
    pub is_dir: bool,
    pub is_file: bool,
    /// Symlinked directories are reported with `is_dir == false` so walks
    /// never follow them.
    pub is_symlink: bool,
    pub len: u64,
    /// Last modified time if available
    pub modified: Option<SystemTime>,
}

/// Async directory iterator (similar to tokio::fs::ReadDir).
#[async_trait]
pub trait ReadDirStream {
    /// Return next entry's path, or None when exhausted.
    async fn next_entry(&mut self) -> Result<Option<PathBuf>>;
}

/// Real filesystem implementation backed by tokio::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

fn fs_error(op: &str, path: &Path, err: std::io::Error) -> ScanError {
    ScanError::FileSystem(format!("{op} failed for {}: {err}", path.display()))
}

#[async_trait]
impl FileSystem for RealFs {
    async fn path_exists(&self, path: &Path) -> bool {
        // try_exists avoids errors for permission issues by returning false
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Box<dyn ReadDirStream + Send>> {
        let rd = tokio::fs::read_dir(path)
            .await
            .map_err(|e| fs_error("read_dir", path, e))?;
        Ok(Box::new(RealReadDir {
            inner: rd,
            dir: path.to_path_buf(),
        }))
    }

    async fn metadata(&self, path: &Path) -> Result<FsMetadata> {
        let link = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| fs_error("metadata", path, e))?;

        if !link.file_type().is_symlink() {
            return Ok(FsMetadata {
                is_dir: link.is_dir(),
                is_file: link.is_file(),
                is_symlink: false,
                len: link.len(),
                modified: link.modified().ok(),
            });
        }

        let target = tokio::fs::metadata(path)
            .await
            .map_err(|e| fs_error("metadata", path, e))?;
        Ok(FsMetadata {
            is_dir: false,
            is_file: target.is_file(),
            is_symlink: true,
            len: target.len(),
            modified: target.modified().ok(),
        })
    }

    async fn open(&self, path: &Path) -> Result<FileReader> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| fs_error("open", path, e))?;
        Ok(Box::new(file))
    }
}

struct RealReadDir {
    inner: tokio::fs::ReadDir,
    dir: PathBuf,
}

#[async_trait]
impl ReadDirStream for RealReadDir {
    async fn next_entry(&mut self) -> Result<Option<PathBuf>> {
        match self.inner.next_entry().await {
            Ok(Some(entry)) => Ok(Some(entry.path())),
            Ok(None) => Ok(None),
            Err(e) => Err(fs_error("next_entry", &self.dir, e)),
        }
    }
}

/// In-memory filesystem for tests and dry runs.
///
/// Paths are treated literally; callers should use consistent absolute
/// paths. The tree can be mutated while scans hold a shared handle, and
/// every `open` is counted so callers can tell whether content was read.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFs {
    nodes: Arc<DashMap<PathBuf, Node>>,
    opens: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir {
        children: Vec<PathBuf>,
    },
    File {
        content: Arc<Vec<u8>>,
        modified: SystemTime,
    },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        if self.nodes.contains_key(&path) {
            return;
        }
        self.ensure_parent_link(&path);
        self.nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
            },
        );
    }

    /// Create or replace a file.
    pub fn add_file<P: Into<PathBuf>>(
        &self,
        path: P,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let path = path.into();
        self.ensure_parent_link(&path);
        self.nodes.insert(
            path,
            Node::File {
                content: Arc::new(content.into()),
                modified,
            },
        );
    }

    /// Change a file's modified time without touching its content.
    pub fn touch(&self, path: &Path, modified: SystemTime) -> bool {
        match self.nodes.get_mut(path).as_deref_mut() {
            Some(Node::File { modified: slot, .. }) => {
                *slot = modified;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        if self.nodes.remove(path).is_none() {
            return false;
        }
        if let Some(parent) = path.parent()
            && let Some(Node::Dir { children }) =
                self.nodes.get_mut(parent).as_deref_mut()
        {
            children.retain(|child| child.as_path() != path);
        }
        true
    }

    /// Number of times any file was opened for reading.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn ensure_parent_link(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            // Ensure parent directory exists
            if !self.nodes.contains_key(parent) {
                self.nodes.insert(
                    parent.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                // Recurse to ensure its parent exists
                self.ensure_parent_link(parent);
            }
            // Link child into parent
            if let Some(Node::Dir { children }) =
                self.nodes.get_mut(parent).as_deref_mut()
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn path_exists(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    async fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Box<dyn ReadDirStream + Send>> {
        match self.nodes.get(path).as_deref() {
            Some(Node::Dir { children }) => Ok(Box::new(InMemReadDir {
                queue: children.clone().into(),
            })),
            Some(Node::File { .. }) => Err(ScanError::FileSystem(format!(
                "read_dir on file: {}",
                path.display()
            ))),
            None => Err(ScanError::FileSystem(format!(
                "read_dir on missing path: {}",
                path.display()
            ))),
        }
    }

    async fn metadata(&self, path: &Path) -> Result<FsMetadata> {
        match self.nodes.get(path).as_deref() {
            Some(Node::Dir { .. }) => Ok(FsMetadata {
                is_dir: true,
                is_file: false,
                is_symlink: false,
                len: 0,
                modified: None,
            }),
            Some(Node::File { content, modified }) => Ok(FsMetadata {
                is_dir: false,
                is_file: true,
                is_symlink: false,
                len: content.len() as u64,
                modified: Some(*modified),
            }),
            None => Err(ScanError::FileSystem(format!(
                "metadata on missing path: {}",
                path.display()
            ))),
        }
    }

    async fn open(&self, path: &Path) -> Result<FileReader> {
        let content = match self.nodes.get(path).as_deref() {
            Some(Node::File { content, .. }) => Arc::clone(content),
            _ => {
                return Err(ScanError::FileSystem(format!(
                    "open on missing file: {}",
                    path.display()
                )));
            }
        };
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Cursor::new(content.as_ref().clone())))
    }
}

struct InMemReadDir {
    queue: VecDeque<PathBuf>,
}

#[async_trait]
impl ReadDirStream for InMemReadDir {
    async fn next_entry(&mut self) -> Result<Option<PathBuf>> {
        Ok(self.queue.pop_front())
    }
}
