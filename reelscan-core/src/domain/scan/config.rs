use serde::{Deserialize, Serialize};

use super::scanner::settings::{
    DEFAULT_HASH_BUFFER_BYTES, default_subtitle_file_extensions_vec,
    default_video_file_extensions_vec,
};

/// Knobs that tune scan execution.
///
/// All fields carry defaults so a partial configuration payload is enough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRuntimeConfig {
    /// Upper bound on jobs running at once across all scans in the process.
    pub max_concurrent_jobs: usize,
    /// Read buffer used when hashing file content.
    pub hash_buffer_bytes: usize,
    /// Extensions treated as video files by the movie and series scanners.
    pub video_extensions: Vec<String>,
    /// Extensions treated as subtitle sidecars.
    pub subtitle_extensions: Vec<String>,
    /// Skip dot-prefixed files and directories while walking.
    pub skip_hidden: bool,
    /// How long a terminal progress snapshot stays readable. Zero drops it
    /// as soon as the scan finishes.
    pub progress_retention_secs: u64,
}

impl Default for ScanRuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: num_cpus::get().max(1),
            hash_buffer_bytes: DEFAULT_HASH_BUFFER_BYTES,
            video_extensions: default_video_file_extensions_vec(),
            subtitle_extensions: default_subtitle_file_extensions_vec(),
            skip_hidden: true,
            progress_retention_secs: 300,
        }
    }
}
