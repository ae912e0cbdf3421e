/// Shared scanner defaults that align with the runtime configuration knobs.
///
/// Keeping the extension lists in one place lets configuration layers expose
/// overrides without diverging from the core's filtering rules.
pub const DEFAULT_VIDEO_FILE_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
];

pub const DEFAULT_SUBTITLE_FILE_EXTENSIONS: &[&str] =
    &["srt", "ass", "ssa", "vtt", "sub", "idx"];

/// Buffer used when streaming file bytes through the content hasher.
pub const DEFAULT_HASH_BUFFER_BYTES: usize = 64 * 1024;

/// Convenience helper for consumers that work with owned strings (e.g. config
/// deserialisation layers).
pub fn default_video_file_extensions_vec() -> Vec<String> {
    DEFAULT_VIDEO_FILE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

pub fn default_subtitle_file_extensions_vec() -> Vec<String> {
    DEFAULT_SUBTITLE_FILE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}
