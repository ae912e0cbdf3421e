use std::{collections::HashSet, path::Path};

use crate::domain::scan::config::ScanRuntimeConfig;

/// Extension allow-lists shared by the media-type scanners.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    video: HashSet<String>,
    subtitle: HashSet<String>,
    skip_hidden: bool,
}

impl ExtensionFilter {
    /// An extension listed as both video and subtitle is treated as video
    /// only, so each file is claimed by a single media kind.
    pub fn new<V, S>(video: V, subtitle: S, skip_hidden: bool) -> Self
    where
        V: IntoIterator,
        V::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let video = normalize(video);
        let mut subtitle = normalize(subtitle);
        subtitle.retain(|ext| !video.contains(ext));
        Self {
            video,
            subtitle,
            skip_hidden,
        }
    }

    pub fn from_config(config: &ScanRuntimeConfig) -> Self {
        Self::new(
            &config.video_extensions,
            &config.subtitle_extensions,
            config.skip_hidden,
        )
    }

    pub fn is_video(&self, path: &Path) -> bool {
        self.visible(path)
            && extension_of(path).is_some_and(|ext| self.video.contains(&ext))
            && !is_sample(path)
    }

    pub fn is_subtitle(&self, path: &Path) -> bool {
        self.visible(path)
            && extension_of(path).is_some_and(|ext| self.subtitle.contains(&ext))
    }

    /// Hidden entries (dot-prefixed) are skipped when configured to.
    pub fn visible(&self, path: &Path) -> bool {
        if !self.skip_hidden {
            return true;
        }
        !path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::from_config(&ScanRuntimeConfig::default())
    }
}

fn normalize<I>(extensions: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Release samples ("movie-sample.mkv", "sample.mkv") are not library media.
fn is_sample(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_ascii_lowercase())
        .is_some_and(|stem| {
            stem == "sample"
                || stem.ends_with("-sample")
                || stem.ends_with(".sample")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_extensions_case_insensitively() {
        let filter = ExtensionFilter::new([".MKV", "mp4"], ["srt"], true);
        assert!(filter.is_video(Path::new("/m/Film (2020).mkv")));
        assert!(filter.is_video(Path::new("/m/Film.MP4")));
        assert!(!filter.is_video(Path::new("/m/notes.txt")));
        assert!(filter.is_subtitle(Path::new("/m/Film.en.srt")));
    }

    #[test]
    fn shared_extension_is_video_only() {
        let filter = ExtensionFilter::new(["mkv"], ["srt", ".MKV"], true);
        assert!(filter.is_video(Path::new("/m/Film.mkv")));
        assert!(!filter.is_subtitle(Path::new("/m/Film.mkv")));
        assert!(filter.is_subtitle(Path::new("/m/Film.srt")));
    }

    #[test]
    fn skips_samples_and_hidden_files() {
        let filter = ExtensionFilter::default();
        assert!(!filter.is_video(Path::new("/m/Film/film-sample.mkv")));
        assert!(!filter.is_video(Path::new("/m/Film/sample.mkv")));
        assert!(!filter.is_video(Path::new("/m/.Film.mkv")));

        let keep_hidden = ExtensionFilter::new(["mkv"], ["srt"], false);
        assert!(keep_hidden.is_video(Path::new("/m/.Film.mkv")));
    }
}
