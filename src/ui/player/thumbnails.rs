use std::path::{Path, PathBuf};
use std::time::Duration;

/// One still image is available per this many seconds of media. Contract with
/// the asset pipeline that generates the preview directory, not configurable.
pub(super) const PREVIEW_CADENCE_SECS: f64 = 10.0;

/// Index of the preview still for a hovered timeline fraction. 1-based and
/// never below 1. There is deliberately no upper bounds check: an index past
/// the generated set resolves to a missing file and the preview picture shows
/// its broken-image fallback.
pub(super) fn preview_index(fraction: f64, duration: Duration) -> u64 {
    let index = (fraction * duration.as_secs_f64() / PREVIEW_CADENCE_SECS).floor();
    if index >= 1.0 { index as u64 } else { 1 }
}

/// Sidecar directory of timeline preview stills for one media file.
#[derive(Debug, Clone)]
pub(super) struct ThumbnailTrack {
    dir: PathBuf,
}

impl ThumbnailTrack {
    /// Look for `<stem>-previews/` next to the media file.
    pub(super) fn discover(media_path: &Path) -> Option<Self> {
        let stem = media_path.file_stem()?;
        let mut name = stem.to_os_string();
        name.push("-previews");
        let dir = media_path.parent()?.join(name);
        dir.is_dir().then_some(Self { dir })
    }

    pub(super) fn frame_path(&self, fraction: f64, duration: Duration) -> PathBuf {
        self.dir
            .join(format!("preview{}.jpg", preview_index(fraction, duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn index_is_never_below_one() {
        assert_eq!(preview_index(0.0, Duration::from_secs(600)), 1);
        assert_eq!(preview_index(0.01, Duration::from_secs(600)), 1);
        assert_eq!(preview_index(0.5, Duration::ZERO), 1);
    }

    #[test]
    fn index_follows_ten_second_cadence() {
        let duration = Duration::from_secs(600);
        assert_eq!(preview_index(0.1, duration), 6); // 60s in
        assert_eq!(preview_index(0.5, duration), 30); // 300s in
        assert_eq!(preview_index(1.0, duration), 60);
    }

    #[test]
    fn index_is_monotone_in_fraction() {
        let duration = Duration::from_secs(3600);
        let mut last = 0;
        for step in 0..=100 {
            let index = preview_index(step as f64 / 100.0, duration);
            assert!(index >= 1);
            assert!(index >= last);
            last = index;
        }
    }

    #[test]
    fn discovers_sidecar_directory() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("movie.mkv");
        fs::write(&media, b"").unwrap();

        assert!(ThumbnailTrack::discover(&media).is_none());

        fs::create_dir(dir.path().join("movie-previews")).unwrap();
        let track = ThumbnailTrack::discover(&media).unwrap();
        let path = track.frame_path(0.5, Duration::from_secs(100));
        assert!(path.ends_with("movie-previews/preview5.jpg"));
    }
}
