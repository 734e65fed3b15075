//! Finds the renderer's output movie and publishes it.

use std::{
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::render::{ARTIFACT_EXTENSION, ArtifactDiscovery, JobLayout, QualityTier};
use crate::infra::videos::{PublishedVideo, VideoStore, VideoStoreError};

/// Fragments of partially encoded output the renderer leaves next to the final movie.
const PARTIAL_MOVIE_DIR: &str = "partial_movie_files";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("rendered video not found at {}", probed.display())]
    Missing { probed: PathBuf },
    #[error("failed to publish rendered video: {0}")]
    Publish(#[source] VideoStoreError),
}

/// Locates render artifacts under a job's media root.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactLocator {
    quality: QualityTier,
    discovery: ArtifactDiscovery,
}

impl ArtifactLocator {
    pub fn new(quality: QualityTier, discovery: ArtifactDiscovery) -> Self {
        Self { quality, discovery }
    }

    /// Return the path of the finished movie, or the conventional path that was probed.
    ///
    /// The conventional path is
    /// `<media>/videos/<jobId>_<scene>/<quality-folder>/<scene>.mp4`. It depends on the
    /// renderer's own naming and breaks silently if that changes between versions;
    /// [`ArtifactDiscovery::Scan`] trades that brittleness for a directory walk.
    pub async fn locate(&self, layout: &JobLayout) -> Result<PathBuf, LocateError> {
        let expected = layout.expected_artifact(self.quality);
        if is_file(&expected).await {
            return Ok(expected);
        }

        if self.discovery == ArtifactDiscovery::Scan {
            let media_dir = layout.media_dir().to_path_buf();
            let found = tokio::task::spawn_blocking(move || newest_movie(&media_dir))
                .await
                .ok()
                .flatten();
            if let Some(found) = found {
                info!(
                    target = "application::render::locator",
                    op = "locator::locate",
                    result = "scan_hit",
                    expected = %expected.display(),
                    found = %found.display(),
                    "Rendered video found outside the conventional path"
                );
                return Ok(found);
            }
        }

        debug!(
            target = "application::render::locator",
            op = "locator::locate",
            result = "missing",
            probed = %expected.display(),
            discovery = self.discovery.as_str(),
            "Rendered video not found"
        );
        Err(LocateError::Missing { probed: expected })
    }

    /// Locate the movie and copy it into `videos` as `<jobId>_<scene>.mp4`.
    pub async fn locate_and_publish(
        &self,
        layout: &JobLayout,
        videos: &VideoStore,
    ) -> Result<PublishedVideo, LocateError> {
        let artifact = self.locate(layout).await?;
        videos
            .publish(&artifact, &layout.published_file_name())
            .await
            .map_err(LocateError::Publish)
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Most recently modified movie file beneath `root`, ignoring partial fragments.
fn newest_movie(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != PARTIAL_MOVIE_DIR)
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
        })
        .filter_map(|entry| {
            let modified = modified_at(entry.path()).ok()?;
            Some((modified, entry.into_path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

fn modified_at(path: &Path) -> io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::render::{JobId, SceneName};
    use tempfile::TempDir;

    fn layout(temp: &TempDir) -> JobLayout {
        JobLayout::new(
            temp.path(),
            JobId::new(),
            SceneName::parse(Some("Demo")).expect("scene"),
        )
    }

    fn write(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, bytes).expect("write");
    }

    #[tokio::test]
    async fn finds_conventional_path() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        let expected = layout.expected_artifact(QualityTier::Low);
        write(&expected, b"movie");

        let locator = ArtifactLocator::new(QualityTier::Low, ArtifactDiscovery::Convention);
        assert_eq!(locator.locate(&layout).await.expect("found"), expected);
    }

    #[tokio::test]
    async fn convention_reports_probed_path_on_version_skew() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        write(
            &layout
                .media_dir()
                .join("videos")
                .join(layout.script_stem())
                .join("854p15")
                .join("Demo.mp4"),
            b"movie",
        );

        let locator = ArtifactLocator::new(QualityTier::Low, ArtifactDiscovery::Convention);
        match locator.locate(&layout).await {
            Err(LocateError::Missing { probed }) => {
                assert_eq!(probed, layout.expected_artifact(QualityTier::Low));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn scan_falls_back_to_newest_movie() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        let skewed = layout
            .media_dir()
            .join("videos")
            .join(layout.script_stem())
            .join("854p15")
            .join("Demo.mp4");
        write(&skewed, b"movie");
        write(
            &layout
                .media_dir()
                .join("videos")
                .join(layout.script_stem())
                .join("854p15")
                .join(PARTIAL_MOVIE_DIR)
                .join("Demo")
                .join("chunk.mp4"),
            b"partial",
        );

        let locator = ArtifactLocator::new(QualityTier::Low, ArtifactDiscovery::Scan);
        assert_eq!(locator.locate(&layout).await.expect("found"), skewed);
    }

    #[tokio::test]
    async fn scan_reports_probed_path_when_nothing_rendered() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        std::fs::create_dir_all(layout.media_dir()).expect("mkdir");

        let locator = ArtifactLocator::new(QualityTier::Low, ArtifactDiscovery::Scan);
        assert!(matches!(
            locator.locate(&layout).await,
            Err(LocateError::Missing { .. })
        ));
    }

    #[tokio::test]
    async fn publishes_under_job_scoped_name() {
        let temp = TempDir::new().expect("temp dir");
        let layout = layout(&temp);
        write(&layout.expected_artifact(QualityTier::Low), b"movie");
        let videos = VideoStore::new(temp.path().join("public"), "/manim_videos").expect("store");

        let locator = ArtifactLocator::new(QualityTier::Low, ArtifactDiscovery::Convention);
        let published = locator
            .locate_and_publish(&layout, &videos)
            .await
            .expect("published");

        assert_eq!(
            published.url,
            format!("/manim_videos/{}_Demo.mp4", layout.job_id())
        );
        assert!(layout.expected_artifact(QualityTier::Low).exists());
    }
}
