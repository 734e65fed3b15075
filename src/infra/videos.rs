//! Public video storage: the append-only directory published renders are copied into.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::warn;

/// Suffix of in-progress copies; never served.
const PARTIAL_SUFFIX: &str = ".partial";

/// Errors that can occur while interacting with the video store.
#[derive(Debug, Error)]
pub enum VideoStoreError {
    #[error("invalid video file name")]
    InvalidName,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of publishing a rendered video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub file_name: String,
    pub url: String,
    pub size_bytes: u64,
}

/// Filesystem-backed video storage served under a fixed URL prefix.
#[derive(Debug)]
pub struct VideoStore {
    root: PathBuf,
    url_prefix: String,
}

impl VideoStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            url_prefix: url_prefix.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.url_prefix)
    }

    /// Copy `source` into the store as `file_name`. The source is left in place.
    ///
    /// The copy is staged under a `.partial` name and renamed into place, so a failed copy
    /// never leaves a truncated video at the published name.
    pub async fn publish(
        &self,
        source: &Path,
        file_name: &str,
    ) -> Result<PublishedVideo, VideoStoreError> {
        let destination = self.resolve(file_name)?;
        let staging = self.root.join(format!(".{file_name}{PARTIAL_SUFFIX}"));
        fs::create_dir_all(&self.root).await?;

        let staged = async {
            let size_bytes = fs::copy(source, &staging).await?;
            fs::rename(&staging, &destination).await?;
            Ok::<_, std::io::Error>(size_bytes)
        }
        .await;
        let size_bytes = match staged {
            Ok(size_bytes) => size_bytes,
            Err(err) => {
                discard_staging(&staging).await;
                return Err(err.into());
            }
        };

        Ok(PublishedVideo {
            file_name: file_name.to_string(),
            url: self.url_for(file_name),
            size_bytes,
        })
    }

    /// Attempt to read a published video into memory.
    pub async fn read(&self, file_name: &str) -> Result<Bytes, VideoStoreError> {
        if file_name.ends_with(PARTIAL_SUFFIX) {
            return Err(VideoStoreError::InvalidName);
        }
        let absolute = self.resolve(file_name)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Resolve a bare file name inside the store. Anything other than a single normal
    /// path component is rejected.
    fn resolve(&self, file_name: &str) -> Result<PathBuf, VideoStoreError> {
        let relative = Path::new(file_name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => Err(VideoStoreError::InvalidName),
        }
    }
}

async fn discard_staging(staging: &Path) {
    match fs::remove_file(staging).await {
        Err(err) if err.kind() != ErrorKind::NotFound => warn!(
            target = "infra::videos",
            op = "videos::publish",
            path = %staging.display(),
            error = %err,
            "Failed to remove partial video copy"
        ),
        _ => {}
    }
}
