//! Render job value types: validated input, job identity, and the on-disk layout the
//! external renderer is expected to follow.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use uuid::Uuid;

use super::error::DomainError;

pub use scenecast_api_types::DEFAULT_SCENE_NAME;

pub const SCRIPT_EXTENSION: &str = "py";
pub const ARTIFACT_EXTENSION: &str = "mp4";
/// Directory under the media root where the renderer writes movie files.
pub const ARTIFACT_KIND_DIR: &str = "videos";
const MAX_SCENE_NAME_LEN: usize = 128;

/// Script text supplied by the caller. Opaque and untrusted; only emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource(String);

impl ScriptSource {
    pub fn new(code: Option<String>) -> Result<Self, DomainError> {
        match code {
            Some(code) if !code.trim().is_empty() => Ok(Self(code)),
            Some(_) => Err(DomainError::validation("script text is empty")),
            None => Err(DomainError::validation("script text is missing")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn byte_len(&self) -> usize {
        self.0.len()
    }
}

/// Name of the scene class to render.
///
/// The name is interpolated into file names and renderer arguments, so it is held to
/// a Python identifier: a letter or `_`, then letters, digits or `_`. Non-ASCII letters
/// are accepted since Python 3 accepts them in class names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneName(String);

impl SceneName {
    /// Parse an optional caller-supplied name, substituting [`DEFAULT_SCENE_NAME`] when it
    /// is absent or blank.
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        let candidate = raw.map(str::trim).filter(|value| !value.is_empty());
        let Some(candidate) = candidate else {
            return Ok(Self(DEFAULT_SCENE_NAME.to_string()));
        };

        if candidate.chars().count() > MAX_SCENE_NAME_LEN {
            return Err(DomainError::validation(format!(
                "scene name exceeds {MAX_SCENE_NAME_LEN} characters"
            )));
        }

        let mut chars = candidate.chars();
        let leading_ok = chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        if !leading_ok || !chars.all(|c| c.is_alphanumeric() || c == '_') {
            return Err(DomainError::validation(format!(
                "scene name `{candidate}` is not a valid identifier"
            )));
        }

        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated input to a render job.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub script: ScriptSource,
    pub scene: SceneName,
}

impl RenderRequest {
    pub fn new(code: Option<String>, scene_name: Option<&str>) -> Result<Self, DomainError> {
        let script = ScriptSource::new(code)?;
        let scene = SceneName::parse(scene_name)?;
        Ok(Self { script, scene })
    }
}

/// Per-request identifier namespacing every transient path and the published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Renderer quality presets, each with the CLI flag selecting it and the folder name the
/// renderer nests its output under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityTier {
    #[default]
    Low,
    Medium,
    High,
    Production,
    FourK,
}

impl QualityTier {
    pub fn flag(self) -> &'static str {
        match self {
            QualityTier::Low => "-ql",
            QualityTier::Medium => "-qm",
            QualityTier::High => "-qh",
            QualityTier::Production => "-qp",
            QualityTier::FourK => "-qk",
        }
    }

    pub fn folder_name(self) -> &'static str {
        match self {
            QualityTier::Low => "480p15",
            QualityTier::Medium => "720p30",
            QualityTier::High => "1080p60",
            QualityTier::Production => "1440p60",
            QualityTier::FourK => "2160p60",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Production => "production",
            QualityTier::FourK => "fourk",
        }
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(QualityTier::Low),
            "medium" | "m" => Ok(QualityTier::Medium),
            "high" | "h" => Ok(QualityTier::High),
            "production" | "p" => Ok(QualityTier::Production),
            "fourk" | "4k" | "k" => Ok(QualityTier::FourK),
            other => Err(format!(
                "unknown quality `{other}` (expected low|medium|high|production|fourk)"
            )),
        }
    }
}

/// How the finished movie is found after the renderer exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactDiscovery {
    /// Probe only the path the renderer's naming convention predicts.
    #[default]
    Convention,
    /// Probe the conventional path, then fall back to the newest movie file anywhere
    /// under the media root.
    Scan,
}

impl ArtifactDiscovery {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactDiscovery::Convention => "convention",
            ArtifactDiscovery::Scan => "scan",
        }
    }
}

impl FromStr for ArtifactDiscovery {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "convention" => Ok(ArtifactDiscovery::Convention),
            "scan" => Ok(ArtifactDiscovery::Scan),
            other => Err(format!(
                "unknown discovery strategy `{other}` (expected convention|scan)"
            )),
        }
    }
}

/// Filesystem layout of one job beneath the temp root.
///
/// The workspace doubles as the renderer's media root, so removing it removes the
/// script and everything the renderer produced.
#[derive(Debug, Clone)]
pub struct JobLayout {
    job_id: JobId,
    scene: SceneName,
    workspace: PathBuf,
}

impl JobLayout {
    pub fn new(temp_root: &Path, job_id: JobId, scene: SceneName) -> Self {
        let workspace = temp_root.join(job_id.to_string());
        Self {
            job_id,
            scene,
            workspace,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn scene(&self) -> &SceneName {
        &self.scene
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn media_dir(&self) -> &Path {
        &self.workspace
    }

    /// `<jobId>_<scene>`: the script's base name, which the renderer reuses as the
    /// per-script output folder.
    pub fn script_stem(&self) -> String {
        format!("{}_{}", self.job_id, self.scene)
    }

    pub fn script_path(&self) -> PathBuf {
        self.workspace
            .join(format!("{}.{SCRIPT_EXTENSION}", self.script_stem()))
    }

    /// Where the renderer writes the finished movie for `quality`.
    pub fn expected_artifact(&self, quality: QualityTier) -> PathBuf {
        self.media_dir()
            .join(ARTIFACT_KIND_DIR)
            .join(self.script_stem())
            .join(quality.folder_name())
            .join(format!("{}.{ARTIFACT_EXTENSION}", self.scene))
    }

    pub fn published_file_name(&self) -> String {
        format!("{}.{ARTIFACT_EXTENSION}", self.script_stem())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// One render job's identity, layout, and status.
#[derive(Debug, Clone)]
pub struct RenderJob {
    layout: JobLayout,
    status: JobStatus,
}

impl RenderJob {
    pub fn new(temp_root: &Path, scene: SceneName) -> Self {
        Self {
            layout: JobLayout::new(temp_root, JobId::new(), scene),
            status: JobStatus::Pending,
        }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Move the job into a terminal state. A job settles exactly once.
    pub fn settle(&mut self, status: JobStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "job {} already {}",
                self.layout.job_id,
                self.status.as_str()
            )));
        }
        if !status.is_terminal() {
            return Err(DomainError::invariant("a job cannot return to pending"));
        }
        self.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(scene: &str) -> JobLayout {
        let job_id = JobId::from(
            Uuid::parse_str("6f1c2b8e-7d3a-4c55-9a0e-1b2c3d4e5f60").expect("uuid"),
        );
        let scene = SceneName::parse(Some(scene)).expect("scene");
        JobLayout::new(Path::new("/srv/tmp"), job_id, scene)
    }

    #[test]
    fn missing_or_blank_script_is_rejected() {
        assert!(ScriptSource::new(None).is_err());
        assert!(ScriptSource::new(Some("   \n".into())).is_err());
        assert!(ScriptSource::new(Some("from manim import *".into())).is_ok());
    }

    #[test]
    fn scene_name_defaults_when_absent_or_blank() {
        assert_eq!(SceneName::parse(None).unwrap().as_str(), DEFAULT_SCENE_NAME);
        assert_eq!(
            SceneName::parse(Some("  ")).unwrap().as_str(),
            DEFAULT_SCENE_NAME
        );
    }

    #[test]
    fn scene_name_must_be_identifier() {
        assert_eq!(SceneName::parse(Some("Demo_2")).unwrap().as_str(), "Demo_2");
        for bad in ["2Demo", "../etc", "Demo Scene", "Demo;rm", "-Demo", "a/b", "Demo\\x"] {
            assert!(SceneName::parse(Some(bad)).is_err(), "accepted `{bad}`");
        }
        let long = "A".repeat(MAX_SCENE_NAME_LEN + 1);
        assert!(SceneName::parse(Some(&long)).is_err());
    }

    #[test]
    fn scene_name_accepts_unicode_identifiers() {
        for good in ["Démo", "Σκηνή", "_场景2"] {
            assert_eq!(SceneName::parse(Some(good)).unwrap().as_str(), good);
        }
        let long = "é".repeat(MAX_SCENE_NAME_LEN);
        assert!(SceneName::parse(Some(&long)).is_ok());
    }

    #[test]
    fn layout_nests_paths_under_job_workspace() {
        let layout = layout("Demo");
        let stem = "6f1c2b8e-7d3a-4c55-9a0e-1b2c3d4e5f60_Demo";
        assert_eq!(
            layout.workspace(),
            Path::new("/srv/tmp/6f1c2b8e-7d3a-4c55-9a0e-1b2c3d4e5f60")
        );
        assert_eq!(layout.script_stem(), stem);
        assert_eq!(layout.script_path(), layout.workspace().join(format!("{stem}.py")));
        assert_eq!(layout.published_file_name(), format!("{stem}.mp4"));
    }

    #[test]
    fn expected_artifact_follows_renderer_convention() {
        let layout = layout("Demo");
        let expected = layout
            .workspace()
            .join("videos")
            .join(layout.script_stem())
            .join("480p15")
            .join("Demo.mp4");
        assert_eq!(layout.expected_artifact(QualityTier::Low), expected);
        assert!(
            layout
                .expected_artifact(QualityTier::High)
                .to_string_lossy()
                .contains("1080p60")
        );
    }

    #[test]
    fn quality_parses_names_and_shorthands() {
        assert_eq!("low".parse::<QualityTier>(), Ok(QualityTier::Low));
        assert_eq!("4K".parse::<QualityTier>(), Ok(QualityTier::FourK));
        assert!("ultra".parse::<QualityTier>().is_err());
    }

    #[test]
    fn job_settles_once() {
        let mut job = RenderJob::new(Path::new("/tmp"), SceneName::parse(None).unwrap());
        assert_eq!(job.status(), JobStatus::Pending);
        job.settle(JobStatus::Failed).expect("first settle");
        assert!(job.settle(JobStatus::Succeeded).is_err());
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[test]
    fn distinct_jobs_get_distinct_workspaces() {
        let scene = SceneName::parse(Some("Demo")).unwrap();
        let a = RenderJob::new(Path::new("/tmp"), scene.clone());
        let b = RenderJob::new(Path::new("/tmp"), scene);
        assert_ne!(a.layout().workspace(), b.layout().workspace());
        assert_ne!(
            a.layout().published_file_name(),
            b.layout().published_file_name()
        );
    }
}
