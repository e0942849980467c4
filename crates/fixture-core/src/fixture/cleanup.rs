use crate::domain::{FixtureError, FixtureResult};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupMode {
    #[default]
    Remove,
    Report,
}

/// The fixture files currently on disk in one data directory.
///
/// Hidden entries and sub-directories are never considered, matching shell
/// glob behaviour.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    data_dir: PathBuf,
    matcher: GlobMatcher,
}

impl FixtureSet {
    pub fn new(data_dir: impl Into<PathBuf>, pattern: &str) -> FixtureResult<Self> {
        let matcher = Glob::new(pattern)
            .map_err(|source| {
                FixtureError::input_validation(
                    "INPUT.STALE_GLOB",
                    format!("invalid stale-fixture pattern '{}': {}", pattern, source),
                )
            })?
            .compile_matcher();
        Ok(Self {
            data_dir: data_dir.into(),
            matcher,
        })
    }

    pub fn files(&self) -> FixtureResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.data_dir).map_err(|source| {
            FixtureError::io_system(
                "IO.FIXTURE_DIRECTORY",
                format!(
                    "failed to list fixture directory '{}': {}",
                    self.data_dir.display(),
                    source
                ),
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                FixtureError::io_system(
                    "IO.FIXTURE_DIRECTORY",
                    format!(
                        "failed to read entry in '{}': {}",
                        self.data_dir.display(),
                        source
                    ),
                )
            })?;
            let path = entry.path();
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') || !path.is_file() {
                continue;
            }
            if self.matcher.is_match(Path::new(&name)) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Files on disk that are not among `produced`, compared by file name.
    pub fn stale(&self, produced: &[PathBuf]) -> FixtureResult<Vec<PathBuf>> {
        let keep = produced
            .iter()
            .filter_map(|path| path.file_name().map(OsString::from))
            .collect::<BTreeSet<_>>();

        Ok(self
            .files()?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| !keep.contains(name))
            })
            .collect())
    }

    pub fn remove(&self, path: &Path) -> FixtureResult<()> {
        fs::remove_file(path).map_err(|source| {
            FixtureError::io_system(
                "IO.FIXTURE_REMOVE",
                format!("failed to remove stale fixture '{}': {}", path.display(), source),
            )
        })
    }
}
