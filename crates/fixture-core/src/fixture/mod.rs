mod cleanup;
mod container;

pub use cleanup::{CleanupMode, FixtureSet};
pub use container::{DATASET_NAMES, FixtureContents};

use crate::domain::{FixtureError, FixtureResult, OptionEntry, Overrides};
use crate::simulation::{CacheDirectory, SimulationInvoker, Simulator};
use crate::spectrum::PowerSpectrumEstimator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FIXTURE_PREFIX: &str = "power_spectra_z";
pub const FIXTURE_EXTENSION: &str = "h5";

/// Name derived from the redshift and the key-sorted overrides, so any
/// insertion order of the same overrides maps to the same file.
pub fn fixture_filename(redshift: f64, overrides: &Overrides) -> String {
    let joined = overrides
        .sorted()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("_");
    format!("{FIXTURE_PREFIX}{redshift:.2}_{joined}.{FIXTURE_EXTENSION}")
}

pub fn fixture_path(data_dir: &Path, redshift: f64, overrides: &Overrides) -> PathBuf {
    data_dir.join(fixture_filename(redshift, overrides))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    Produced(PathBuf),
    Reused(PathBuf),
}

impl FixtureOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Produced(path) | Self::Reused(path) => path,
        }
    }

    pub fn was_produced(&self) -> bool {
        matches!(self, Self::Produced(_))
    }
}

pub fn produce_power_spectra_for_tests<S, E>(
    invoker: &SimulationInvoker<'_, S, E>,
    cache: &CacheDirectory,
    data_dir: &Path,
    entry: &OptionEntry,
    force: bool,
) -> FixtureResult<FixtureOutcome>
where
    S: Simulator + ?Sized,
    E: PowerSpectrumEstimator + ?Sized,
{
    let path = fixture_path(data_dir, entry.redshift, &entry.overrides);

    if path.exists() {
        if !force {
            debug!(path = %path.display(), "fixture already exists");
            return Ok(FixtureOutcome::Reused(path));
        }
        fs::remove_file(&path).map_err(|source| {
            FixtureError::io_system(
                "IO.FIXTURE_REMOVE",
                format!(
                    "failed to remove existing fixture '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
    }

    let products = invoker.run(cache, entry.redshift, &entry.overrides)?;
    FixtureContents::from_products(&entry.overrides, &products).write(&path)?;
    info!(path = %path.display(), redshift = entry.redshift, "fixture written");

    Ok(FixtureOutcome::Produced(path))
}
