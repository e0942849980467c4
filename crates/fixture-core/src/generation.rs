use crate::domain::{FixtureError, FixtureResult, OptionEntry, Overrides};
use crate::fixture::{CleanupMode, FixtureOutcome, FixtureSet, produce_power_spectra_for_tests};
use crate::options::select_entries;
use crate::params::{DEFAULT_ZPRIME_STEP_FACTOR, GlobalParams};
use crate::simulation::{CacheDirectory, SimulationInvoker, Simulator};
use crate::spectrum::PowerSpectrumEstimator;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub data_dir: PathBuf,
    pub force: bool,
    pub cleanup: CleanupMode,
    pub selection: Selection,
    pub stale_glob: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("test_data"),
            force: false,
            cleanup: CleanupMode::Remove,
            selection: Selection::All,
            stale_glob: "*".to_string(),
            cache_dir: None,
        }
    }
}

impl GenerationConfig {
    /// Restricts the run to a subset, which always regenerates and never
    /// removes anything.
    pub fn restrict_to(&mut self, indices: Vec<usize>) {
        self.selection = Selection::Indices(indices);
        self.force = true;
        self.cleanup = CleanupMode::Report;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Produced { path: PathBuf, overrides: Overrides },
    Reused { path: PathBuf },
    Removed { path: PathBuf },
    Redundant { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationReport {
    pub cache_dir: PathBuf,
    pub fixtures: Vec<FixtureOutcome>,
    pub removed: Vec<PathBuf>,
    pub redundant: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn produced_count(&self) -> usize {
        self.fixtures
            .iter()
            .filter(|outcome| outcome.was_produced())
            .count()
    }

    pub fn reused_count(&self) -> usize {
        self.fixtures.len() - self.produced_count()
    }
}

pub fn render_human_summary(report: &GenerationReport) -> String {
    let mut lines = vec![format!(
        "Fixtures: {} total ({} produced, {} reused)",
        report.fixtures.len(),
        report.produced_count(),
        report.reused_count()
    )];
    if !report.removed.is_empty() {
        lines.push(format!("Removed stale fixtures: {}", report.removed.len()));
    }
    if !report.redundant.is_empty() {
        lines.push(format!("Redundant fixtures kept: {}", report.redundant.len()));
    }
    lines.push(format!("Simulation cache: {}", report.cache_dir.display()));
    lines.join("\n")
}

pub fn run_generation<S, E, F>(
    config: &GenerationConfig,
    table: &[OptionEntry],
    simulator: &S,
    estimator: &E,
    mut on_event: F,
) -> FixtureResult<GenerationReport>
where
    S: Simulator + ?Sized,
    E: PowerSpectrumEstimator + ?Sized,
    F: FnMut(&GenerationEvent),
{
    let entries = match &config.selection {
        Selection::All => table.to_vec(),
        Selection::Indices(indices) => select_entries(table, indices)?,
    };
    let fixture_set = FixtureSet::new(&config.data_dir, &config.stale_glob)?;

    fs::create_dir_all(&config.data_dir).map_err(|source| {
        FixtureError::io_system(
            "IO.FIXTURE_DIRECTORY",
            format!(
                "failed to create fixture directory '{}': {}",
                config.data_dir.display(),
                source
            ),
        )
    })?;

    let description = simulator.describe()?;
    let mut globals = GlobalParams::from_defaults(description.global_params);
    globals.set("ZPRIME_STEP_FACTOR", DEFAULT_ZPRIME_STEP_FACTOR);

    let cache = match &config.cache_dir {
        Some(path) => CacheDirectory::at(path)?,
        None => CacheDirectory::create()?,
    };
    info!(
        cache = %cache.path().display(),
        entries = entries.len(),
        force = config.force,
        "generating fixtures"
    );

    let invoker = SimulationInvoker::new(simulator, estimator, &description.schema, &globals);
    let mut report = GenerationReport {
        cache_dir: cache.path().to_path_buf(),
        ..GenerationReport::default()
    };
    for entry in &entries {
        let outcome = produce_power_spectra_for_tests(
            &invoker,
            &cache,
            &config.data_dir,
            entry,
            config.force,
        )?;
        let event = match &outcome {
            FixtureOutcome::Produced(path) => GenerationEvent::Produced {
                path: path.clone(),
                overrides: entry.overrides.clone(),
            },
            FixtureOutcome::Reused(path) => GenerationEvent::Reused { path: path.clone() },
        };
        on_event(&event);
        report.fixtures.push(outcome);
    }

    if config.selection != Selection::All {
        debug!("explicit selection requested; stale fixture cleanup skipped");
        return Ok(report);
    }

    let produced = report
        .fixtures
        .iter()
        .map(|outcome| outcome.path().to_path_buf())
        .collect::<Vec<_>>();
    for path in fixture_set.stale(&produced)? {
        match config.cleanup {
            CleanupMode::Remove => {
                fixture_set.remove(&path)?;
                on_event(&GenerationEvent::Removed { path: path.clone() });
                report.removed.push(path);
            }
            CleanupMode::Report => {
                on_event(&GenerationEvent::Redundant { path: path.clone() });
                report.redundant.push(path);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{GenerationConfig, GenerationReport, Selection, render_human_summary};
    use crate::fixture::{CleanupMode, FixtureOutcome};
    use std::path::PathBuf;

    #[test]
    fn restricting_the_selection_forces_and_disables_removal() {
        let mut config = GenerationConfig::default();
        assert_eq!(config.selection, Selection::All);
        assert!(!config.force);

        config.restrict_to(vec![3, 1]);
        assert_eq!(config.selection, Selection::Indices(vec![3, 1]));
        assert!(config.force);
        assert_eq!(config.cleanup, CleanupMode::Report);
    }

    #[test]
    fn summary_counts_produced_and_reused_fixtures() {
        let report = GenerationReport {
            cache_dir: PathBuf::from("/tmp/cache"),
            fixtures: vec![
                FixtureOutcome::Produced(PathBuf::from("a.h5")),
                FixtureOutcome::Reused(PathBuf::from("b.h5")),
                FixtureOutcome::Reused(PathBuf::from("c.h5")),
            ],
            removed: vec![PathBuf::from("d.h5")],
            redundant: Vec::new(),
        };

        assert_eq!(
            render_human_summary(&report),
            "Fixtures: 3 total (1 produced, 2 reused)\nRemoved stale fixtures: 1\nSimulation cache: /tmp/cache"
        );
    }
}
