use super::CliError;
use super::helpers::init_logging;
use fixture_core::domain::LogLevel;
use fixture_core::fixture::CleanupMode;
use fixture_core::generation::{
    GenerationConfig, GenerationEvent, render_human_summary, run_generation,
};
use fixture_core::options::option_table;
use fixture_core::simulation::PythonBridge;
use fixture_core::spectrum::BinnedPowerSpectrum;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct GenerateArgs {
    /// Regenerate fixtures that already exist
    #[arg(long)]
    force: bool,

    /// Report stale fixture files instead of removing them
    #[arg(long)]
    no_clean: bool,

    /// Log level for this tool and the simulation library
    #[arg(long, value_name = "LEVEL", default_value = "WARNING")]
    log: LogLevel,

    /// Only produce these option-table entries (implies --force and --no-clean)
    #[arg(long, value_name = "I,J,...", value_delimiter = ',', num_args = 1..)]
    nums: Option<Vec<usize>>,

    /// Directory holding the fixture files
    #[arg(long, default_value = "test_data")]
    data_dir: PathBuf,

    /// Python interpreter that hosts the simulation library
    #[arg(long, default_value = "python3")]
    python: String,

    /// File pattern considered during stale-fixture cleanup
    #[arg(long, default_value = "*")]
    stale_glob: String,

    /// Reuse this simulation cache directory instead of a fresh temporary one
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl GenerateArgs {
    fn into_config(self) -> (GenerationConfig, LogLevel, String) {
        let mut config = GenerationConfig {
            data_dir: self.data_dir,
            force: self.force,
            cleanup: if self.no_clean {
                CleanupMode::Report
            } else {
                CleanupMode::Remove
            },
            stale_glob: self.stale_glob,
            cache_dir: self.cache_dir,
            ..GenerationConfig::default()
        };
        if let Some(indices) = self.nums {
            config.restrict_to(indices);
        }
        (config, self.log, self.python)
    }
}

pub(super) fn run_generate_command(args: GenerateArgs) -> Result<i32, CliError> {
    let (config, log_level, interpreter) = args.into_config();
    init_logging(log_level)?;

    let simulator = PythonBridge::new(interpreter, log_level);
    info!(
        interpreter = simulator.interpreter(),
        data_dir = %config.data_dir.display(),
        "starting fixture generation"
    );
    let estimator = BinnedPowerSpectrum::new();
    let report = run_generation(
        &config,
        &option_table(),
        &simulator,
        &estimator,
        print_event,
    )
    .map_err(CliError::Compute)?;

    println!("{}", render_human_summary(&report));
    Ok(0)
}

fn print_event(event: &GenerationEvent) {
    match event {
        GenerationEvent::Produced { path, overrides } => {
            println!("Produced {} with {}", path.display(), overrides);
        }
        GenerationEvent::Reused { .. } => {}
        GenerationEvent::Removed { path } => {
            println!("Removing old file: {}", path.display());
        }
        GenerationEvent::Redundant { path } => {
            println!("File is now redundant and can be removed: {}", path.display());
        }
    }
}
