mod bridge;

pub use bridge::PythonBridge;

use crate::domain::{FixtureError, FixtureResult, Overrides, ParamMap};
use crate::params::{GlobalParams, ParameterSchema, ResolvedRunOptions, resolve_run_options};
use crate::spectrum::{BoxExtent, PowerSpectrum, PowerSpectrumEstimator};
use ndarray::Array3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Grid settings echoed back by a finished simulation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GridParams {
    #[serde(rename = "HII_DIM")]
    pub hii_dim: i64,
    #[serde(rename = "DIM")]
    pub dim: i64,
    #[serde(rename = "BOX_LEN")]
    pub box_len: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LibraryDescription {
    pub schema: ParameterSchema,
    pub global_params: ParamMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoevalOutput {
    pub user_params: GridParams,
    pub brightness_temp: Array3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightconeOutput {
    pub user_params: GridParams,
    pub brightness_temp: Array3<f64>,
    pub lightcone_dimensions: [f64; 3],
    pub global_xhi: Vec<f64>,
    pub global_brightness_temp: Vec<f64>,
}

/// Call contract of the external simulation library.
pub trait Simulator {
    fn describe(&self) -> FixtureResult<LibraryDescription>;

    fn run_coeval(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
    ) -> FixtureResult<CoevalOutput>;

    fn run_lightcone(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
        max_redshift: f64,
    ) -> FixtureResult<LightconeOutput>;
}

/// Process-lifetime scratch directory for simulation caches.
///
/// The directory is intentionally left on disk when the value is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirectory {
    path: PathBuf,
}

impl CacheDirectory {
    pub fn create() -> FixtureResult<Self> {
        let temp = tempfile::Builder::new()
            .prefix("fixture-cache-")
            .tempdir()
            .map_err(|source| {
                FixtureError::io_system(
                    "IO.CACHE_DIRECTORY",
                    format!("failed to create simulation cache directory: {}", source),
                )
            })?;
        Ok(Self { path: temp.keep() })
    }

    pub fn at(path: impl Into<PathBuf>) -> FixtureResult<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|source| {
            FixtureError::io_system(
                "IO.CACHE_DIRECTORY",
                format!(
                    "failed to create simulation cache directory '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn enter(&self) -> CacheScope<'_> {
        debug!(directory = %self.path.display(), "entering simulation cache scope");
        CacheScope {
            directory: &self.path,
        }
    }
}

/// Every simulation call made while a scope is alive shares its cache.
#[derive(Debug)]
pub struct CacheScope<'a> {
    directory: &'a Path,
}

impl CacheScope<'_> {
    pub fn directory(&self) -> &Path {
        self.directory
    }
}

impl Drop for CacheScope<'_> {
    fn drop(&mut self) {
        debug!(directory = %self.directory.display(), "leaving simulation cache scope");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationProducts {
    pub coeval_spectrum: PowerSpectrum,
    pub lightcone_spectrum: PowerSpectrum,
    pub grid: GridParams,
    pub global_xhi: Vec<f64>,
    pub global_brightness_temp: Vec<f64>,
}

/// Runs the coeval and lightcone simulations for one option entry.
pub struct SimulationInvoker<'a, S: ?Sized, E: ?Sized> {
    simulator: &'a S,
    estimator: &'a E,
    schema: &'a ParameterSchema,
    globals: &'a GlobalParams,
}

impl<'a, S, E> SimulationInvoker<'a, S, E>
where
    S: Simulator + ?Sized,
    E: PowerSpectrumEstimator + ?Sized,
{
    pub fn new(
        simulator: &'a S,
        estimator: &'a E,
        schema: &'a ParameterSchema,
        globals: &'a GlobalParams,
    ) -> Self {
        Self {
            simulator,
            estimator,
            schema,
            globals,
        }
    }

    pub fn resolve(&self, redshift: f64, overrides: &Overrides) -> ResolvedRunOptions {
        let options = resolve_run_options(redshift, overrides, self.schema, self.globals);
        for key in &options.dropped_keys {
            warn!(
                key = %key,
                redshift,
                "override matches no parameter group or global toggle and is ignored"
            );
        }
        options
    }

    pub fn run(
        &self,
        cache: &CacheDirectory,
        redshift: f64,
        overrides: &Overrides,
    ) -> FixtureResult<SimulationProducts> {
        let options = self.resolve(redshift, overrides);

        let scope = cache.enter();
        let coeval = self.simulator.run_coeval(&scope, &options, self.globals)?;
        let coeval_spectrum = self.estimator.estimate(
            &coeval.brightness_temp,
            BoxExtent::Cubic(coeval.user_params.box_len),
        )?;
        debug!(redshift, bins = coeval_spectrum.len(), "coeval spectrum computed");

        let lightcone =
            self.simulator
                .run_lightcone(&scope, &options, self.globals, options.redshift + 2.0)?;
        let lightcone_spectrum = self.estimator.estimate(
            &lightcone.brightness_temp,
            BoxExtent::Cuboid(lightcone.lightcone_dimensions),
        )?;
        debug!(redshift, bins = lightcone_spectrum.len(), "lightcone spectrum computed");
        drop(scope);

        Ok(SimulationProducts {
            coeval_spectrum,
            lightcone_spectrum,
            grid: coeval.user_params,
            global_xhi: lightcone.global_xhi,
            global_brightness_temp: lightcone.global_brightness_temp,
        })
    }
}
