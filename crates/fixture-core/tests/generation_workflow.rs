use fixture_core::domain::{FixtureResult, OptionEntry, Overrides, ParamMap, ParamValue};
use fixture_core::fixture::{CleanupMode, FixtureContents, fixture_path};
use fixture_core::generation::{GenerationConfig, GenerationEvent, run_generation};
use fixture_core::options::option_table;
use fixture_core::params::{GlobalParams, ParameterSchema, ResolvedRunOptions};
use fixture_core::simulation::{
    CacheScope, CoevalOutput, GridParams, LibraryDescription, LightconeOutput, Simulator,
};
use fixture_core::spectrum::BinnedPowerSpectrum;
use ndarray::Array3;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct RecordedCall {
    options: ResolvedRunOptions,
    assigned_globals: ParamMap,
    cache_dir: PathBuf,
    max_redshift: Option<f64>,
}

struct FakeSimulator {
    amplitude: Cell<f64>,
    describe_calls: Cell<usize>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl FakeSimulator {
    fn new() -> Self {
        Self {
            amplitude: Cell::new(1.0),
            describe_calls: Cell::new(0),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn field(&self, shape: (usize, usize, usize)) -> Array3<f64> {
        let amplitude = self.amplitude.get();
        Array3::from_shape_fn(shape, |(i, j, k)| {
            amplitude * ((i as f64 * 0.9).sin() + (j as f64 * 0.4).cos() * (k as f64 * 1.3).sin())
        })
    }

    fn record(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
        max_redshift: Option<f64>,
    ) {
        self.calls.borrow_mut().push(RecordedCall {
            options: options.clone(),
            assigned_globals: globals.assigned(),
            cache_dir: scope.directory().to_path_buf(),
            max_redshift,
        });
    }
}

fn map(entries: &[(&str, ParamValue)]) -> ParamMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn grid(options: &ResolvedRunOptions) -> GridParams {
    let number = |key: &str| match options.user_params.get(key) {
        Some(ParamValue::Int(value)) => *value as f64,
        Some(ParamValue::Float(value)) => *value,
        other => panic!("grid parameter {key} should be numeric, got {other:?}"),
    };
    GridParams {
        hii_dim: number("HII_DIM") as i64,
        dim: number("DIM") as i64,
        box_len: number("BOX_LEN"),
    }
}

impl Simulator for FakeSimulator {
    fn describe(&self) -> FixtureResult<LibraryDescription> {
        self.describe_calls.set(self.describe_calls.get() + 1);
        Ok(LibraryDescription {
            schema: ParameterSchema {
                flag_options: map(&[
                    ("USE_TS_FLUCT", ParamValue::Bool(false)),
                    ("INHOMO_RECO", ParamValue::Bool(false)),
                ]),
                astro_params: map(&[("HII_EFF_FACTOR", ParamValue::Float(30.0))]),
                cosmo_params: map(&[("SIGMA_8", ParamValue::Float(0.82))]),
                user_params: map(&[
                    ("HII_DIM", ParamValue::Int(200)),
                    ("HMF", ParamValue::Int(1)),
                ]),
            },
            global_params: map(&[
                ("ZPRIME_STEP_FACTOR", ParamValue::Float(1.02)),
                ("Z_HEAT_MAX", ParamValue::Float(35.0)),
            ]),
        })
    }

    fn run_coeval(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
    ) -> FixtureResult<CoevalOutput> {
        self.record(scope, options, globals, None);
        Ok(CoevalOutput {
            user_params: grid(options),
            brightness_temp: self.field((8, 8, 8)),
        })
    }

    fn run_lightcone(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
        max_redshift: f64,
    ) -> FixtureResult<LightconeOutput> {
        self.record(scope, options, globals, Some(max_redshift));
        let amplitude = self.amplitude.get();
        Ok(LightconeOutput {
            user_params: grid(options),
            brightness_temp: self.field((8, 8, 12)),
            lightcone_dimensions: [100.0, 100.0, 150.0],
            global_xhi: vec![0.99, 0.97, 0.93],
            global_brightness_temp: vec![-4.0 * amplitude, -9.0 * amplitude, -15.0 * amplitude],
        })
    }
}

fn small_table() -> Vec<OptionEntry> {
    vec![
        OptionEntry::new(12.0, Overrides::new()),
        OptionEntry::new(
            16.0,
            [
                ("HMF", ParamValue::Int(3)),
                ("USE_TS_FLUCT", ParamValue::Bool(true)),
            ]
            .into_iter()
            .collect(),
        ),
    ]
}

fn config_for(temp: &TempDir) -> GenerationConfig {
    GenerationConfig {
        data_dir: temp.path().join("test_data"),
        cache_dir: Some(temp.path().join("cache")),
        ..GenerationConfig::default()
    }
}

fn run(
    config: &GenerationConfig,
    table: &[OptionEntry],
    simulator: &FakeSimulator,
) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    run_generation(
        config,
        table,
        simulator,
        &BinnedPowerSpectrum::with_bin_count(4),
        |event| events.push(event.clone()),
    )
    .expect("generation should succeed");
    events
}

fn default_fixture(data_dir: &Path) -> PathBuf {
    data_dir.join("power_spectra_z12.00_.h5")
}

#[test]
fn default_entry_produces_a_complete_fixture() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut config = config_for(&temp);
    config.restrict_to(vec![0]);
    let simulator = FakeSimulator::new();

    let events = run(&config, &option_table(), &simulator);

    let path = default_fixture(&config.data_dir);
    assert_eq!(
        events,
        vec![GenerationEvent::Produced {
            path: path.clone(),
            overrides: Overrides::new(),
        }]
    );

    let contents = FixtureContents::read(&path).expect("fixture should be readable");
    assert!(!contents.power_coeval.is_empty());
    assert_eq!(contents.power_coeval.len(), contents.k_coeval.len());
    assert!(!contents.power_lc.is_empty());
    assert_eq!(contents.power_lc.len(), contents.k_lc.len());
    assert_eq!(contents.xhi, vec![0.99, 0.97, 0.93]);
    assert_eq!(contents.tb.len(), 3);
    assert_eq!(contents.attributes.get("HII_DIM"), Some(&ParamValue::Int(50)));
    assert_eq!(contents.attributes.get("DIM"), Some(&ParamValue::Int(150)));
    assert_eq!(
        contents.attributes.get("BOX_LEN"),
        Some(&ParamValue::Float(100.0))
    );

    let calls = simulator.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].max_redshift, None);
    assert_eq!(calls[1].max_redshift, Some(14.0));
    assert!(calls.iter().all(|call| call.cache_dir == temp.path().join("cache")));
}

#[test]
fn existing_fixture_is_reused_without_simulating() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = config_for(&temp);
    let table = small_table();
    let simulator = FakeSimulator::new();

    run(&config, &table, &simulator);
    assert_eq!(simulator.call_count(), 4);
    let first = fs::read(default_fixture(&config.data_dir)).expect("fixture should exist");

    let events = run(&config, &table, &simulator);
    assert_eq!(simulator.call_count(), 4);
    assert!(
        events
            .iter()
            .all(|event| matches!(event, GenerationEvent::Reused { .. }))
    );
    let second = fs::read(default_fixture(&config.data_dir)).expect("fixture should exist");
    assert_eq!(first, second);
}

#[test]
fn force_regenerates_existing_fixtures() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut config = config_for(&temp);
    let table = small_table();
    let simulator = FakeSimulator::new();

    run(&config, &table, &simulator);
    let before = FixtureContents::read(&default_fixture(&config.data_dir))
        .expect("fixture should be readable");

    simulator.amplitude.set(3.0);
    config.force = true;
    let events = run(&config, &table, &simulator);
    let after = FixtureContents::read(&default_fixture(&config.data_dir))
        .expect("fixture should be readable");

    assert_eq!(simulator.call_count(), 8);
    assert!(
        events
            .iter()
            .all(|event| matches!(event, GenerationEvent::Produced { .. }))
    );
    assert_ne!(before.power_coeval, after.power_coeval);
    assert_eq!(after.tb, vec![-12.0, -27.0, -45.0]);
}

#[test]
fn full_run_removes_stale_files_but_keeps_hidden_ones() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = config_for(&temp);
    fs::create_dir_all(&config.data_dir).expect("data dir should be created");
    let stale = config.data_dir.join("power_spectra_z99.00_.h5");
    fs::write(&stale, b"old").expect("stale file should be written");
    fs::write(config.data_dir.join(".gitkeep"), b"").expect("hidden file should be written");

    let simulator = FakeSimulator::new();
    let events = run(&config, &small_table(), &simulator);

    assert!(!stale.exists());
    assert!(config.data_dir.join(".gitkeep").exists());
    assert_eq!(
        events.last(),
        Some(&GenerationEvent::Removed {
            path: stale.clone()
        })
    );
}

#[test]
fn report_mode_only_names_stale_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut config = config_for(&temp);
    config.cleanup = CleanupMode::Report;
    fs::create_dir_all(&config.data_dir).expect("data dir should be created");
    let stale = config.data_dir.join("leftover.h5");
    fs::write(&stale, b"old").expect("stale file should be written");

    let simulator = FakeSimulator::new();
    let events = run(&config, &small_table(), &simulator);

    assert!(stale.exists());
    assert!(events.contains(&GenerationEvent::Redundant { path: stale }));
}

#[test]
fn explicit_selection_never_inspects_other_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut config = config_for(&temp);
    config.restrict_to(vec![1]);
    fs::create_dir_all(&config.data_dir).expect("data dir should be created");
    let unrelated = config.data_dir.join("power_spectra_z12.00_.h5");
    fs::write(&unrelated, b"keep me").expect("file should be written");

    let simulator = FakeSimulator::new();
    let table = small_table();
    let events = run(&config, &table, &simulator);

    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        GenerationEvent::Produced {
            path: fixture_path(&config.data_dir, 16.0, &table[1].overrides),
            overrides: table[1].overrides.clone(),
        }
    );
    assert_eq!(fs::read(&unrelated).expect("file should remain"), b"keep me");
}

#[test]
fn out_of_range_index_fails_before_contacting_the_library() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut config = config_for(&temp);
    config.restrict_to(vec![0, 17]);
    let simulator = FakeSimulator::new();

    let error = run_generation(
        &config,
        &option_table(),
        &simulator,
        &BinnedPowerSpectrum::new(),
        |_| {},
    )
    .expect_err("index 17 should be rejected");

    assert_eq!(error.placeholder(), "INPUT.OPTION_INDEX");
    assert_eq!(error.exit_code(), 2);
    assert_eq!(simulator.describe_calls.get(), 0);
    assert!(!config.data_dir.exists());
}

#[test]
fn overrides_reach_their_group_and_globals_carry_the_step_factor() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = config_for(&temp);
    let table = vec![OptionEntry::new(
        13.0,
        [
            ("zprime_step_factor", ParamValue::Float(1.05)),
            ("HMF", ParamValue::Int(0)),
            ("interp_perturb_field", ParamValue::Bool(true)),
        ]
        .into_iter()
        .collect(),
    )];
    let simulator = FakeSimulator::new();

    run(&config, &table, &simulator);

    let calls = simulator.calls.borrow();
    let options = &calls[0].options;
    assert_eq!(options.user_params.get("HMF"), Some(&ParamValue::Int(0)));
    assert_eq!(options.user_params.get("HII_DIM"), Some(&ParamValue::Int(50)));
    assert_eq!(
        options.flag_options.get("USE_TS_FLUCT"),
        Some(&ParamValue::Bool(false))
    );
    assert_eq!(
        options.global_overrides.get("zprime_step_factor"),
        Some(&ParamValue::Float(1.05))
    );
    assert_eq!(options.dropped_keys, vec!["interp_perturb_field".to_string()]);
    assert_eq!(options.random_seed, 12345);
    assert_eq!(
        calls[0].assigned_globals.get("ZPRIME_STEP_FACTOR"),
        Some(&ParamValue::Float(1.04))
    );
    assert_eq!(calls[0].options, calls[1].options);
}
