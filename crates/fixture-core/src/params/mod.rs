mod globals;

pub use globals::GlobalParams;

use crate::domain::{ParamMap, ParamValue, Overrides};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SEED: u64 = 12345;
pub const DEFAULT_ZPRIME_STEP_FACTOR: f64 = 1.04;
pub const INTERP_PERTURB_FIELD_KEY: &str = "use_interp_perturb_field";

pub fn default_user_params() -> [(&'static str, ParamValue); 3] {
    [
        ("HII_DIM", ParamValue::Int(50)),
        ("DIM", ParamValue::Int(150)),
        ("BOX_LEN", ParamValue::Int(100)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterGroup {
    FlagOptions,
    AstroParams,
    CosmoParams,
    UserParams,
}

impl ParameterGroup {
    pub const ALL: [ParameterGroup; 4] = [
        Self::FlagOptions,
        Self::AstroParams,
        Self::CosmoParams,
        Self::UserParams,
    ];

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::FlagOptions => "flag_options",
            Self::AstroParams => "astro_params",
            Self::CosmoParams => "cosmo_params",
            Self::UserParams => "user_params",
        }
    }
}

/// Default values for each structured parameter group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub flag_options: ParamMap,
    #[serde(default)]
    pub astro_params: ParamMap,
    #[serde(default)]
    pub cosmo_params: ParamMap,
    #[serde(default)]
    pub user_params: ParamMap,
}

impl ParameterSchema {
    pub fn defaults(&self, group: ParameterGroup) -> &ParamMap {
        match group {
            ParameterGroup::FlagOptions => &self.flag_options,
            ParameterGroup::AstroParams => &self.astro_params,
            ParameterGroup::CosmoParams => &self.cosmo_params,
            ParameterGroup::UserParams => &self.user_params,
        }
    }

    pub fn knows(&self, key: &str) -> bool {
        ParameterGroup::ALL
            .iter()
            .any(|group| self.defaults(*group).contains_key(key))
    }
}

/// The keyword set handed to both simulation entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRunOptions {
    pub redshift: f64,
    pub flag_options: ParamMap,
    pub astro_params: ParamMap,
    pub cosmo_params: ParamMap,
    pub user_params: ParamMap,
    pub use_interp_perturb_field: ParamValue,
    pub random_seed: u64,
    pub global_overrides: Overrides,
    pub dropped_keys: Vec<String>,
}

impl ResolvedRunOptions {
    pub fn group(&self, group: ParameterGroup) -> &ParamMap {
        match group {
            ParameterGroup::FlagOptions => &self.flag_options,
            ParameterGroup::AstroParams => &self.astro_params,
            ParameterGroup::CosmoParams => &self.cosmo_params,
            ParameterGroup::UserParams => &self.user_params,
        }
    }

    pub fn to_kwargs(&self) -> Map<String, Value> {
        let mut kwargs = Map::new();
        kwargs.insert("redshift".to_string(), Value::from(self.redshift));
        for group in ParameterGroup::ALL {
            kwargs.insert(group.keyword().to_string(), json_value(self.group(group)));
        }
        kwargs.insert(
            INTERP_PERTURB_FIELD_KEY.to_string(),
            json_value(&self.use_interp_perturb_field),
        );
        kwargs.insert("random_seed".to_string(), Value::from(self.random_seed));
        for (key, value) in self.global_overrides.iter() {
            kwargs.insert(key.to_string(), json_value(value));
        }
        kwargs
    }
}

fn json_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn resolve_group(defaults: &ParamMap, overrides: &Overrides) -> ParamMap {
    defaults
        .iter()
        .map(|(key, default)| {
            let value = overrides.get(key).unwrap_or(default).clone();
            (key.clone(), value)
        })
        .collect()
}

pub fn resolve_run_options(
    redshift: f64,
    overrides: &Overrides,
    schema: &ParameterSchema,
    globals: &GlobalParams,
) -> ResolvedRunOptions {
    let mut user_params = resolve_group(&schema.user_params, overrides);
    for (key, value) in default_user_params() {
        user_params.insert(key.to_string(), value);
    }

    let global_overrides = overrides
        .iter()
        .filter(|(key, _)| globals.contains_key(key))
        .map(|(key, value)| (key, value.clone()))
        .collect::<Overrides>();

    let dropped_keys = overrides
        .keys()
        .filter(|key| {
            !schema.knows(key) && !globals.contains_key(key) && *key != INTERP_PERTURB_FIELD_KEY
        })
        .map(str::to_string)
        .collect();

    ResolvedRunOptions {
        redshift,
        flag_options: resolve_group(&schema.flag_options, overrides),
        astro_params: resolve_group(&schema.astro_params, overrides),
        cosmo_params: resolve_group(&schema.cosmo_params, overrides),
        user_params,
        use_interp_perturb_field: overrides
            .get(INTERP_PERTURB_FIELD_KEY)
            .cloned()
            .unwrap_or(ParamValue::Bool(false)),
        random_seed: SEED,
        global_overrides,
        dropped_keys,
    }
}
