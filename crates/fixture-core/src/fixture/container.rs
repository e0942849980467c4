use crate::domain::{FixtureError, FixtureResult, Overrides, ParamValue};
use crate::simulation::SimulationProducts;
use hdf5::types::TypeDescriptor;
use hdf5::{Attribute, File};
use std::collections::BTreeMap;
use std::path::Path;

pub const DATASET_NAMES: [&str; 6] = ["power_coeval", "k_coeval", "power_lc", "k_lc", "xHI", "Tb"];

/// Everything a fixture file holds: file-level scalar attributes plus six
/// top-level 1-D datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixtureContents {
    pub attributes: BTreeMap<String, ParamValue>,
    pub power_coeval: Vec<f64>,
    pub k_coeval: Vec<f64>,
    pub power_lc: Vec<f64>,
    pub k_lc: Vec<f64>,
    pub xhi: Vec<f64>,
    pub tb: Vec<f64>,
}

impl FixtureContents {
    pub fn from_products(overrides: &Overrides, products: &SimulationProducts) -> Self {
        let mut attributes = overrides
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        attributes.insert("HII_DIM".to_string(), ParamValue::Int(products.grid.hii_dim));
        attributes.insert("DIM".to_string(), ParamValue::Int(products.grid.dim));
        attributes.insert(
            "BOX_LEN".to_string(),
            ParamValue::Float(products.grid.box_len),
        );

        Self {
            attributes,
            power_coeval: products.coeval_spectrum.power.clone(),
            k_coeval: products.coeval_spectrum.k.clone(),
            power_lc: products.lightcone_spectrum.power.clone(),
            k_lc: products.lightcone_spectrum.k.clone(),
            xhi: products.global_xhi.clone(),
            tb: products.global_brightness_temp.clone(),
        }
    }

    pub fn dataset(&self, name: &str) -> Option<&[f64]> {
        let values = match name {
            "power_coeval" => &self.power_coeval,
            "k_coeval" => &self.k_coeval,
            "power_lc" => &self.power_lc,
            "k_lc" => &self.k_lc,
            "xHI" => &self.xhi,
            "Tb" => &self.tb,
            _ => return None,
        };
        Some(values.as_slice())
    }

    fn dataset_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        match name {
            "power_coeval" => Some(&mut self.power_coeval),
            "k_coeval" => Some(&mut self.k_coeval),
            "power_lc" => Some(&mut self.power_lc),
            "k_lc" => Some(&mut self.k_lc),
            "xHI" => Some(&mut self.xhi),
            "Tb" => Some(&mut self.tb),
            _ => None,
        }
    }

    pub fn write(&self, path: &Path) -> FixtureResult<()> {
        for (name, value) in &self.attributes {
            if matches!(value, ParamValue::Str(_) | ParamValue::Null) {
                return Err(FixtureError::input_validation(
                    "INPUT.FIXTURE_ATTRIBUTE",
                    format!(
                        "attribute '{}' has unsupported value {}; only booleans and numbers are stored",
                        name,
                        value.python_repr()
                    ),
                ));
            }
        }

        let file = File::create(path).map_err(|source| {
            FixtureError::io_system(
                "IO.FIXTURE_CREATE",
                format!("failed to create fixture '{}': {}", path.display(), source),
            )
        })?;
        let write_error = |source: hdf5::Error| {
            FixtureError::io_system(
                "IO.FIXTURE_WRITE",
                format!("failed to write fixture '{}': {}", path.display(), source),
            )
        };

        for (name, value) in &self.attributes {
            let written = match value {
                ParamValue::Bool(flag) => file
                    .new_attr::<bool>()
                    .shape(())
                    .create(name.as_str())
                    .and_then(|attr| attr.write_scalar(flag)),
                ParamValue::Int(number) => file
                    .new_attr::<i64>()
                    .shape(())
                    .create(name.as_str())
                    .and_then(|attr| attr.write_scalar(number)),
                ParamValue::Float(number) => file
                    .new_attr::<f64>()
                    .shape(())
                    .create(name.as_str())
                    .and_then(|attr| attr.write_scalar(number)),
                ParamValue::Str(_) | ParamValue::Null => continue,
            };
            written.map_err(write_error)?;
        }
        for name in DATASET_NAMES {
            let values = self.dataset(name).unwrap_or_default();
            file.new_dataset_builder()
                .with_data(values)
                .create(name)
                .map_err(write_error)?;
        }
        file.close().map_err(write_error)?;
        Ok(())
    }

    pub fn read(path: &Path) -> FixtureResult<Self> {
        let read_error = |source: hdf5::Error| {
            FixtureError::io_system(
                "IO.FIXTURE_READ",
                format!("failed to read fixture '{}': {}", path.display(), source),
            )
        };

        let file = File::open(path).map_err(read_error)?;
        let mut contents = Self::default();
        for name in file.attr_names().map_err(read_error)? {
            let attribute = file.attr(&name).map_err(read_error)?;
            let value = read_attribute(&attribute).ok_or_else(|| {
                FixtureError::computation(
                    "RUN.FIXTURE_ATTRIBUTE",
                    format!(
                        "attribute '{}' in '{}' is not a boolean or numeric scalar",
                        name,
                        path.display()
                    ),
                )
            })?;
            contents.attributes.insert(name, value);
        }

        for name in DATASET_NAMES {
            let missing = || {
                FixtureError::computation(
                    "RUN.FIXTURE_DATASET",
                    format!("fixture '{}' has no 1-D '{}' dataset", path.display(), name),
                )
            };
            let dataset = file.dataset(name).map_err(|_| missing())?;
            if dataset.ndim() != 1 {
                return Err(missing());
            }
            let values = dataset.read_raw::<f64>().map_err(read_error)?;
            if let Some(slot) = contents.dataset_mut(name) {
                *slot = values;
            }
        }

        Ok(contents)
    }
}

fn read_attribute(attribute: &Attribute) -> Option<ParamValue> {
    if !attribute.is_scalar() {
        return None;
    }
    match attribute.dtype().ok()?.to_descriptor().ok()? {
        TypeDescriptor::Boolean => attribute.read_scalar::<bool>().ok().map(ParamValue::Bool),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
            attribute.read_scalar::<i64>().ok().map(ParamValue::Int)
        }
        TypeDescriptor::Float(_) => attribute.read_scalar::<f64>().ok().map(ParamValue::Float),
        _ => None,
    }
}
