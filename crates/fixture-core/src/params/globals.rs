use crate::domain::{ParamMap, ParamValue};
use std::collections::BTreeSet;

/// Case-insensitive view over the library's global parameters.
///
/// Values assigned through [`GlobalParams::set`] are tracked so the invoker
/// can forward them to every simulation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalParams {
    entries: Vec<(String, ParamValue)>,
    assigned: BTreeSet<String>,
}

impl GlobalParams {
    pub fn from_defaults(defaults: ParamMap) -> Self {
        Self {
            entries: defaults.into_iter().collect(),
            assigned: BTreeSet::new(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.position(key).map(|index| &self.entries[index].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Assigns a value, reusing the stored spelling of an existing key.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        let name = match self.position(key) {
            Some(index) => {
                self.entries[index].1 = value;
                self.entries[index].0.clone()
            }
            None => {
                self.entries.push((key.to_string(), value));
                key.to_string()
            }
        };
        self.assigned.insert(name);
    }

    pub fn assigned(&self) -> ParamMap {
        self.entries
            .iter()
            .filter(|(key, _)| self.assigned.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(key))
    }
}

#[cfg(test)]
mod tests {
    use super::GlobalParams;
    use crate::domain::{ParamMap, ParamValue};

    fn defaults() -> ParamMap {
        [
            ("ZPRIME_STEP_FACTOR".to_string(), ParamValue::Float(1.02)),
            ("Z_HEAT_MAX".to_string(), ParamValue::Float(35.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn lookups_ignore_case() {
        let params = GlobalParams::from_defaults(defaults());
        assert!(params.contains_key("zprime_step_factor"));
        assert!(params.contains_key("Z_Heat_Max"));
        assert!(!params.contains_key("HII_DIM"));
        assert_eq!(params.get("z_heat_max"), Some(&ParamValue::Float(35.0)));
    }

    #[test]
    fn assignments_keep_canonical_names_and_are_tracked() {
        let mut params = GlobalParams::from_defaults(defaults());
        assert!(params.assigned().is_empty());

        params.set("zprime_step_factor", 1.04);
        let assigned = params.assigned();
        assert_eq!(assigned.len(), 1);
        assert_eq!(
            assigned.get("ZPRIME_STEP_FACTOR"),
            Some(&ParamValue::Float(1.04))
        );
        assert_eq!(params.keys().count(), 2);
    }
}
