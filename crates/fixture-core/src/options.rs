//! The fixed test matrix of (redshift, overrides) pairs.
//!
//! Every redshift stays high enough that the neutral fraction is far from
//! zero; at low redshift numerical noise dominates the comparison.

use crate::domain::{FixtureError, FixtureResult, OptionEntry, Overrides, ParamValue};

fn entry<const N: usize>(redshift: f64, overrides: [(&str, ParamValue); N]) -> OptionEntry {
    OptionEntry::new(redshift, overrides.into_iter().collect::<Overrides>())
}

pub fn option_table() -> Vec<OptionEntry> {
    use ParamValue::{Bool, Float, Int};

    vec![
        entry(12.0, []),
        entry(11.0, [("zprime_step_factor", Float(1.02))]),
        entry(30.0, [("z_heat_max", Int(40))]),
        entry(
            13.0,
            [
                ("zprime_step_factor", Float(1.05)),
                ("z_heat_max", Int(25)),
                ("HMF", Int(0)),
            ],
        ),
        entry(16.0, [("interp_perturb_field", Bool(true))]),
        entry(14.0, [("USE_MASS_DEPENDENT_ZETA", Bool(true))]),
        entry(9.0, [("SUBCELL_RSD", Bool(true))]),
        entry(10.0, [("INHOMO_RECO", Bool(true))]),
        entry(16.0, [("HMF", Int(3)), ("USE_TS_FLUCT", Bool(true))]),
        entry(
            20.0,
            [
                ("z_heat_max", Int(45)),
                ("M_MIN_in_Mass", Bool(true)),
                ("HMF", Int(2)),
            ],
        ),
        entry(35.0, [("USE_FFTW_WISDOM", Bool(true))]),
        entry(
            18.0,
            [
                ("USE_MINI_HALOS", Bool(true)),
                ("USE_MASS_DEPENDENT_ZETA", Bool(true)),
                ("INHOMO_RECO", Bool(true)),
                ("USE_TS_FLUCT", Bool(true)),
                ("zprime_step_factor", Float(1.1)),
                ("USE_FFTW_WISDOM", Bool(true)),
            ],
        ),
        entry(8.0, [("N_THREADS", Int(2))]),
        entry(10.0, [("PHOTON_CONS", Bool(true))]),
        entry(
            12.0,
            [
                ("USE_MASS_DEPENDENT_ZETA", Bool(true)),
                ("PHOTON_CONS", Bool(true)),
                ("z_heat_max", Int(25)),
                ("zprime_step_factor", Float(1.1)),
            ],
        ),
        entry(
            8.0,
            [
                ("USE_MASS_DEPENDENT_ZETA", Bool(true)),
                ("USE_TS_FLUCT", Bool(true)),
                ("INHOMO_RECO", Bool(true)),
                ("PHOTON_CONS", Bool(true)),
                ("z_heat_max", Int(25)),
                ("zprime_step_factor", Float(1.1)),
            ],
        ),
        entry(
            8.0,
            [
                ("N_THREADS", Int(2)),
                ("USE_FFTW_WISDOM", Bool(true)),
                ("USE_MASS_DEPENDENT_ZETA", Bool(true)),
                ("INHOMO_RECO", Bool(true)),
                ("USE_TS_FLUCT", Bool(true)),
                ("PHOTON_CONS", Bool(true)),
                ("z_heat_max", Int(25)),
                ("zprime_step_factor", Float(1.1)),
            ],
        ),
    ]
}

/// Picks entries by index, preserving the requested order and repeats.
pub fn select_entries(table: &[OptionEntry], indices: &[usize]) -> FixtureResult<Vec<OptionEntry>> {
    indices
        .iter()
        .map(|index| {
            table.get(*index).cloned().ok_or_else(|| {
                FixtureError::input_validation(
                    "INPUT.OPTION_INDEX",
                    format!(
                        "option index {} is out of range for a table of {} entries",
                        index,
                        table.len()
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{option_table, select_entries};
    use crate::domain::ParamValue;

    #[test]
    fn table_starts_with_the_plain_redshift_twelve_run() {
        let table = option_table();
        assert_eq!(table.len(), 17);
        assert_eq!(table[0].redshift, 12.0);
        assert!(table[0].overrides.is_empty());
        assert_eq!(
            table[3].overrides.get("HMF"),
            Some(&ParamValue::Int(0))
        );
    }

    #[test]
    fn every_redshift_stays_in_the_high_redshift_regime() {
        assert!(option_table().iter().all(|entry| entry.redshift >= 8.0));
    }

    #[test]
    fn selection_preserves_requested_order() {
        let table = option_table();
        let selected = select_entries(&table, &[2, 0]).expect("indices should resolve");
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].redshift, 30.0);
        assert_eq!(selected[1].redshift, 12.0);
    }

    #[test]
    fn out_of_range_selection_is_an_input_error() {
        let table = option_table();
        let error = select_entries(&table, &[0, 17]).expect_err("index 17 should be rejected");
        assert_eq!(error.placeholder(), "INPUT.OPTION_INDEX");
        assert_eq!(error.exit_code(), 2);
    }
}
