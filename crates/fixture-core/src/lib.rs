//! Golden power-spectrum fixtures for simulation integration tests.
//!
//! A fixed table of (redshift, override) pairs is resolved against the
//! simulation library's parameter schema, run through a coeval and a
//! lightcone simulation, reduced to power spectra, and written to one
//! archive per entry.

pub mod domain;
pub mod fixture;
pub mod generation;
pub mod options;
pub mod params;
pub mod simulation;
pub mod spectrum;
