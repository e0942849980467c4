//! Isotropic power spectra of 3-D fields.
//!
//! The estimator follows the usual physical normalisation: the discrete
//! transform is scaled by the cell volume, the power is `|FT|^2 / V`, and
//! wavenumbers are angular (`2 pi / L` per mode).

use crate::domain::{FixtureError, FixtureResult};
use ndarray::Array3;
use num_complex::Complex64;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxExtent {
    Cubic(f64),
    Cuboid([f64; 3]),
}

impl BoxExtent {
    pub fn lengths(self) -> [f64; 3] {
        match self {
            Self::Cubic(length) => [length; 3],
            Self::Cuboid(lengths) => lengths,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSpectrum {
    pub power: Vec<f64>,
    pub k: Vec<f64>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

pub trait PowerSpectrumEstimator {
    fn estimate(&self, field: &Array3<f64>, extent: BoxExtent) -> FixtureResult<PowerSpectrum>;
}

/// Spherically averaged spectrum over linearly spaced `|k|` bins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinnedPowerSpectrum {
    bin_count: Option<usize>,
}

impl BinnedPowerSpectrum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bin_count(bin_count: usize) -> Self {
        Self {
            bin_count: Some(bin_count),
        }
    }

    fn bins_for(&self, cell_count: usize) -> usize {
        self.bin_count
            .unwrap_or_else(|| ((cell_count as f64).cbrt() / 2.2) as usize)
            .max(1)
    }
}

impl PowerSpectrumEstimator for BinnedPowerSpectrum {
    fn estimate(&self, field: &Array3<f64>, extent: BoxExtent) -> FixtureResult<PowerSpectrum> {
        let (nx, ny, nz) = field.dim();
        let shape = [nx, ny, nz];
        if shape.iter().any(|n| *n == 0) {
            return Err(FixtureError::computation(
                "RUN.SPECTRUM_EMPTY_FIELD",
                format!("cannot compute a power spectrum of an empty field {:?}", shape),
            ));
        }

        let lengths = extent.lengths();
        if lengths.iter().any(|length| !length.is_finite() || *length <= 0.0) {
            return Err(FixtureError::input_validation(
                "INPUT.SPECTRUM_EXTENT",
                format!("box lengths must be positive and finite, got {:?}", lengths),
            ));
        }

        let volume = lengths.iter().product::<f64>();
        let cell_count = nx * ny * nz;
        let cell_volume = volume / cell_count as f64;

        let mut data = field
            .iter()
            .map(|value| Complex64::new(*value, 0.0))
            .collect::<Vec<_>>();
        for axis in 0..3 {
            transform_axis(&mut data, shape, axis);
        }

        let wavenumbers = [
            axis_wavenumbers(nx, lengths[0]),
            axis_wavenumbers(ny, lengths[1]),
            axis_wavenumbers(nz, lengths[2]),
        ];

        let mut magnitudes = Vec::with_capacity(cell_count);
        let mut powers = Vec::with_capacity(cell_count);
        for (i, kx) in wavenumbers[0].iter().enumerate() {
            for (j, ky) in wavenumbers[1].iter().enumerate() {
                for (l, kz) in wavenumbers[2].iter().enumerate() {
                    let amplitude = data[(i * ny + j) * nz + l] * cell_volume;
                    magnitudes.push((kx * kx + ky * ky + kz * kz).sqrt());
                    powers.push(amplitude.norm_sqr() / volume);
                }
            }
        }

        Ok(spherical_average(&magnitudes, &powers, self.bins_for(cell_count)))
    }
}

fn transform_axis(data: &mut [Complex64], shape: [usize; 3], axis: usize) {
    let n = shape[axis];
    if n <= 1 {
        return;
    }

    let strides = [shape[1] * shape[2], shape[2], 1];
    let (outer, inner) = match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let twiddles = (0..n)
        .map(|step| Complex64::from_polar(1.0, -2.0 * PI * step as f64 / n as f64))
        .collect::<Vec<_>>();

    let mut line = vec![Complex64::new(0.0, 0.0); n];
    let mut transformed = vec![Complex64::new(0.0, 0.0); n];
    for a in 0..shape[outer] {
        for b in 0..shape[inner] {
            let base = a * strides[outer] + b * strides[inner];
            for (m, slot) in line.iter_mut().enumerate() {
                *slot = data[base + m * strides[axis]];
            }
            for (k, out) in transformed.iter_mut().enumerate() {
                *out = line
                    .iter()
                    .enumerate()
                    .map(|(m, value)| value * twiddles[(k * m) % n])
                    .sum();
            }
            for (k, value) in transformed.iter().enumerate() {
                data[base + k * strides[axis]] = *value;
            }
        }
    }
}

fn axis_wavenumbers(n: usize, length: f64) -> Vec<f64> {
    (0..n)
        .map(|index| {
            let frequency = if index <= (n - 1) / 2 {
                index as f64
            } else {
                index as f64 - n as f64
            };
            2.0 * PI * frequency / length
        })
        .collect()
}

fn spherical_average(magnitudes: &[f64], powers: &[f64], bin_count: usize) -> PowerSpectrum {
    let minimum = magnitudes.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = magnitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (maximum - minimum) / bin_count as f64;

    let mut power_sums = vec![0.0; bin_count];
    let mut k_sums = vec![0.0; bin_count];
    let mut counts = vec![0_usize; bin_count];
    for (magnitude, power) in magnitudes.iter().zip(powers) {
        let bin = if width > 0.0 {
            (((magnitude - minimum) / width) as usize).min(bin_count - 1)
        } else {
            0
        };
        power_sums[bin] += power;
        k_sums[bin] += magnitude;
        counts[bin] += 1;
    }

    // One entry per bin; an empty bin keeps its centre and a NaN power.
    let mut spectrum = PowerSpectrum::default();
    for bin in 0..bin_count {
        if counts[bin] == 0 {
            spectrum.power.push(f64::NAN);
            spectrum.k.push(minimum + (bin as f64 + 0.5) * width);
            continue;
        }
        let count = counts[bin] as f64;
        spectrum.power.push(power_sums[bin] / count);
        spectrum.k.push(k_sums[bin] / count);
    }
    spectrum
}
