//! Identity glyph: a spectral fingerprint of the tension history.
//!
//! The tension buffer (oldest first) is zero-padded to the window length and
//! run through a discrete Fourier transform. Only the one-sided spectrum
//! (bins 0..=N/2) is ranked since the input is real and the upper half mirrors it.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Top-`m` frequency bins of the tension spectrum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityGlyph {
    /// (frequency_index, magnitude), descending magnitude, ties by lower index.
    pub spectrum_peaks: Vec<(usize, f64)>,
    /// Number of real (unpadded) tension samples the glyph was formed from.
    pub source_window_size: usize,
}

impl IdentityGlyph {
    /// Form a glyph from `tensions`, padded to `length` samples.
    /// If there are more samples than `length`, the newest `length` are used.
    pub fn from_tensions(tensions: &[f64], length: usize, peaks: usize) -> Self {
        let start = tensions.len().saturating_sub(length);
        let window = &tensions[start..];
        let spectrum = magnitude_spectrum(window, length);

        let mut ranked: Vec<(usize, f64)> = spectrum.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(peaks);

        Self {
            spectrum_peaks: ranked,
            source_window_size: window.len(),
        }
    }

    /// Frequency indices only, in rank order.
    pub fn indices(&self) -> Vec<usize> {
        self.spectrum_peaks.iter().map(|(i, _)| *i).collect()
    }
}

/// One-sided DFT magnitude spectrum of `signal` zero-padded to `length`.
/// Returns `length / 2 + 1` bins. An empty `length` yields no bins.
pub fn magnitude_spectrum(signal: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    let bins = length / 2 + 1;
    (0..bins)
        .map(|k| {
            signal
                .iter()
                .take(length)
                .enumerate()
                .fold(Complex64::new(0.0, 0.0), |acc, (n, &x)| {
                    // Reduce k·n mod N first so the angle stays exact for large windows
                    let phase = ((k * n) % length) as f64 / length as f64;
                    acc + Complex64::from_polar(x, -std::f64::consts::TAU * phase)
                })
                .norm()
        })
        .collect()
}
