/*! Finite impulse response filtering.

A fixed tap array convolved against an input buffer in "valid" mode: for
`taps.len() == k` and `input.len() == n`, `filter_n` returns `n - k + 1`
output samples, one per fully-overlapping window.

This module also carries the window-method tap generators used throughout
the DSP layer: plain low-pass/band-pass taps (Hamming window, used to tune
the AFSK/PSK/FSK input filters) and the root-raised-cosine matched filter
used by the PSK demodulators.
*/

use crate::Float;
use crate::window::WindowType;

/// A fixed-tap FIR filter.
///
/// Taps are stored time-reversed so `filter` can walk both arrays forward.
#[derive(Clone)]
pub struct Fir<T> {
    taps: Vec<T>,
}

impl<T> Fir<T>
where
    T: Copy + Default + std::ops::Mul<T, Output = T> + std::ops::Add<T, Output = T>,
{
    /// Build a filter from taps, given newest-sample-last (natural order).
    pub fn new(taps: &[T]) -> Self {
        Self {
            taps: taps.iter().copied().rev().collect(),
        }
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// True if this filter has no taps.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Filter a single output sample from the start of `input`.
    ///
    /// `input` must have at least `self.len()` samples.
    pub fn filter(&self, input: &[T]) -> T {
        input
            .iter()
            .take(self.taps.len())
            .enumerate()
            .fold(T::default(), |acc, (i, x)| acc + *x * self.taps[i])
    }

    /// Filter the whole buffer, valid region only.
    ///
    /// Returns `input.len() - taps.len() + 1` samples, or an empty vec if
    /// `input` is shorter than the tap count.
    pub fn filter_n(&self, input: &[T]) -> Vec<T> {
        if input.len() < self.taps.len() {
            return Vec::new();
        }
        let n = input.len() - self.taps.len() + 1;
        (0..n).map(|i| self.filter(&input[i..])).collect()
    }
}

/// Generate low-pass taps by the window method (Hamming window, matching
/// the classic `firwin`-style transition-width formula).
pub fn low_pass(samp_rate: Float, cutoff: Float, twidth: Float) -> Vec<Float> {
    let pi = std::f64::consts::PI as Float;
    let ntaps = {
        let a: Float = 53.0; // Hamming stopband attenuation constant.
        let t = (a * samp_rate / (22.0 * twidth)) as usize;
        if (t & 1) == 0 { t + 1 } else { t }
    };
    sinc_lowpass_taps(samp_rate, cutoff, ntaps)
}

/// Generate band-pass taps by modulating a low-pass prototype up to the
/// band center (the standard window-method band-pass construction).
pub fn band_pass(samp_rate: Float, low_cutoff: Float, high_cutoff: Float, twidth: Float) -> Vec<Float> {
    let pi = std::f64::consts::PI as Float;
    let half_bw = (high_cutoff - low_cutoff) / 2.0;
    let center = (high_cutoff + low_cutoff) / 2.0;
    let proto = low_pass(samp_rate, half_bw, twidth);
    let m = (proto.len() - 1) as Float / 2.0;
    proto
        .iter()
        .enumerate()
        .map(|(n, &t)| t * (2.0 * pi * center * (n as Float - m) / samp_rate).cos() * 2.0)
        .collect()
}

/// Build normalized sinc low-pass taps with a Hamming window at a given,
/// already-decided odd tap count.
fn sinc_lowpass_taps(samp_rate: Float, cutoff: Float, ntaps: usize) -> Vec<Float> {
    let pi = std::f64::consts::PI as Float;
    let mut taps = vec![Float::default(); ntaps];
    let window: Vec<Float> = {
        let m = (ntaps - 1) as Float;
        (0..ntaps)
            .map(|n| 0.54 - 0.46 * (2.0 * pi * (n as Float) / m).cos())
            .collect()
    };
    let m = (ntaps - 1) / 2;
    let fwt0 = 2.0 * pi * cutoff / samp_rate;
    for nm in 0..ntaps {
        let n = nm as i64 - m as i64;
        let nf = n as Float;
        taps[nm] = if n == 0 {
            fwt0 / pi * window[nm]
        } else {
            ((nf * fwt0).sin() / (nf * pi)) * window[nm]
        };
    }
    let gain = {
        let mut fmax = taps[m];
        for n in 1..=m {
            fmax += 2.0 * taps[n + m];
        }
        1.0 / fmax
    };
    taps.into_iter().map(|t| t * gain).collect()
}

/// Generate Hilbert transformer taps: odd tap count, coefficient `2/(pi*n)`
/// at odd offsets from center, zero at even offsets, shaped by `window`
/// (which must have the same length as the requested tap count).
pub fn hilbert(window: &[Float]) -> Vec<Float> {
    let ntaps = window.len();
    assert!(ntaps & 1 == 1, "hilbert filter len must be odd");
    let pi = std::f64::consts::PI as Float;
    let m = (ntaps / 2) as i64;
    (0..ntaps)
        .map(|i| {
            let n = i as i64 - m;
            let coeff = if n == 0 {
                0.0
            } else if n & 1 == 0 {
                0.0
            } else {
                2.0 / (pi * n as Float)
            };
            coeff * window[i]
        })
        .collect()
}

/// Generate root-raised-cosine matched-filter taps.
///
/// `samples_per_symbol` is the symbol period in samples (`T` in the
/// standard RRC formula); `ntaps` must be odd; `rolloff` (`beta`) is in
/// `(0, 1]`. Taps are shaped by `window` and normalized to unit L2 norm.
/// Samples that land exactly on the `t = ±T/(4*beta)` singularity use the
/// closed-form limit instead of dividing by zero.
pub fn root_raised_cosine(
    samples_per_symbol: Float,
    ntaps: usize,
    rolloff: Float,
    window_type: &WindowType,
) -> Vec<Float> {
    assert!(ntaps & 1 == 1, "RRC filter len must be odd");
    let pi = std::f64::consts::PI as Float;
    let t_sym = samples_per_symbol;
    let m = (ntaps / 2) as i64;
    let window = window_type.make_window(ntaps);

    let mut taps: Vec<Float> = (0..ntaps)
        .map(|i| {
            let n = i as i64 - m;
            let t = n as Float;
            let denom_limit = t_sym / (4.0 * rolloff);
            if rolloff > 0.0 && (t.abs() - denom_limit).abs() < 1e-6 {
                // Limit form at the t = ±T/(4*beta) singularity.
                (pi / (4.0 * t_sym))
                    * ((1.0 + 2.0 / pi) * (pi / (4.0 * rolloff)).sin()
                        + (1.0 - 2.0 / pi) * (pi / (4.0 * rolloff)).cos())
            } else if t == 0.0 {
                (1.0 / t_sym) * (1.0 - rolloff + 4.0 * rolloff / pi)
            } else {
                let num = (pi * t * (1.0 - rolloff) / t_sym).sin()
                    + 4.0 * rolloff * t / t_sym * (pi * t * (1.0 + rolloff) / t_sym).cos();
                let den = pi * t / t_sym * (1.0 - (4.0 * rolloff * t / t_sym).powi(2)) * t_sym;
                num / den
            }
        })
        .collect();

    for (t, w) in taps.iter_mut().zip(window.0.iter()) {
        *t *= w;
    }

    let norm = taps.iter().map(|&x| x * x).sum::<Float>().sqrt();
    if norm > 0.0 {
        for t in taps.iter_mut() {
            *t /= norm;
        }
    }
    taps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Complex;

    #[test]
    fn complex_filter() {
        let input = vec![
            Complex::new(1.0, 0.0),
            Complex::new(2.0, 0.0),
            Complex::new(3.0, 0.2),
            Complex::new(4.1, 0.0),
            Complex::new(5.0, 0.0),
            Complex::new(6.0, 0.2),
        ];
        let taps = vec![
            Complex::new(0.1, 0.0),
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 0.2),
        ];
        let filter = Fir::new(&taps);
        let out = filter.filter_n(&input);
        assert_eq!(out.len(), input.len() - taps.len() + 1);
        assert!((out[0] - Complex::new(2.3, 0.22)).norm() < 0.01);
    }

    #[test]
    fn low_pass_is_odd_length_and_normalized_dc_gain() {
        let taps = low_pass(10000.0, 1000.0, 1000.0);
        assert_eq!(taps.len() % 2, 1);
        let dc_gain: Float = taps.iter().sum();
        assert!((dc_gain - 1.0).abs() < 0.01);
    }

    #[test]
    fn band_pass_rejects_dc() {
        let taps = band_pass(48000.0, 1000.0, 2000.0, 200.0);
        let dc_gain: Float = taps.iter().sum::<Float>().abs();
        assert!(dc_gain < 0.1);
    }

    #[test]
    fn hilbert_taps_are_antisymmetric_and_zero_at_even_offsets() {
        let window = WindowType::Hann.make_window(21).0;
        let taps = hilbert(&window);
        assert_eq!(taps.len(), 21);
        assert_eq!(taps[10], 0.0); // center tap (n=0) is always zero.
        assert_eq!(taps[9], 0.0); // even offset from center.
        for i in 0..taps.len() {
            let j = taps.len() - 1 - i;
            assert!((taps[i] + taps[j]).abs() < 1e-6, "not antisymmetric at {i}");
        }
    }

    #[test]
    fn rrc_taps_are_unit_l2_normalized() {
        let taps = root_raised_cosine(8.0, 65, 0.35, &WindowType::Hamming);
        let norm = taps.iter().map(|&x| x * x).sum::<Float>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rrc_taps_are_symmetric() {
        let taps = root_raised_cosine(8.0, 65, 0.35, &WindowType::Hamming);
        for i in 0..taps.len() {
            let j = taps.len() - 1 - i;
            assert!((taps[i] - taps[j]).abs() < 1e-5, "not symmetric at {i}");
        }
    }
}
