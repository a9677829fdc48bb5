/*! Hilbert transform.

Used by the MPSK demodulator to complex-ify a real band-pass signal: the
imaginary branch comes from a Hilbert FIR, the real branch from a matched
delay line so both branches carry the same group delay.

[Wikipedia][wiki] has a bunch of math, but one use case for it is to
convert floating point values (think audio waveform) into upper sideband.

[wiki]: https://en.wikipedia.org/wiki/Hilbert_transform
*/

use crate::Complex;
use crate::Float;
use crate::fir::Fir;
use crate::window::WindowType;

/// Hilbert transformer: produces a complex analytic signal from a real
/// input, via a Hilbert FIR (imaginary branch) and a matched delay line
/// (real branch).
pub struct Hilbert {
    imag: Fir<Float>,
    real_delay: Fir<Float>,
    ntaps: usize,
}

impl Hilbert {
    /// Create a new Hilbert transformer with `ntaps` taps (must be odd)
    /// shaped by `window_type`.
    pub fn new(ntaps: usize, window_type: &WindowType) -> Self {
        assert!(ntaps & 1 == 1, "hilbert filter len must be odd");
        let taps = crate::fir::hilbert(&window_type.make_window(ntaps).0);
        let k = ntaps / 2;
        let mut delay_taps = vec![0.0 as Float; k + 1];
        delay_taps[0] = 1.0;
        Self {
            imag: Fir::new(&taps),
            real_delay: Fir::new(&delay_taps),
            ntaps,
        }
    }

    /// Number of taps in the Hilbert (imaginary) branch.
    pub fn len(&self) -> usize {
        self.ntaps
    }

    /// True if constructed with zero taps (never happens in practice;
    /// `ntaps` must be odd and positive).
    pub fn is_empty(&self) -> bool {
        self.ntaps == 0
    }

    /// Produce the analytic (complex) signal for `input`.
    ///
    /// The real branch is delay-aligned to the Hilbert branch's group
    /// delay, so both outputs have the same valid-region length.
    pub fn process(&self, input: &[Float]) -> Vec<Complex> {
        let re = self.real_delay.filter_n(input);
        let im = self.imag.filter_n(input);

        use rayon::prelude::*;
        let n = re.len().min(im.len());
        (0..n)
            .into_par_iter()
            .map(|i| Complex::new(re[i], im[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_matches_valid_region() {
        let h = Hilbert::new(21, &WindowType::Hann);
        let input: Vec<Float> = (0..1000).map(|i| (i as Float * 0.1).sin()).collect();
        let out = h.process(&input);
        assert_eq!(out.len(), input.len() - 21 + 1);
    }

    #[test]
    fn sine_input_produces_quadrature_output() {
        // A real sine at a frequency well within the Hilbert's passband
        // should produce roughly constant magnitude I/Q, i.e. an analytic
        // signal tracing a circle.
        let h = Hilbert::new(65, &WindowType::Hann);
        let freq = 0.05; // cycles/sample
        let n = 2000;
        let input: Vec<Float> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI as Float * freq * i as Float).sin())
            .collect();
        let out = h.process(&input);
        let mags: Vec<Float> = out[out.len() / 4..3 * out.len() / 4]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect();
        let mean: Float = mags.iter().sum::<Float>() / mags.len() as Float;
        for m in &mags {
            assert!(
                (m - mean).abs() / mean < 0.25,
                "magnitude not stable: {m} vs mean {mean}"
            );
        }
    }
}
