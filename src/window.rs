/*! Window functions

All functions are periodic, not symmetric.(?)

<https://en.wikipedia.org/wiki/Window_function>
<https://en.wikipedia.org/wiki/Spectral_leakage>

The RRC matched filter selects one of six windows (rectangular, Hann,
Hamming, Blackman, Blackman-Harris, flat-top) or a fixed-taper Tukey window;
Tukey's taper fraction is fixed at 0.25 everywhere it's used in this crate.

# Example

```
use packetdsp::window::WindowType;
let window_type = WindowType::Hamming;
let ntaps = 3;
let taps = window_type.make_window(ntaps).0;
assert_eq!(taps.len(), ntaps);

let correct = [0.0869565, 1.0, 0.0869565];
assert_eq!(correct.len(), taps.len());
for (x,y) in taps.iter().zip(correct) {
  assert!((x-y).abs() < 0.1);
}
```
*/
use crate::Float;

const PI: Float = std::f64::consts::PI as Float;

// 0.54 is commonly used, but Hamming's paper sets it as 25/46.
const DEFAULT_HAMMING_PARM: Float = 25.0 / 46.0;

/// Tukey taper fraction used everywhere this crate selects a Tukey window.
pub const TUKEY_ALPHA: Float = 0.25;

/// Window type.
///
/// See <https://en.wikipedia.org/wiki/Window_function>
pub enum WindowType {
    /// Rectangular (no tapering) window.
    Rectangular,

    /// Hann window.
    Hann,

    /// Blackman window.
    Blackman,

    /// Blackman-Harris window.
    BlackmanHarris,

    /// Flat-top window.
    FlatTop,

    /// Tukey window, taper fraction fixed at [`TUKEY_ALPHA`].
    Tukey,

    /// Hamming window.
    Hamming,

    /// Hamming window with a specific a0.
    /// 0.54 is commonly used, but Hamming's paper sets it as 25/46.
    ///
    /// "In the equiripple sense, the optimal values for the
    /// coefficients are a0 = 0.53836 and a1 = 0.46164".
    ///
    /// See wikipedia.
    HammingParm(Float),
}

impl WindowType {
    /// Return max attenuation.
    ///
    /// TODO: More description.
    #[must_use]
    pub fn max_attenuation(&self) -> Float {
        match self {
            WindowType::Rectangular => 21.0,
            WindowType::Hann => 44.0,
            // TODO: what are these magic numbers?
            WindowType::Blackman => 74.0,
            WindowType::BlackmanHarris => 92.0,
            WindowType::FlatTop => 93.0,
            WindowType::Tukey => 46.0,
            WindowType::Hamming => 53.0,
            WindowType::HammingParm(_) => 53.0,
        }
    }

    /// Make a window of a dynamic type.
    #[must_use]
    pub fn make_window(&self, ntaps: usize) -> Window {
        match self {
            WindowType::Rectangular => rectangular(ntaps),
            WindowType::Hann => hann(ntaps),
            WindowType::Blackman => blackman(ntaps),
            WindowType::BlackmanHarris => blackman_harris(ntaps),
            WindowType::FlatTop => flat_top(ntaps),
            WindowType::Tukey => tukey(ntaps, TUKEY_ALPHA),
            WindowType::Hamming => hamming(ntaps, DEFAULT_HAMMING_PARM),
            WindowType::HammingParm(parm) => hamming(ntaps, *parm),
        }
    }
}

/// Window functions are "weights" used for applying filters and other
/// operations.
///
/// <https://en.wikipedia.org/wiki/Window_function>
pub struct Window(pub Vec<Float>);

/// Create a rectangular (unweighted) window.
fn rectangular(ntaps: usize) -> Window {
    Window(vec![1.0; ntaps])
}

/// Create a Hann window.
///
/// <https://en.wikipedia.org/wiki/Window_function#Hann_and_Hamming_windows>
fn hann(m: usize) -> Window {
    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let mf = m as Float;
        let s = (PI * n / mf).sin();
        b.push(s * s);
    }
    Window(b)
}

/// Create a flat-top window (5-term).
///
/// <https://en.wikipedia.org/wiki/Window_function#Flat_top_window>
fn flat_top(m: usize) -> Window {
    const A0: Float = 0.21557895;
    const A1: Float = 0.41663158;
    const A2: Float = 0.277263158;
    const A3: Float = 0.083578947;
    const A4: Float = 0.006947368;

    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let mf = m as Float;
        let t1 = 2.0 * PI * n / mf;
        let t2 = 4.0 * PI * n / mf;
        let t3 = 6.0 * PI * n / mf;
        let t4 = 8.0 * PI * n / mf;
        b.push(A0 - A1 * t1.cos() + A2 * t2.cos() - A3 * t3.cos() + A4 * t4.cos());
    }
    Window(b)
}

/// Create a Tukey (tapered cosine) window with taper fraction `alpha`.
///
/// `alpha == 0` is rectangular; `alpha == 1` is Hann. This crate always
/// calls this with `alpha = 0.25`.
///
/// <https://en.wikipedia.org/wiki/Window_function#Tukey_window>
fn tukey(ntaps: usize, alpha: Float) -> Window {
    if ntaps < 2 {
        return Window(vec![1.0; ntaps]);
    }
    let m = (ntaps - 1) as Float;
    let mut b = Vec::with_capacity(ntaps);
    for n in 0..ntaps {
        let x = n as Float / m;
        let w = if x < alpha / 2.0 {
            0.5 * (1.0 + (PI * (2.0 * x / alpha - 1.0)).cos())
        } else if x <= 1.0 - alpha / 2.0 {
            1.0
        } else {
            0.5 * (1.0 + (PI * (2.0 * x / alpha - 2.0 / alpha + 1.0)).cos())
        };
        b.push(w);
    }
    Window(b)
}

/// Create Hamming window.
///
/// <https://en.wikipedia.org/wiki/Window_function#Hann_and_Hamming_windows>
fn hamming(ntaps: usize, a0: Float) -> Window {
    let a1 = 1.0 - a0;
    let m = (ntaps - 1) as Float;
    Window(
        (0..ntaps)
            .map(|n| a0 - a1 * (2.0 * PI * (n as Float) / m).cos())
            .collect(),
    )
}

/// Create Blackman window.
///
/// <https://en.wikipedia.org/wiki/Window_function#Blackman_window>
fn blackman(m: usize) -> Window {
    // Blackman's "not very serious proposal" magic value: 0.16.
    const A: Float = 0.16;

    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let m = m as Float;

        // Parameters.
        //
        // "exact Blackman" is:
        //   a0 = 7938/18608 ≈ 0.42659
        //   a1 = 9240/18608 ≈ 0.49656
        //   a2 = 1430/18608 ≈ 0.076849
        //
        // The truncated coefficients do not null the sidelobes as
        // well, but have an improved 18 dB/oct fall-off (compared do
        // 6dB for exact).

        let a0 = (1.0 - A) / 2.0;
        let a1 = 0.5;
        let a2 = A / 2.0;

        // Formula.
        let t1 = 2.0 * PI * n / m;
        let t2 = 4.0 * PI * n / m;
        b.push(a0 - a1 * t1.cos() + a2 * t2.cos());
    }
    Window(b)
}

/// Create Blackman-Harris window.
///
/// <https://en.wikipedia.org/wiki/Window_function#Blackman%E2%80%93Harris_window>
fn blackman_harris(m: usize) -> Window {
    // Parameters.
    const A0: Float = 0.35875;
    const A1: Float = 0.48829;
    const A2: Float = 0.14128;
    const A3: Float = 0.01168;

    let mut b = Vec::with_capacity(m);
    for n in 0..m {
        let n = n as Float;
        let m = m as Float;

        // Formula.
        let t1 = 2.0 * PI * n / m;
        let t2 = 4.0 * PI * n / m;
        let t3 = 6.0 * PI * n / m;
        b.push(A0 - A1 * t1.cos() + A2 * t2.cos() - A3 * t3.cos());
    }
    Window(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_is_flat() {
        let w = WindowType::Rectangular.make_window(9).0;
        assert!(w.iter().all(|&x| (x - 1.0).abs() < 1e-6));
    }

    #[test]
    fn hann_endpoints_near_zero() {
        let w = WindowType::Hann.make_window(65).0;
        assert!(w[0].abs() < 1e-6);
        assert!(w[w.len() / 2] > 0.9);
    }

    #[test]
    fn tukey_matches_rectangular_at_center() {
        let w = WindowType::Tukey.make_window(101).0;
        // Center of the taper region should be full amplitude.
        assert!((w[50] - 1.0).abs() < 1e-6);
        // Edges are heavily tapered.
        assert!(w[0] < 0.1);
    }

    #[test]
    fn flat_top_peaks_at_center() {
        let w = WindowType::FlatTop.make_window(101).0;
        let peak = w.iter().cloned().fold(Float::MIN, Float::max);
        assert!((peak - w[50]).abs() < 1e-3);
    }

    #[test]
    fn all_windows_produce_requested_length() {
        for wt in [
            WindowType::Rectangular,
            WindowType::Hann,
            WindowType::Blackman,
            WindowType::BlackmanHarris,
            WindowType::FlatTop,
            WindowType::Tukey,
            WindowType::Hamming,
        ] {
            assert_eq!(wt.make_window(33).0.len(), 33);
        }
    }
}
