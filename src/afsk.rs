/*! AFSK (audio frequency-shift keying) demodulator.

Band-pass filters the input, correlates it against sin/cos pairs at the
mark and space tones, and outputs `sqrt(I_m^2+Q_m^2) - space_gain *
sqrt(I_s^2+Q_s^2)` low-pass filtered: positive for mark, negative for
space.
*/

use crate::Float;
use crate::fir::{Fir, band_pass, low_pass};

/// AFSK demodulator configuration.
#[derive(Clone, Debug)]
pub struct AfskConfig {
    /// Input sample rate, Hz.
    pub sample_rate: Float,
    /// Mark tone frequency, Hz.
    pub mark_freq: Float,
    /// Space tone frequency, Hz.
    pub space_freq: Float,
    /// Symbol (baud) rate.
    pub baud_rate: Float,
    /// Correlator length, in symbol periods.
    pub correlator_span: Float,
    /// Frequency offset added to both correlator tones, Hz.
    pub freq_offset: Float,
    /// Gain applied to the space correlator output, to compensate for
    /// transmitter pre-emphasis.
    pub space_gain: Float,
    /// Output low-pass cutoff, Hz.
    pub output_lpf_cutoff: Float,
}

impl AfskConfig {
    /// 1200 baud preset: 1200/2200 Hz tones.
    pub fn preset_1200(sample_rate: Float) -> Self {
        Self {
            sample_rate,
            mark_freq: 1200.0,
            space_freq: 2200.0,
            baud_rate: 1200.0,
            correlator_span: 1.0,
            freq_offset: 0.0,
            space_gain: 1.0,
            output_lpf_cutoff: 1200.0,
        }
    }

    /// 300 baud preset: 1600/1800 Hz tones.
    pub fn preset_300(sample_rate: Float) -> Self {
        Self {
            sample_rate,
            mark_freq: 1600.0,
            space_freq: 1800.0,
            baud_rate: 300.0,
            correlator_span: 1.0,
            freq_offset: 0.0,
            space_gain: 1.0,
            output_lpf_cutoff: 300.0,
        }
    }

    /// A config at an arbitrary baud rate, for configuration values outside
    /// the named 300/1200 presets: mark/space tones are spaced one baud
    /// apart, centered on the usual 1700 Hz voice-band audio carrier.
    pub fn generic(sample_rate: Float, baud_rate: Float) -> Self {
        Self {
            sample_rate,
            mark_freq: 1700.0 - baud_rate / 2.0,
            space_freq: 1700.0 + baud_rate / 2.0,
            baud_rate,
            correlator_span: 1.0,
            freq_offset: 0.0,
            space_gain: 1.0,
            output_lpf_cutoff: baud_rate,
        }
    }
}

struct Correlator {
    sin: Fir<Float>,
    cos: Fir<Float>,
}

impl Correlator {
    fn new(freq: Float, sample_rate: Float, len: usize) -> Self {
        let pi = std::f64::consts::PI as Float;
        let sin: Vec<Float> = (0..len)
            .map(|n| (2.0 * pi * freq * n as Float / sample_rate).sin())
            .collect();
        let cos: Vec<Float> = (0..len)
            .map(|n| (2.0 * pi * freq * n as Float / sample_rate).cos())
            .collect();
        Self {
            sin: Fir::new(&sin),
            cos: Fir::new(&cos),
        }
    }

    fn magnitude(&self, input: &[Float]) -> Vec<Float> {
        let i = self.sin.filter_n(input);
        let q = self.cos.filter_n(input);
        i.iter().zip(q.iter()).map(|(&i, &q)| (i * i + q * q).sqrt()).collect()
    }
}

/// AFSK demodulator.
pub struct AfskDemod {
    config: AfskConfig,
    bandpass: Fir<Float>,
    mark: Correlator,
    space: Correlator,
    output_lpf: Fir<Float>,
}

impl AfskDemod {
    /// Build a demodulator, generating the band-pass, correlator, and
    /// output low-pass taps from `config`.
    pub fn new(config: AfskConfig) -> Self {
        let low = config.mark_freq.min(config.space_freq) - config.baud_rate;
        let high = config.mark_freq.max(config.space_freq) + config.baud_rate;
        let bandpass_taps = band_pass(config.sample_rate, low.max(1.0), high, config.baud_rate);
        let correlator_len =
            ((config.correlator_span * config.sample_rate / config.baud_rate) as usize).max(1);
        let mark = Correlator::new(config.mark_freq + config.freq_offset, config.sample_rate, correlator_len);
        let space = Correlator::new(config.space_freq + config.freq_offset, config.sample_rate, correlator_len);
        let output_lpf_taps = low_pass(config.sample_rate, config.output_lpf_cutoff, config.baud_rate);
        Self {
            config,
            bandpass: Fir::new(&bandpass_taps),
            mark,
            space,
            output_lpf: Fir::new(&output_lpf_taps),
        }
    }

    /// Demodulate a buffer of real samples into soft symbols: positive for
    /// mark, negative for space.
    pub fn demod(&self, input: &[Float]) -> Vec<Float> {
        let bp = self.bandpass.filter_n(input);
        let im = self.mark.magnitude(&bp);
        let is = self.space.magnitude(&bp);
        let n = im.len().min(is.len());
        let diff: Vec<Float> = (0..n)
            .map(|i| im[i] - self.config.space_gain * is[i])
            .collect();
        self.output_lpf.filter_n(&diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: Float, sample_rate: Float, n: usize) -> Vec<Float> {
        let pi = std::f64::consts::PI as Float;
        (0..n).map(|i| (2.0 * pi * freq * i as Float / sample_rate).sin()).collect()
    }

    #[test]
    fn mark_tone_demodulates_positive() {
        let sample_rate = 9600.0;
        let demod = AfskDemod::new(AfskConfig::preset_1200(sample_rate));
        let input = tone(1200.0, sample_rate, 4000);
        let out = demod.demod(&input);
        assert!(!out.is_empty());
        let mean: Float = out[out.len() / 2..].iter().sum::<Float>() / (out.len() / 2) as Float;
        assert!(mean > 0.0, "mark tone should demodulate positive, got {mean}");
    }

    #[test]
    fn space_tone_demodulates_negative() {
        let sample_rate = 9600.0;
        let demod = AfskDemod::new(AfskConfig::preset_1200(sample_rate));
        let input = tone(2200.0, sample_rate, 4000);
        let out = demod.demod(&input);
        assert!(!out.is_empty());
        let mean: Float = out[out.len() / 2..].iter().sum::<Float>() / (out.len() / 2) as Float;
        assert!(mean < 0.0, "space tone should demodulate negative, got {mean}");
    }
}
