/*! Automatic gain control.

Tracks a running envelope with independent attack and decay rates (plus a
sustain timer that holds the envelope at its last peak for a while before
decay resumes) and rescales samples so the envelope sits at `target`.

Two envelope-detector variants are provided: a simple absolute-value peak
detector (the default, suitable for signals that are already roughly
zero-mean and symmetric), and a dual positive/negative envelope detector
that tracks the positive and negative excursions independently before
averaging them — useful for discriminator outputs that can carry a small
DC offset.
*/

use crate::Float;

/// Envelope detector variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detector {
    /// Track `|sample|` directly.
    Peak,
    /// Track positive and negative excursions independently, then average.
    DualEnvelope,
}

/// Automatic gain control.
pub struct Agc {
    target: Float,
    scaled_attack_rate: Float,
    scaled_decay_rate: Float,
    sustain_samples: u32,
    detector: Detector,

    normal: Float,
    envelope: Float,
    envelope_pos: Float,
    envelope_neg: Float,
    hold_counter: u32,
    hold_counter_pos: u32,
    hold_counter_neg: u32,
}

impl Agc {
    /// Create a new AGC.
    ///
    /// `attack_rate`/`decay_rate` are normalized to full scale per second;
    /// `sample_rate` converts them to a per-sample increment. `sustain_time`
    /// (seconds) holds the envelope at its last peak before decay resumes.
    pub fn new(
        target: Float,
        attack_rate: Float,
        decay_rate: Float,
        sustain_time: Float,
        sample_rate: Float,
        detector: Detector,
    ) -> Self {
        Self {
            target,
            scaled_attack_rate: attack_rate / sample_rate,
            scaled_decay_rate: decay_rate / sample_rate,
            sustain_samples: (sustain_time * sample_rate).max(0.0) as u32,
            detector,
            normal: 1.0,
            envelope: 0.0,
            envelope_pos: 0.0,
            envelope_neg: 0.0,
            hold_counter: 0,
            hold_counter_pos: 0,
            hold_counter_neg: 0,
        }
    }

    /// Current envelope estimate.
    pub fn envelope(&self) -> Float {
        self.envelope
    }

    /// Feed one sample through the configured detector, update the
    /// envelope, and return the gain-corrected sample. Scales against
    /// whatever `normal` is currently in effect (1.0 unless an [`Self::apply`]
    /// call over a buffer has set it from that buffer's peak).
    pub fn step(&mut self, sample: Float) -> Float {
        match self.detector {
            Detector::Peak => self.peak_detect(sample),
            Detector::DualEnvelope => self.dual_envelope_detect(sample),
        }
    }

    fn peak_detect(&mut self, sample: Float) -> Float {
        let mag = sample.abs();
        if mag > self.envelope {
            self.envelope += self.scaled_attack_rate * self.normal;
            if self.envelope > mag {
                self.envelope = mag;
            }
            self.hold_counter = self.sustain_samples;
        } else if self.hold_counter > 0 {
            self.hold_counter -= 1;
        } else {
            self.envelope -= self.scaled_decay_rate * self.normal;
            if self.envelope < 0.0 {
                self.envelope = 0.0;
            }
        }
        self.scale(sample)
    }

    fn dual_envelope_detect(&mut self, sample: Float) -> Float {
        let pos = sample.max(0.0);
        let neg = (-sample).max(0.0);

        if pos > self.envelope_pos {
            self.envelope_pos += self.scaled_attack_rate * self.normal;
            if self.envelope_pos > pos {
                self.envelope_pos = pos;
            }
            self.hold_counter_pos = self.sustain_samples;
        } else if self.hold_counter_pos > 0 {
            self.hold_counter_pos -= 1;
        } else {
            self.envelope_pos -= self.scaled_decay_rate * self.normal;
            if self.envelope_pos < 0.0 {
                self.envelope_pos = 0.0;
            }
        }

        if neg > self.envelope_neg {
            self.envelope_neg += self.scaled_attack_rate * self.normal;
            if self.envelope_neg > neg {
                self.envelope_neg = neg;
            }
            self.hold_counter_neg = self.sustain_samples;
        } else if self.hold_counter_neg > 0 {
            self.hold_counter_neg -= 1;
        } else {
            self.envelope_neg -= self.scaled_decay_rate * self.normal;
            if self.envelope_neg < 0.0 {
                self.envelope_neg = 0.0;
            }
        }

        self.envelope = (self.envelope_pos + self.envelope_neg) / 2.0;
        self.scale(sample)
    }

    fn scale(&self, sample: Float) -> Float {
        if self.envelope > 0.0 {
            self.target * sample / self.envelope
        } else {
            sample
        }
    }

    /// Apply the AGC over a whole buffer, sample by sample. `normal` (the
    /// buffer's peak absolute value) is recomputed from `buffer` first, so
    /// the attack/decay rates scale to this buffer's actual amplitude
    /// before any sample in it is processed.
    pub fn apply(&mut self, buffer: &[Float]) -> Vec<Float> {
        self.normal = buffer.iter().fold(0.0, |acc: Float, &x| acc.max(x.abs()));
        buffer.iter().map(|&x| self.step(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_target_amplitude() {
        let mut agc = Agc::new(1.0, 10.0, 1.0, 0.0, 48000.0, Detector::Peak);
        let n = 20000;
        let input: Vec<Float> = (0..n)
            .map(|i| 0.1 * (2.0 * std::f64::consts::PI as Float * 1000.0 * i as Float / 48000.0).sin())
            .collect();
        let out = agc.apply(&input);
        let peak = out[n / 2..].iter().cloned().fold(0.0, |a: Float, b| a.max(b.abs()));
        assert!((peak - 1.0).abs() < 0.1, "peak {peak} not near target");
    }

    #[test]
    fn dual_envelope_handles_dc_offset() {
        let mut agc = Agc::new(1.0, 10.0, 1.0, 0.0, 48000.0, Detector::DualEnvelope);
        let n = 20000;
        let input: Vec<Float> = (0..n)
            .map(|i| 0.3 + 0.1 * (2.0 * std::f64::consts::PI as Float * 500.0 * i as Float / 48000.0).sin())
            .collect();
        let out = agc.apply(&input);
        assert!(out.last().unwrap().is_finite());
    }
}
