/*! BPSK/QPSK/MPSK demodulation via a Costas loop.

Band-pass filters and AGCs the input, locks an NCO to the carrier via a
phase-error-driven PI controller, and matched-filters the resulting I/Q
branches with an RRC filter.
*/

use crate::Complex;
use crate::Float;
use crate::agc::{Agc, Detector};
use crate::fir::{Fir, band_pass, root_raised_cosine};
use crate::hilbert::Hilbert;
use crate::iir::OnePoleIir;
use crate::nco::Nco;
use crate::phase_detector::PhaseDetector;
use crate::pi_control::{Overflow, PiControl};
use crate::window::WindowType;

/// Shared PSK demodulator tuning parameters.
#[derive(Clone, Debug)]
pub struct PskConfig {
    /// Input sample rate, Hz.
    pub sample_rate: Float,
    /// Suppressed carrier frequency, Hz.
    pub carrier_freq: Float,
    /// Symbol rate, baud.
    pub symbol_rate: Float,
    /// RRC rolloff (beta), in `(0, 1]`.
    pub rolloff: Float,
    /// RRC matched-filter tap count (odd).
    pub rrc_ntaps: usize,
    /// Bandpass half-bandwidth around the carrier, Hz.
    pub bandpass_halfwidth: Float,
    /// Loop PI proportional gain.
    pub loop_p: Float,
    /// Loop PI integral gain.
    pub loop_i: Float,
    /// Loop PI integral limit.
    pub loop_limit: Float,
    /// Maximum NCO frequency control offset, Hz.
    pub max_freq_offset: Float,
    /// AGC target amplitude.
    pub agc_target: Float,
}

impl PskConfig {
    /// 300 baud BPSK preset.
    pub fn bpsk_300(sample_rate: Float) -> Self {
        Self {
            sample_rate,
            carrier_freq: 1700.0,
            symbol_rate: 300.0,
            rolloff: 0.35,
            rrc_ntaps: 65,
            bandpass_halfwidth: 300.0,
            loop_p: 1.0,
            loop_i: 0.1,
            loop_limit: 200.0,
            max_freq_offset: 50.0,
            agc_target: 1.0,
        }
    }

    /// 1200 baud BPSK preset.
    pub fn bpsk_1200(sample_rate: Float) -> Self {
        Self {
            carrier_freq: 1700.0,
            symbol_rate: 1200.0,
            rolloff: 0.35,
            rrc_ntaps: 33,
            bandpass_halfwidth: 1200.0,
            ..Self::bpsk_300(sample_rate)
        }
    }

    /// QPSK preset at a given symbol rate (600/2400/3600/4800).
    pub fn qpsk(sample_rate: Float, symbol_rate: Float) -> Self {
        Self {
            sample_rate,
            carrier_freq: 1800.0,
            symbol_rate,
            rolloff: 0.2,
            rrc_ntaps: 65,
            bandpass_halfwidth: symbol_rate,
            loop_p: 1.0,
            loop_i: 0.1,
            loop_limit: 200.0,
            max_freq_offset: 75.0,
            agc_target: 1.0,
        }
    }

    fn samples_per_symbol(&self) -> Float {
        self.sample_rate / self.symbol_rate
    }

    fn bandpass_taps(&self) -> Vec<Float> {
        band_pass(
            self.sample_rate,
            (self.carrier_freq - self.bandpass_halfwidth).max(1.0),
            self.carrier_freq + self.bandpass_halfwidth,
            self.symbol_rate,
        )
    }

    fn rrc_taps(&self) -> Vec<Float> {
        root_raised_cosine(
            self.samples_per_symbol(),
            self.rrc_ntaps,
            self.rolloff,
            &WindowType::Hamming,
        )
    }

    fn loop_lpf_cutoff(&self) -> Float {
        self.symbol_rate / 4.0
    }
}

/// BPSK Costas-loop demodulator.
pub struct BpskDemod {
    config: PskConfig,
    bandpass: Fir<Float>,
    agc: Agc,
    nco: Nco,
    loop_lpf: OnePoleIir,
    pi: PiControl,
    rrc: Fir<Float>,
}

impl BpskDemod {
    /// Build a BPSK demodulator from `config`.
    pub fn new(config: PskConfig) -> Self {
        let bandpass = Fir::new(&config.bandpass_taps());
        let rrc = Fir::new(&config.rrc_taps());
        let agc = Agc::new(config.agc_target, 50.0, 5.0, 0.0, config.sample_rate, Detector::Peak);
        let nco = Nco::new(config.carrier_freq, config.sample_rate, 1.0);
        let loop_lpf = OnePoleIir::new(config.loop_lpf_cutoff(), config.sample_rate);
        let pi = PiControl::new(1.0, config.loop_p, config.loop_i, config.loop_limit, Overflow::Reset);
        Self { config, bandpass, agc, nco, loop_lpf, pi, rrc }
    }

    /// Demodulate a buffer of real samples, returning the RRC-matched I
    /// branch (positive/negative soft symbols).
    pub fn demod(&mut self, input: &[Float]) -> Vec<Float> {
        let bp = self.bandpass.filter_n(input);
        let agced = self.agc.apply(&bp);

        let mut freq_control = 0.0;
        let mut i_branch = Vec::with_capacity(agced.len());
        for &sample in &agced {
            let (sin, cos) = self.nco.update(freq_control);
            let i = sample * cos;
            let q = sample * sin;
            let error = i * q;
            let lp_error = self.loop_lpf.step(error);
            freq_control = self.pi.step(lp_error).clamp(-self.config.max_freq_offset, self.config.max_freq_offset);
            i_branch.push(i);
        }
        self.rrc.filter_n(&i_branch)
    }
}

/// QPSK Costas-loop demodulator.
pub struct QpskDemod {
    config: PskConfig,
    bandpass: Fir<Float>,
    agc: Agc,
    nco: Nco,
    loop_lpf: OnePoleIir,
    pi: PiControl,
    rrc_i: Fir<Float>,
    rrc_q: Fir<Float>,
}

impl QpskDemod {
    /// Build a QPSK demodulator from `config`.
    pub fn new(config: PskConfig) -> Self {
        let bandpass = Fir::new(&config.bandpass_taps());
        let rrc_taps = config.rrc_taps();
        let agc = Agc::new(config.agc_target, 50.0, 5.0, 0.0, config.sample_rate, Detector::Peak);
        let nco = Nco::new(config.carrier_freq, config.sample_rate, 1.0);
        let loop_lpf = OnePoleIir::new(config.loop_lpf_cutoff(), config.sample_rate);
        let pi = PiControl::new(1.0, config.loop_p, config.loop_i, config.loop_limit, Overflow::Reset);
        Self {
            config,
            bandpass,
            agc,
            nco,
            loop_lpf,
            pi,
            rrc_i: Fir::new(&rrc_taps),
            rrc_q: Fir::new(&rrc_taps),
        }
    }

    /// Demodulate a buffer of real samples, returning the matched-filtered
    /// `(I, Q)` pairs.
    pub fn demod(&mut self, input: &[Float]) -> Vec<(Float, Float)> {
        let bp = self.bandpass.filter_n(input);
        let agced = self.agc.apply(&bp);

        let mut freq_control = 0.0;
        let mut i_branch = Vec::with_capacity(agced.len());
        let mut q_branch = Vec::with_capacity(agced.len());
        for &sample in &agced {
            let (sin, cos) = self.nco.update(freq_control);
            let i = sample * cos;
            let q = sample * sin;
            // Decision-directed phase error.
            let error = i * q.signum() - q * i.signum();
            let lp_error = self.loop_lpf.step(error);
            freq_control = self.pi.step(lp_error).clamp(-self.config.max_freq_offset, self.config.max_freq_offset);
            i_branch.push(i);
            q_branch.push(q);
        }
        let mi = self.rrc_i.filter_n(&i_branch);
        let mq = self.rrc_q.filter_n(&q_branch);
        let n = mi.len().min(mq.len());
        (0..n).map(|k| (mi[k], mq[k])).collect()
    }
}

/// MPSK (M > 4) Costas-loop demodulator using a Hilbert-pair
/// complex-ification and a 2-D phase-error lookup table.
pub struct MpskDemod {
    config: PskConfig,
    bandpass: Fir<Float>,
    agc: Agc,
    hilbert: Hilbert,
    nco: Nco,
    loop_lpf: OnePoleIir,
    pi: PiControl,
    phase_detector: PhaseDetector,
    rrc_i: Fir<Float>,
    rrc_q: Fir<Float>,
}

impl MpskDemod {
    /// Build an MPSK demodulator for constellation `order` (e.g. 8 for
    /// 8-PSK) from `config`.
    pub fn new(config: PskConfig, order: u32) -> Self {
        let bandpass = Fir::new(&config.bandpass_taps());
        let rrc_taps = config.rrc_taps();
        let agc = Agc::new(config.agc_target, 50.0, 5.0, 0.0, config.sample_rate, Detector::Peak);
        let hilbert = Hilbert::new(21, &WindowType::Hann);
        let nco = Nco::new(config.carrier_freq, config.sample_rate, 1.0);
        let loop_lpf = OnePoleIir::new(config.loop_lpf_cutoff(), config.sample_rate);
        let pi = PiControl::new(1.0, config.loop_p, config.loop_i, config.loop_limit, Overflow::Reset);
        Self {
            config,
            bandpass,
            agc,
            hilbert,
            nco,
            loop_lpf,
            pi,
            phase_detector: PhaseDetector::new(order, 256),
            rrc_i: Fir::new(&rrc_taps),
            rrc_q: Fir::new(&rrc_taps),
        }
    }

    /// Demodulate a buffer of real samples, returning the matched-filtered
    /// `(I, Q)` pairs.
    pub fn demod(&mut self, input: &[Float]) -> Vec<(Float, Float)> {
        let bp = self.bandpass.filter_n(input);
        let agced = self.agc.apply(&bp);
        let analytic: Vec<Complex> = self.hilbert.process(&agced);

        let mut freq_control = 0.0;
        let mut i_branch = Vec::with_capacity(analytic.len());
        let mut q_branch = Vec::with_capacity(analytic.len());
        for s in &analytic {
            let (sin, cos) = self.nco.update(freq_control);
            // Mix down by -theta: multiply by conj(cos + j sin).
            let i = s.re * cos + s.im * sin;
            let q = s.im * cos - s.re * sin;
            let error = self.phase_detector.get_angle_error(i, q);
            let lp_error = self.loop_lpf.step(error);
            freq_control = self.pi.step(lp_error).clamp(-self.config.max_freq_offset, self.config.max_freq_offset);
            i_branch.push(i);
            q_branch.push(q);
        }
        let mi = self.rrc_i.filter_n(&i_branch);
        let mq = self.rrc_q.filter_n(&q_branch);
        let n = mi.len().min(mq.len());
        (0..n).map(|k| (mi[k], mq[k])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bpsk_tone(sample_rate: Float, carrier: Float, n: usize) -> Vec<Float> {
        let pi = std::f64::consts::PI as Float;
        (0..n).map(|i| (2.0 * pi * carrier * i as Float / sample_rate).sin()).collect()
    }

    #[test]
    fn bpsk_locks_on_unmodulated_carrier() {
        let sample_rate = 9600.0;
        let mut demod = BpskDemod::new(PskConfig::bpsk_300(sample_rate));
        let input = bpsk_tone(sample_rate, 1700.0, 8000);
        let out = demod.demod(&input);
        assert!(!out.is_empty());
        assert!(out.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn qpsk_produces_iq_pairs() {
        let sample_rate = 9600.0;
        let mut demod = QpskDemod::new(PskConfig::qpsk(sample_rate, 2400.0));
        let input = bpsk_tone(sample_rate, 1800.0, 8000);
        let out = demod.demod(&input);
        assert!(!out.is_empty());
        assert!(out.iter().all(|(i, q)| i.is_finite() && q.is_finite()));
    }

    #[test]
    fn mpsk_produces_iq_pairs() {
        let sample_rate = 9600.0;
        let mut demod = MpskDemod::new(PskConfig::qpsk(sample_rate, 2400.0), 8);
        let input = bpsk_tone(sample_rate, 1800.0, 8000);
        let out = demod.demod(&input);
        assert!(!out.is_empty());
        assert!(out.iter().all(|(i, q)| i.is_finite() && q.is_finite()));
    }
}
