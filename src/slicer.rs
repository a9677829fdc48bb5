/*! Symbol slicers: resynchronizing bit/dibit decision devices.

All three slicer variants share the same `phase_clock` clock-recovery
technique: a phase accumulator increments by one each sample, and a symbol
decision is made once it crosses `rollover_threshold` (half a symbol
period); whenever the input crosses zero, the phase accumulator is nudged
toward zero by multiplying it by `lock_rate` (< 1.0), so the clock locks
onto the symbol transitions over time.

Decoded bits are packed MSB-first into bytes and tagged with the sample
index (`stream_address`) of the bit that completed them, matching the
`streamaddress` field original decoders use to correlate packets decoded by
independent chains.
*/

use crate::Float;
use crate::agc::{Agc, Detector};

/// A decoded byte, tagged with the sample index of the bit that completed
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressedByte {
    /// The decoded byte.
    pub byte: u8,
    /// Sample index of the last bit packed into `byte`.
    pub stream_address: u64,
}

fn rollover_threshold(samples_per_symbol: Float) -> Float {
    samples_per_symbol / 2.0 - 0.5
}

/// Binary (2-level) slicer: one bit per symbol, `sample >= 0` is `1`.
pub struct BinarySlicer {
    samples_per_symbol: Float,
    rollover_threshold: Float,
    lock_rate: Float,
    phase_clock: Float,
    working_byte: u8,
    working_bit_count: u32,
    last_sample: Float,
    stream_address: u64,
}

impl BinarySlicer {
    /// 300 baud preset.
    pub fn preset_300(sample_rate: Float) -> Self {
        Self::new(sample_rate, 300.0, 0.75)
    }

    /// 1200 baud preset.
    pub fn preset_1200(sample_rate: Float) -> Self {
        Self::new(sample_rate, 1200.0, 0.75)
    }

    /// 9600 baud preset.
    pub fn preset_9600(sample_rate: Float) -> Self {
        Self::new(sample_rate, 9600.0, 0.88)
    }

    /// Create a slicer for `symbol_rate` baud at `sample_rate` Hz, with the
    /// given clock-recovery `lock_rate` (0 < lock_rate < 1).
    pub fn new(sample_rate: Float, symbol_rate: Float, lock_rate: Float) -> Self {
        let samples_per_symbol = sample_rate / symbol_rate;
        Self {
            samples_per_symbol,
            rollover_threshold: rollover_threshold(samples_per_symbol),
            lock_rate,
            phase_clock: 0.0,
            working_byte: 0,
            working_bit_count: 0,
            last_sample: 0.0,
            stream_address: 0,
        }
    }

    /// Slice a buffer of soft symbols into completed bytes.
    pub fn slice(&mut self, samples: &[Float]) -> Vec<AddressedByte> {
        let mut out = Vec::new();
        for &sample in samples {
            self.stream_address += 1;
            self.phase_clock += 1.0;
            if self.phase_clock >= self.rollover_threshold {
                self.phase_clock -= self.samples_per_symbol;
                self.working_byte <<= 1;
                if sample >= 0.0 {
                    self.working_byte |= 1;
                }
                self.working_bit_count += 1;
                if self.working_bit_count >= 8 {
                    self.working_bit_count = 0;
                    out.push(AddressedByte { byte: self.working_byte, stream_address: self.stream_address });
                }
            }
            if (self.last_sample < 0.0 && sample >= 0.0) || (self.last_sample >= 0.0 && sample < 0.0) {
                self.phase_clock *= self.lock_rate;
            }
            self.last_sample = sample;
        }
        out
    }
}

/// Quadrature (BPSK/QPSK) slicer: decides 1 or 2 bits per symbol from a
/// `(Float, Float)` I/Q soft-symbol stream, via a demap table resolving
/// constellation-rotation ambiguity.
pub struct QuadratureSlicer {
    samples_per_symbol: Float,
    rollover_threshold: Float,
    lock_rate: Float,
    bits_per_symbol: u32,
    state_mask: u8,
    demap: [u8; 16],
    phase_clock: Float,
    working_byte: u8,
    working_bit_count: u32,
    last_i: Float,
    last_q: Float,
    state_register: u8,
    stream_address: u64,
}

impl QuadratureSlicer {
    /// BPSK, 300 baud.
    pub fn bpsk_300(sample_rate: Float) -> Self {
        Self::new(sample_rate, 300.0, 0.815, 1, 0x3, &[0, 0, 1, 1])
    }

    /// BPSK, 1200 baud.
    pub fn bpsk_1200(sample_rate: Float) -> Self {
        Self::new(sample_rate, 1200.0, 0.9, 1, 0x3, &[0, 0, 1, 1])
    }

    /// QPSK at 600/1200/2400/3600/4800 baud, all sharing the same demap.
    pub fn qpsk(sample_rate: Float, symbol_rate: Float, lock_rate: Float) -> Self {
        Self::new(
            sample_rate,
            symbol_rate,
            lock_rate,
            2,
            0xF,
            &[3, 1, 2, 0, 2, 3, 0, 1, 1, 0, 3, 2, 0, 2, 1, 3],
        )
    }

    fn new(sample_rate: Float, symbol_rate: Float, lock_rate: Float, bits_per_symbol: u32, state_mask: u8, demap: &[u8]) -> Self {
        let samples_per_symbol = sample_rate / symbol_rate;
        let mut table = [0u8; 16];
        table[..demap.len()].copy_from_slice(demap);
        Self {
            samples_per_symbol,
            rollover_threshold: rollover_threshold(samples_per_symbol),
            lock_rate,
            bits_per_symbol,
            state_mask,
            demap: table,
            phase_clock: 0.0,
            working_byte: 0,
            working_bit_count: 0,
            last_i: 0.0,
            last_q: 0.0,
            state_register: 0,
            stream_address: 0,
        }
    }

    /// Slice a buffer of `(I, Q)` soft symbols into completed bytes.
    pub fn slice(&mut self, iq: &[(Float, Float)]) -> Vec<AddressedByte> {
        let mut out = Vec::new();
        for &(i_sample, q_sample) in iq {
            self.stream_address += 1;
            self.phase_clock += 1.0;
            if self.phase_clock >= self.rollover_threshold {
                self.phase_clock -= self.samples_per_symbol;
                self.state_register = (self.state_register << 2) & self.state_mask;
                if i_sample >= 0.0 {
                    self.state_register |= 2;
                }
                if q_sample >= 0.0 {
                    self.state_register |= 1;
                }
                self.working_byte <<= self.bits_per_symbol;
                self.working_byte |= self.demap[self.state_register as usize];
                self.working_bit_count += self.bits_per_symbol;
                if self.working_bit_count >= 8 {
                    self.working_bit_count = 0;
                    out.push(AddressedByte { byte: self.working_byte, stream_address: self.stream_address });
                }
            }
            let i_cross = (self.last_i < 0.0 && i_sample >= 0.0) || (self.last_i >= 0.0 && i_sample < 0.0);
            let q_cross = (self.last_q < 0.0 && q_sample >= 0.0) || (self.last_q >= 0.0 && q_sample < 0.0);
            if i_cross || q_cross {
                self.phase_clock *= self.lock_rate;
            }
            self.last_i = i_sample;
            self.last_q = q_sample;
        }
        out
    }
}

/// Four-level (2 bits/symbol) slicer for G3RUH-style 4800/9600 baud FSK,
/// with a fast/slow envelope pair setting an adaptive decision threshold
/// and a Barker-like sync register (`0x5555`/`0xCCCC`) to retime it.
pub struct FourLevelSlicer {
    samples_per_symbol: Float,
    rollover_threshold: Float,
    lock_rate: Float,
    demap: [u8; 4],
    fast_envelope: Agc,
    slow_envelope: Agc,
    phase_clock: Float,
    sync_register: u16,
    threshold: Float,
    threshold_samples: [Float; 8],
    threshold_index: usize,
    working_byte: u8,
    working_bit_count: u32,
    last_sample: Float,
    stream_address: u64,
}

impl FourLevelSlicer {
    /// 4800 baud preset.
    pub fn preset_4800(sample_rate: Float) -> Self {
        Self::new(sample_rate, 4800.0, 0.985)
    }

    /// 9600 baud preset.
    pub fn preset_9600(sample_rate: Float) -> Self {
        Self::new(sample_rate, 9600.0, 0.985)
    }

    fn new(sample_rate: Float, symbol_rate: Float, lock_rate: Float) -> Self {
        let samples_per_symbol = sample_rate / symbol_rate;
        let sustain = 2.0 / symbol_rate;
        let slow_sustain = 40.0 / symbol_rate;
        Self {
            samples_per_symbol,
            rollover_threshold: rollover_threshold(samples_per_symbol),
            lock_rate,
            // symbol_map = [1, 3, -1, -3] -> demap indexed by decision bucket.
            demap: [2, 1, 3, 0],
            fast_envelope: Agc::new(1.0, 1_000_000.0, 50.0, sustain, sample_rate, Detector::Peak),
            slow_envelope: Agc::new(1.0, 50.0, 50.0, slow_sustain, sample_rate, Detector::Peak),
            phase_clock: 0.0,
            sync_register: 0,
            threshold: 0.0,
            threshold_samples: [0.0; 8],
            threshold_index: 0,
            working_byte: 0,
            working_bit_count: 0,
            last_sample: 0.0,
            stream_address: 0,
        }
    }

    /// Slice a buffer of 4-level soft symbols into completed bytes.
    pub fn slice(&mut self, samples: &[Float]) -> Vec<AddressedByte> {
        let mut out = Vec::new();
        for &sample in samples {
            self.stream_address += 1;
            self.fast_envelope.step(sample);
            self.slow_envelope.step(sample);

            self.phase_clock += 1.0;
            if self.phase_clock > self.rollover_threshold {
                self.phase_clock -= self.samples_per_symbol;

                self.threshold_index = (self.threshold_index + 1) % self.threshold_samples.len();
                self.threshold_samples[self.threshold_index] = sample.abs() * 2.0 / 3.0;
                self.sync_register = (self.sync_register << 1) & 0xFFFF;
                if sample > 0.0 {
                    self.sync_register += 1;
                }
                if self.sync_register == 0x5555 || self.sync_register == 0xCCCC {
                    self.threshold =
                        self.threshold_samples.iter().sum::<Float>() / self.threshold_samples.len() as Float;
                }

                let symbol = if sample > 0.0 {
                    if sample >= self.threshold { 3 } else { 2 }
                } else if sample <= -self.threshold {
                    0
                } else {
                    1
                };
                self.working_byte = (self.working_byte << 2) & 0xFF;
                self.working_byte |= self.demap[symbol];
                self.working_bit_count += 2;
                if self.working_bit_count >= 8 {
                    self.working_bit_count = 0;
                    out.push(AddressedByte { byte: self.working_byte, stream_address: self.stream_address });
                }
            }
            if (self.last_sample < 0.0 && sample >= 0.0) || (self.last_sample >= 0.0 && sample < 0.0) {
                self.phase_clock *= self.lock_rate;
            }
            self.last_sample = sample;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nrz_bits(bits: &[u8], samples_per_bit: usize) -> Vec<Float> {
        bits.iter()
            .flat_map(|&b| std::iter::repeat(if b == 1 { 1.0 } else { -1.0 }).take(samples_per_bit))
            .collect()
    }

    #[test]
    fn binary_slicer_recovers_known_byte() {
        let mut slicer = BinarySlicer::new(8000.0, 1000.0, 0.75);
        let bits = [1, 0, 1, 0, 1, 1, 0, 0];
        let samples = nrz_bits(&bits, 8);
        let out = slicer.slice(&samples);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].byte, 0b1010_1100);
    }

    #[test]
    fn binary_slicer_locks_faster_with_many_transitions() {
        let mut slicer = BinarySlicer::new(8000.0, 1000.0, 0.75);
        let bits: Vec<u8> = (0..80).map(|i| (i % 2) as u8).collect();
        let samples = nrz_bits(&bits, 8);
        let out = slicer.slice(&samples);
        assert!(!out.is_empty());
    }

    #[test]
    fn quadrature_slicer_bpsk_tracks_sign() {
        let mut slicer = QuadratureSlicer::bpsk_300(8000.0);
        let samples_per_symbol = 8000.0 / 300.0;
        let iq: Vec<(Float, Float)> = (0..(samples_per_symbol as usize * 16))
            .map(|i| if (i / samples_per_symbol as usize) % 2 == 0 { (1.0, 0.0) } else { (-1.0, 0.0) })
            .collect();
        let out = slicer.slice(&iq);
        assert!(!out.is_empty());
    }

    #[test]
    fn four_level_slicer_produces_bytes() {
        let mut slicer = FourLevelSlicer::preset_4800(48000.0);
        let samples_per_symbol = 48000.0 / 4800.0;
        let levels = [1.0, 3.0, -1.0, -3.0];
        let samples: Vec<Float> = (0..(samples_per_symbol as usize * 64))
            .map(|i| levels[(i / samples_per_symbol as usize) % levels.len()])
            .collect();
        let out = slicer.slice(&samples);
        assert!(!out.is_empty());
    }
}
